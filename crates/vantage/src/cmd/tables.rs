//! Tables command - list configured tables and their fields

use anyhow::Result;
use clap::Args;
use vantage_analytics::FieldKind;
use vantage_config::Config;

use crate::setup;

/// Tables command arguments
#[derive(Args, Debug)]
pub struct TablesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the command
pub fn run(args: TablesArgs, config: &Config) -> Result<()> {
    let registry = setup::build_registry(config)?;

    if args.json {
        let tables: Vec<serde_json::Value> = registry
            .names()
            .into_iter()
            .filter_map(|name| registry.get(name).ok())
            .map(|table| {
                let fields: serde_json::Map<String, serde_json::Value> = table
                    .fields()
                    .map(|(name, kind)| (name.to_string(), serde_json::json!(kind_name(kind))))
                    .collect();
                serde_json::json!({
                    "name": table.name(),
                    "dateColumn": table.date_column(),
                    "maturityColumn": table.maturity_column(),
                    "fields": fields,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No tables configured.");
        return Ok(());
    }

    for name in registry.names() {
        let table = registry.get(name)?;
        println!("{} (snapshot: {})", table.name(), table.date_column());
        for (field, kind) in table.fields() {
            println!("  {:<24} {}", field, kind_name(kind));
        }
    }

    Ok(())
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Number => "number",
        FieldKind::Date => "date",
    }
}
