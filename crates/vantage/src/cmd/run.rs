//! Run command - answer JSON requests
//!
//! Reads one request per line (blank lines and `#` comments skipped) and
//! prints one response envelope per line. Requests share one cache, so
//! repeated requests in a batch are answered without touching the store.
//!
//! # Usage
//!
//! ```bash
//! vantage run requests.jsonl
//! vantage run - < requests.jsonl
//! vantage run requests.jsonl --pretty
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::AsyncReadExt;
use vantage_analytics::{AnalyticsEngine, Envelope};
use vantage_config::Config;

use crate::setup;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Request file, or `-` for stdin
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: PathBuf,

    /// Pretty-print each envelope
    #[arg(long)]
    pub pretty: bool,

    /// Bypass the cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Run the command
pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let input = read_input(&args.input).await?;

    let mut config = config.clone();
    if args.no_cache {
        config.cache.enabled = false;
    }
    let engine = setup::build_engine(&config)?;

    let summary = answer_all(&engine, &input, args.pretty, |line| println!("{}", line)).await;

    let stats = engine.context().cache().stats();
    eprintln!(
        "\n{} request(s), {} failed; cache {} hit(s), {} miss(es)",
        summary.requests,
        summary.failed,
        stats.hits.load(Ordering::Relaxed),
        stats.misses.load(Ordering::Relaxed),
    );

    Ok(())
}

async fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("failed to read requests from stdin")?;
        return Ok(input);
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read requests from {}", path.display()))
}

/// Counts for the closing summary
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    requests: usize,
    failed: usize,
}

/// Answer every request line in order, emitting one envelope per line
async fn answer_all(
    engine: &AnalyticsEngine,
    input: &str,
    pretty: bool,
    mut emit: impl FnMut(String),
) -> Summary {
    let mut summary = Summary::default();

    for line in input.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        summary.requests += 1;

        let envelope = engine.handle_json(line).await;
        if !envelope.is_success() {
            summary.failed += 1;
        }
        emit(render(&envelope, pretty));
    }

    summary
}

fn render(envelope: &Envelope, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(envelope).unwrap_or_else(|_| envelope.to_json())
    } else {
        envelope.to_json()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::{Value, json};
    use vantage_query::QueryParams;
    use vantage_query::test_utils::{ScriptedBackend, rows};

    use super::*;

    fn engine() -> (AnalyticsEngine, std::sync::Arc<ScriptedBackend>) {
        let config = Config::from_str(
            r#"
[tables.positions]
date_column = "as_of_date"

[tables.positions.fields]
desk = "text"
"#,
        )
        .unwrap();
        let backend = ScriptedBackend::new(|sql: &str, _params: &QueryParams| {
            if sql.contains("AS snapshot") {
                return Ok(rows(&["snapshot"], vec![json!({ "snapshot": "2024-03-01" })]));
            }
            Ok(rows(&["value"], vec![json!({ "value": "EQ" })]))
        })
        .shared();
        let engine = setup::engine_with_backend(&config, backend.clone()).unwrap();
        (engine, backend)
    }

    #[tokio::test]
    async fn test_answer_all() {
        let (engine, backend) = engine();
        let input = r#"
# filter picker
{"kind":"distinct","table":"positions","field":"desk","asOfDate":"2024-03-15"}
{"kind":"distinct","table":"positions","field":"desk","asOfDate":"2024-03-15"}
{"kind":"distinct","table":"ledger","field":"desk"}
not json
"#;

        let mut lines = Vec::new();
        let summary = answer_all(&engine, input, false, |line| lines.push(line)).await;

        assert_eq!(summary, Summary { requests: 4, failed: 2 });
        assert_eq!(lines.len(), 4);

        let first: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["data"]["values"], json!(["EQ"]));
        assert_eq!(first["meta"]["currentSnapshot"], "2024-03-01");

        let unknown: Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(unknown["error"]["code"], "UNKNOWN_TABLE");

        // Second request served from cache
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_pretty_render() {
        let (engine, _) = engine();
        let mut lines = Vec::new();
        answer_all(&engine, "{}", true, |line| lines.push(line)).await;
        assert!(lines[0].contains('\n'));
    }
}
