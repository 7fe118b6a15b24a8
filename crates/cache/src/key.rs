//! Cache key derivation
//!
//! Keys are pure functions of their inputs: the same query and parameters
//! always map to the same key, across processes and restarts.

use serde::Serialize;
use sha2::{Digest, Sha256};
use vantage_query::QueryParams;

/// Derive a key from query text and bound parameters
pub fn query_key(sql: &str, params: &QueryParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    for param in params.iter() {
        // Separators keep ("ab", "c") and ("a", "bc") apart
        hasher.update([0u8]);
        hasher.update(param.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(param.param_type.clickhouse_type().as_bytes());
        hasher.update([0u8]);
        hasher.update(param.value.as_bytes());
    }
    format!("q:{}", hex::encode(hasher.finalize()))
}

/// Short stable fingerprint of any serializable value
///
/// Used to fold request parts (filters, measure specs) into semantic keys.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> String {
    let encoded = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_query::ParamType;

    #[test]
    fn test_query_key_is_deterministic() {
        let mut params = QueryParams::new();
        params.bind("p0", ParamType::String, "EQ");

        assert_eq!(query_key("SELECT 1", &params), query_key("SELECT 1", &params));
        assert!(query_key("SELECT 1", &params).starts_with("q:"));
    }

    #[test]
    fn test_query_key_depends_on_params() {
        let mut a = QueryParams::new();
        a.bind("p0", ParamType::String, "EQ");
        let mut b = QueryParams::new();
        b.bind("p0", ParamType::String, "FX");

        assert_ne!(query_key("SELECT 1", &a), query_key("SELECT 1", &b));
        assert_ne!(query_key("SELECT 1", &a), query_key("SELECT 2", &a));
    }

    #[test]
    fn test_query_key_param_boundaries() {
        let mut a = QueryParams::new();
        a.bind("p", ParamType::String, "ab");
        let mut b = QueryParams::new();
        b.bind("pa", ParamType::String, "b");

        assert_ne!(query_key("SELECT 1", &a), query_key("SELECT 1", &b));
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(fingerprint(&vec!["a", "b"]), fingerprint(&vec!["a", "b"]));
        assert_ne!(fingerprint(&vec!["a", "b"]), fingerprint(&vec!["b", "a"]));
        assert_eq!(fingerprint(&"x").len(), 16);
    }
}
