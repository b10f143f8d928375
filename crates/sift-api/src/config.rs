use sift_query::{CompilerOptions, DEFAULT_PAGE_SIZE, StaticResolver, UnknownPolicy};

pub const DEFAULT_ADDR: &str = "0.0.0.0:9701";

/// Service settings, read from `SIFT_*` environment variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub addr: String,
    pub options: CompilerOptions,
    pub functions: StaticResolver,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, serde_json::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, serde_json::Error> {
        let addr = lookup("SIFT_API_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());
        let default_page_size = lookup("SIFT_DEFAULT_PAGE_SIZE")
            .and_then(|s| s.parse().ok())
            .filter(|n: &i64| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let unknown = match lookup("SIFT_STRICT").as_deref() {
            Some("1" | "true") => UnknownPolicy::Reject,
            _ => UnknownPolicy::Ignore,
        };
        let functions = match lookup("SIFT_FUNCTIONS") {
            Some(json) => serde_json::from_str(&json)?,
            None => StaticResolver::new(),
        };

        Ok(Self {
            addr,
            options: CompilerOptions {
                unknown,
                default_page_size,
            },
            functions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, serde_json::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.options, CompilerOptions::default());
        assert!(config.functions.is_empty());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("SIFT_API_ADDR", "127.0.0.1:8000"),
            ("SIFT_DEFAULT_PAGE_SIZE", "50"),
            ("SIFT_STRICT", "true"),
            ("SIFT_FUNCTIONS", r#"{"me": "user-1"}"#),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8000");
        assert_eq!(config.options.default_page_size, 50);
        assert_eq!(config.options.unknown, UnknownPolicy::Reject);
        assert_eq!(config.functions.len(), 1);
    }

    #[test]
    fn bad_page_size_falls_back() {
        let config = config(&[("SIFT_DEFAULT_PAGE_SIZE", "-3")]).unwrap();
        assert_eq!(config.options.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn bad_function_table_errors() {
        assert!(config(&[("SIFT_FUNCTIONS", "[1, 2]")]).is_err());
    }
}
