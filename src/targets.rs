//! Static table of dispatch targets.
//!
//! Each target is an ingestion endpoint derived from a single base URL. The
//! table is built once at startup and never mutated afterwards.

use std::sync::Arc;

use crate::config::ConfigError;

/// Names of the ingestion endpoints the generator knows about.
pub const TARGET_NAMES: [&str; 2] = ["kafka", "eventbridge"];

/// A named destination for synthetic events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub name: String,
    pub url: Arc<str>,
}

/// Name-to-URL mapping for every known target.
#[derive(Debug, Clone)]
pub struct TargetTable {
    targets: Vec<TargetSpec>,
}

impl TargetTable {
    /// Derives every target's endpoint as `<base_url>/<name>`.
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        let targets = TARGET_NAMES
            .iter()
            .map(|name| TargetSpec {
                name: (*name).to_string(),
                url: Arc::from(format!("{}/{}", base, name)),
            })
            .collect();
        Self { targets }
    }

    /// Looks up a single target by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&TargetSpec> {
        self.targets
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn all(&self) -> &[TargetSpec] {
        &self.targets
    }

    /// Resolves a target selection: one target name, or `all` / empty for
    /// every target in table order.
    pub fn select(&self, selection: &str) -> Result<Vec<TargetSpec>, ConfigError> {
        let selection = selection.trim();
        if selection.is_empty() || selection.eq_ignore_ascii_case("all") {
            return Ok(self.targets.clone());
        }

        self.get(selection)
            .cloned()
            .map(|t| vec![t])
            .ok_or_else(|| ConfigError::UnknownTarget {
                value: selection.to_string(),
                expected: format!("{}, all", TARGET_NAMES.join(", ")),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_urls_from_base() {
        let table = TargetTable::from_base_url("http://localhost:3000");
        assert_eq!(
            &*table.get("kafka").unwrap().url,
            "http://localhost:3000/kafka"
        );
        assert_eq!(
            &*table.get("eventbridge").unwrap().url,
            "http://localhost:3000/eventbridge"
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let table = TargetTable::from_base_url("https://api.example.com/v1/");
        assert_eq!(
            &*table.get("kafka").unwrap().url,
            "https://api.example.com/v1/kafka"
        );
    }

    #[test]
    fn select_all_and_empty() {
        let table = TargetTable::from_base_url("http://x");
        let all = table.select("all").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "kafka");
        assert_eq!(all[1].name, "eventbridge");

        assert_eq!(table.select("").unwrap(), all);
        assert_eq!(table.select("ALL").unwrap(), all);
    }

    #[test]
    fn select_single_is_case_insensitive() {
        let table = TargetTable::from_base_url("http://x");
        let selected = table.select("EventBridge").unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "eventbridge");
    }

    #[test]
    fn select_unknown_errors() {
        let table = TargetTable::from_base_url("http://x");
        let err = table.select("sqs").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sqs"), "error was: {}", msg);
        assert!(msg.contains("kafka"), "error was: {}", msg);
    }

    #[test]
    fn resolution_is_stable() {
        let table = TargetTable::from_base_url("http://x");
        let first = table.select("kafka").unwrap();
        for _ in 0..10 {
            assert_eq!(table.select("kafka").unwrap(), first);
        }
    }
}
