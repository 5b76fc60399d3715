//! Report assembly
//!
//! Joins the binding registry with the consumer/filter detail sets into one
//! record per binding, in discovery order. Nothing is filtered or sorted:
//! every binding found is reported, benign-looking ones only get an advisory
//! flag.

mod json;
mod text;

pub use json::JsonRenderer;
pub use text::TextRenderer;

use crate::config::{BenignMatch, ReportConfig};
use crate::scanner::{ConsumerDetail, FilterDetail, ScanResults};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn non_empty(bytes: &[u8]) -> Option<String> {
    (!bytes.is_empty()).then(|| lossy(bytes))
}

/// Binding ids commonly present on clean systems
#[derive(Debug, Clone)]
pub struct BenignAllowList {
    entries: Vec<String>,
    mode: BenignMatch,
}

impl BenignAllowList {
    pub fn new(entries: Vec<String>, mode: BenignMatch) -> Self {
        Self { entries, mode }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.benign_bindings.clone(), config.benign_match)
    }

    pub fn is_common(&self, binding_id: &str) -> bool {
        self.entries.iter().any(|entry| match self.mode {
            BenignMatch::Exact => binding_id == entry.as_str(),
            BenignMatch::Contains => binding_id.contains(entry.as_str()),
        })
    }
}

impl Default for BenignAllowList {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

/// Displayable consumer detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumerEntry {
    CommandLine {
        consumer_type: String,
        arguments: String,
        consumer_name: Option<String>,
        other: Option<String>,
    },
    Generic {
        class: String,
        name: String,
        first: String,
        second: String,
    },
}

impl From<&ConsumerDetail> for ConsumerEntry {
    fn from(detail: &ConsumerDetail) -> Self {
        match detail {
            ConsumerDetail::CommandLine {
                consumer_type,
                arguments,
                consumer_name,
                other,
            } => Self::CommandLine {
                consumer_type: lossy(consumer_type),
                arguments: lossy(arguments),
                consumer_name: non_empty(consumer_name),
                other: non_empty(other),
            },
            ConsumerDetail::Generic {
                class,
                name,
                first,
                second,
            } => Self::Generic {
                class: lossy(class),
                name: lossy(name),
                first: lossy(first),
                second: lossy(second),
            },
        }
    }
}

impl fmt::Display for ConsumerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandLine {
                consumer_type,
                arguments,
                consumer_name,
                other,
            } => {
                write!(
                    f,
                    "\n\t\tConsumer Type: {}\n\t\tArguments:     {}",
                    consumer_type, arguments
                )?;
                if let Some(name) = consumer_name {
                    write!(f, "\n\t\tConsumer Name: {}", name)?;
                }
                if let Some(other) = other {
                    write!(f, "\n\t\tOther:         {}", other)?;
                }
                Ok(())
            }
            Self::Generic {
                class,
                name,
                first,
                second,
            } => write!(f, "{} ~ {} ~ {} ~ {}", class, name, first, second),
        }
    }
}

/// Displayable filter detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterEntry {
    pub name: String,
    pub query: String,
}

impl From<&FilterDetail> for FilterEntry {
    fn from(detail: &FilterDetail) -> Self {
        Self {
            name: lossy(&detail.name),
            query: lossy(&detail.query),
        }
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\n\t\tFilter name:  {}\n\t\tFilter Query: {}",
            self.name, self.query
        )
    }
}

/// One reported binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingEntry {
    pub id: String,
    pub consumer_name: String,
    pub filter_name: String,
    pub first_seen_offset: u64,
    /// Matches the benign allow-list (advisory only)
    pub common: bool,
    pub consumer: Vec<ConsumerEntry>,
    pub filter: Vec<FilterEntry>,
}

/// Assembled report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub binding_count: usize,
    pub bindings: Vec<BindingEntry>,
}

impl Report {
    /// Join scan results into report records
    pub fn assemble(
        results: &ScanResults,
        allow_list: &BenignAllowList,
        source: impl Into<String>,
    ) -> Self {
        let registries = &results.registries;

        let bindings: Vec<BindingEntry> = registries
            .bindings
            .iter()
            .map(|binding| {
                let consumer: Vec<ConsumerEntry> = registries
                    .consumers
                    .details(&binding.consumer_name)
                    .map(|set| set.iter().map(ConsumerEntry::from).collect())
                    .unwrap_or_default();
                let filter: Vec<FilterEntry> = registries
                    .filters
                    .details(&binding.filter_name)
                    .map(|set| set.iter().map(FilterEntry::from).collect())
                    .unwrap_or_default();

                BindingEntry {
                    id: binding.id.clone(),
                    consumer_name: lossy(&binding.consumer_name),
                    filter_name: lossy(&binding.filter_name),
                    first_seen_offset: binding.first_seen_offset,
                    common: allow_list.is_common(&binding.id),
                    consumer,
                    filter,
                }
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            source: source.into(),
            binding_count: bindings.len(),
            bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Registries, ScanStats};

    fn results_with(bindings: &[(&str, &str)]) -> ScanResults {
        let mut registries = Registries::default();
        for (consumer, filter) in bindings {
            registries.register_binding(consumer.as_bytes(), filter.as_bytes(), 0);
        }
        ScanResults {
            registries,
            stats: ScanStats::default(),
        }
    }

    #[test]
    fn test_allow_list_exact() {
        let list = BenignAllowList::default();

        assert!(list.is_common("BVTConsumer-BVTFilter"));
        assert!(list.is_common("SCM Event Log Consumer-SCM Event Log Filter"));
        assert!(!list.is_common("EvilBVTConsumer-BVTFilter"));
        assert!(!list.is_common("Updater-Trigger"));
    }

    #[test]
    fn test_allow_list_contains() {
        let list = BenignAllowList::new(
            vec!["BVTConsumer-BVTFilter".to_string()],
            BenignMatch::Contains,
        );
        assert!(list.is_common("EvilBVTConsumer-BVTFilter"));
        assert!(!list.is_common("Updater-Trigger"));
    }

    #[test]
    fn test_assemble_preserves_discovery_order() {
        let results = results_with(&[("Z", "F1"), ("A", "F2"), ("BVTConsumer", "BVTFilter")]);
        let report = Report::assemble(&results, &BenignAllowList::default(), "test");

        let ids: Vec<&str> = report.bindings.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["Z-F1", "A-F2", "BVTConsumer-BVTFilter"]);
        assert_eq!(report.binding_count, 3);
        assert!(!report.bindings[0].common);
        assert!(report.bindings[2].common);
    }

    #[test]
    fn test_command_line_entry_display() {
        let entry = ConsumerEntry::CommandLine {
            consumer_type: "CommandLineEventConsumer".to_string(),
            arguments: "cmd.exe /c x".to_string(),
            consumer_name: Some("Updater".to_string()),
            other: None,
        };
        assert_eq!(
            entry.to_string(),
            "\n\t\tConsumer Type: CommandLineEventConsumer\n\t\tArguments:     cmd.exe /c x\n\t\tConsumer Name: Updater"
        );
    }

    #[test]
    fn test_generic_entry_display() {
        let entry = ConsumerEntry::from(&ConsumerDetail::Generic {
            class: b"ActiveScriptEventConsumer".to_vec(),
            name: b"Beacon".to_vec(),
            first: b"VBScript".to_vec(),
            second: b"x\xff".to_vec(),
        });
        assert_eq!(
            entry.to_string(),
            "ActiveScriptEventConsumer ~ Beacon ~ VBScript ~ x\u{FFFD}"
        );
    }

    #[test]
    fn test_filter_entry_display() {
        let entry = FilterEntry {
            name: "Trigger".to_string(),
            query: "SELECT 1".to_string(),
        };
        assert_eq!(
            entry.to_string(),
            "\n\t\tFilter name:  Trigger\n\t\tFilter Query: SELECT 1"
        );
    }
}
