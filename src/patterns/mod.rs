//! Byte patterns used to recognise WMI repository records
//!
//! This module provides:
//! - Pre-compiled marker patterns for the binding pass (binding class marker,
//!   consumer and filter name references)
//! - A pattern builder that anchors on an already-discovered entity name for
//!   the detail pass
//!
//! Every pattern runs over raw bytes with Unicode disabled, so `\w` and `\s`
//! are ASCII classes and arbitrary non-UTF-8 bytes can be matched.

use crate::error::{Result, WmipfError};
use ahash::{HashMap, HashMapExt};
use regex::bytes::Regex;
use std::fmt::Write as _;

/// Class name present in every FilterToConsumerBinding instance
pub const BINDING_MARKER: &str = "_FilterToConsumerBinding";

/// Suffix shared by every consumer class name
pub const CONSUMER_MARKER: &str = "EventConsumer";

/// Consumer class whose stored fields hold a command line
pub const COMMAND_LINE_CONSUMER: &str = "CommandLineEventConsumer";

const CONSUMER_NAME_PATTERN: &str = r#"(?-u)[\w_]*EventConsumer\.Name="([\w\s]*)""#;
const FILTER_NAME_PATTERN: &str = r#"(?-u)_EventFilter\.Name="([\w\s]*)""#;

/// Longest name prefix shown in logs and errors
const DISPLAY_NAME_LIMIT: usize = 64;

/// Which record layout a name-anchored pattern targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// `CommandLineEventConsumer` instance
    CommandLineConsumer,
    /// Any other `*EventConsumer` instance
    GenericConsumer,
    /// `__EventFilter` instance
    Filter,
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| WmipfError::Pattern {
        name: name.to_string(),
        source: e,
    })
}

fn literal(text: &str) -> Result<Regex> {
    compile(text, &regex::escape(text))
}

/// Static patterns for binding discovery and window gating
#[derive(Debug, Clone)]
pub struct MarkerPatterns {
    binding: Regex,
    consumer: Regex,
    command_line: Regex,
    consumer_name: Regex,
    filter_name: Regex,
}

impl MarkerPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            binding: literal(BINDING_MARKER)?,
            consumer: literal(CONSUMER_MARKER)?,
            command_line: literal(COMMAND_LINE_CONSUMER)?,
            consumer_name: compile("consumer name reference", CONSUMER_NAME_PATTERN)?,
            filter_name: compile("filter name reference", FILTER_NAME_PATTERN)?,
        })
    }

    /// Window mentions a FilterToConsumerBinding
    pub fn has_binding(&self, window: &[u8]) -> bool {
        self.binding.is_match(window)
    }

    /// Window mentions any consumer class
    pub fn has_consumer(&self, window: &[u8]) -> bool {
        self.consumer.is_match(window)
    }

    /// Window mentions a command line consumer
    pub fn has_command_line_consumer(&self, window: &[u8]) -> bool {
        self.command_line.is_match(window)
    }

    /// First `...EventConsumer.Name="<name>"` reference in the window
    pub fn consumer_name<'w>(&self, window: &'w [u8]) -> Option<&'w [u8]> {
        self.consumer_name
            .captures(window)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_bytes())
    }

    /// First `_EventFilter.Name="<name>"` reference in the window
    pub fn filter_name<'w>(&self, window: &'w [u8]) -> Option<&'w [u8]> {
        self.filter_name
            .captures(window)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_bytes())
    }
}

/// Printable form of an entity name, cut to a bounded length
pub fn display_name(name: &[u8]) -> String {
    if name.len() <= DISPLAY_NAME_LIMIT {
        return String::from_utf8_lossy(name).into_owned();
    }
    format!(
        "{}... ({} bytes)",
        String::from_utf8_lossy(&name[..DISPLAY_NAME_LIMIT]),
        name.len()
    )
}

/// Escape raw name bytes so they match only themselves inside a pattern
///
/// ASCII letters, digits and `_` are kept; every other byte becomes `\xNN`.
pub fn escape_bytes(name: &[u8]) -> String {
    let mut escaped = String::with_capacity(name.len() * 2);
    for &b in name {
        if b.is_ascii_alphanumeric() || b == b'_' {
            escaped.push(b as char);
        } else {
            let _ = write!(escaped, r"\x{:02X}", b);
        }
    }
    escaped
}

/// Build the detail pattern for one entity name
///
/// Capture groups per kind:
/// - `CommandLineConsumer`: 1 type, 2 command, 3 skipped, 4 name, 5 trailing
/// - `GenericConsumer`: 1 class, 2 skipped, 3 name, 4 first field, 5 second field
/// - `Filter`: 1 name, 2 query
pub fn build_entity_pattern(name: &[u8], kind: EntityKind) -> Result<Regex> {
    let name_pattern = escape_bytes(name);
    let pattern = match kind {
        EntityKind::CommandLineConsumer => format!(
            r"(?s-u)(CommandLineEventConsumer)\x00\x00(.*?)\x00(.*?)({})(?:\x00\x00)?([^\x00]*)",
            name_pattern
        ),
        EntityKind::GenericConsumer => format!(
            r"(?s-u)(\w*EventConsumer)(.*?)({})\x00\x00([^\x00]*)\x00\x00([^\x00]*)",
            name_pattern
        ),
        EntityKind::Filter => format!(r"(?s-u)({})\x00\x00([^\x00]*)\x00\x00", name_pattern),
    };

    compile(&display_name(name), &pattern)
}

/// Name-anchored patterns for a consumer, one per consumer layout
#[derive(Debug, Clone)]
pub struct ConsumerPatterns {
    pub command_line: Regex,
    pub generic: Regex,
}

impl ConsumerPatterns {
    pub fn build(name: &[u8]) -> Result<Self> {
        Ok(Self {
            command_line: build_entity_pattern(name, EntityKind::CommandLineConsumer)?,
            generic: build_entity_pattern(name, EntityKind::GenericConsumer)?,
        })
    }
}

/// Name-anchored patterns compiled once per discovered entity
///
/// Built after the binding pass, when the full set of names is known. A name
/// whose pattern cannot be compiled is left out and never yields details.
#[derive(Debug, Clone, Default)]
pub struct EntityPatterns {
    consumers: HashMap<Vec<u8>, ConsumerPatterns>,
    filters: HashMap<Vec<u8>, Regex>,
    skipped: usize,
}

impl EntityPatterns {
    pub fn compile<'a, C, F>(consumer_names: C, filter_names: F) -> Self
    where
        C: IntoIterator<Item = &'a [u8]>,
        F: IntoIterator<Item = &'a [u8]>,
    {
        let mut patterns = Self::default();

        for name in consumer_names {
            match ConsumerPatterns::build(name) {
                Ok(consumer) => {
                    patterns.consumers.insert(name.to_vec(), consumer);
                }
                Err(e) => patterns.skip("consumer", &e),
            }
        }

        for name in filter_names {
            match build_entity_pattern(name, EntityKind::Filter) {
                Ok(filter) => {
                    patterns.filters.insert(name.to_vec(), filter);
                }
                Err(e) => patterns.skip("filter", &e),
            }
        }

        patterns
    }

    fn skip(&mut self, kind: &str, error: &WmipfError) {
        tracing::warn!("Skipping details for {}: {}", kind, error);
        self.skipped += 1;
    }

    /// Names left out because their pattern failed to compile
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn consumer(&self, name: &[u8]) -> Option<&ConsumerPatterns> {
        self.consumers.get(name)
    }

    pub fn filter(&self, name: &[u8]) -> Option<&Regex> {
        self.filters.get(name)
    }

    pub fn len(&self) -> usize {
        self.consumers.len() + self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty() && self.filters.is_empty()
    }
}
