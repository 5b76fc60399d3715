//! Detail records harvested from consumer and filter instances
//!
//! Records keep the raw captured bytes. Two observations of the same stored
//! instance produce equal records, which is what collapses repeated sightings
//! across overlapping windows.

use regex::bytes::Captures;

fn group(caps: &Captures<'_>, idx: usize) -> Vec<u8> {
    caps.get(idx)
        .map(|m| m.as_bytes().to_vec())
        .unwrap_or_default()
}

/// Printable ASCII plus the whitespace controls `\t \n \r \x0b \x0c`
pub fn is_printable(b: u8) -> bool {
    matches!(b, 0x20..=0x7e | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Drop every non-printable byte
pub fn printable(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().filter(|&b| is_printable(b)).collect()
}

/// Stored fields of one consumer instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConsumerDetail {
    CommandLine {
        consumer_type: Vec<u8>,
        /// Command string with non-printable bytes removed
        arguments: Vec<u8>,
        consumer_name: Vec<u8>,
        other: Vec<u8>,
    },
    Generic {
        class: Vec<u8>,
        name: Vec<u8>,
        first: Vec<u8>,
        second: Vec<u8>,
    },
}

impl ConsumerDetail {
    /// Build from a match of the command line consumer pattern
    pub fn from_command_line(caps: &Captures<'_>) -> Self {
        Self::CommandLine {
            consumer_type: group(caps, 1),
            arguments: printable(&group(caps, 2)),
            consumer_name: group(caps, 4),
            other: group(caps, 5),
        }
    }

    /// Build from a match of the generic consumer pattern
    pub fn from_generic(caps: &Captures<'_>) -> Self {
        Self::Generic {
            class: group(caps, 1),
            name: group(caps, 3),
            first: group(caps, 4),
            second: group(caps, 5),
        }
    }
}

/// Stored fields of one filter instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterDetail {
    pub name: Vec<u8>,
    pub query: Vec<u8>,
}

impl FilterDetail {
    pub fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            name: group(caps, 1),
            query: group(caps, 2),
        }
    }
}
