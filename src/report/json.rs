// JSON report for downstream tooling
use crate::error::{Result, WmipfError};
use crate::report::Report;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl JsonRenderer {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn render(&self, out: &mut impl Write, report: &Report) -> Result<()> {
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut *out, report)
        } else {
            serde_json::to_writer(&mut *out, report)
        };
        written.map_err(|e| WmipfError::Json {
            source: e,
            context: "Failed to serialize report".to_string(),
        })?;

        writeln!(out).map_err(|e| WmipfError::Io {
            source: e,
            context: "Failed to write report".to_string(),
        })
    }
}
