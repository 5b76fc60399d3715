// Plain text report, laid out for terminal reading
use crate::error::{Result, WmipfError};
use crate::report::{BindingEntry, Report};
use std::io::Write;

const COMMON_BINDING_NOTE: &str =
    "(Common binding based on consumer and filter names, possibly legitimate)";

const FOOTER: &str = "Thanks for using PyWMIPersistenceFinder! Please contact @DavidPany with \
                      questions, bugs, or suggestions.\n\n    \
                      Please review FireEye's whitepaper for additional WMI persistence details:\n        \
                      https://www.fireeye.com/content/dam/fireeye-www/global/en/current-threats/pdfs/wp-windows-management-instrumentation.pdf";

fn io_err(context: &str) -> impl FnOnce(std::io::Error) -> WmipfError + '_ {
    move |e| WmipfError::Io {
        source: e,
        context: context.to_string(),
    }
}

/// Writes the report in the fixed text layout
///
/// The sections are separate calls so the progress lines can be printed
/// between the two scan passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    /// Printed before the binding pass starts
    pub fn write_header(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "\n    Enumerating FilterToConsumerBindings...")
            .map_err(io_err("Failed to write report header"))
    }

    /// Printed between the binding pass and the detail pass
    pub fn write_progress(&self, out: &mut impl Write, binding_count: usize) -> Result<()> {
        writeln!(
            out,
            "    {} FilterToConsumerBinding(s) Found. Enumerating Filters and Consumers...",
            binding_count
        )
        .map_err(io_err("Failed to write report progress"))
    }

    /// Every binding with its consumer and filter details
    pub fn write_bindings(&self, out: &mut impl Write, report: &Report) -> Result<()> {
        writeln!(out, "\n    Bindings:\n").map_err(io_err("Failed to write report body"))?;
        for binding in &report.bindings {
            self.write_binding(out, binding)
                .map_err(io_err("Failed to write binding"))?;
        }
        Ok(())
    }

    fn write_binding(&self, out: &mut impl Write, binding: &BindingEntry) -> std::io::Result<()> {
        writeln!(out, "        {}", binding.id)?;
        if binding.common {
            writeln!(out, "                {}", COMMON_BINDING_NOTE)?;
        }

        if binding.consumer.is_empty() {
            writeln!(out, "            Consumer: {}", binding.consumer_name)?;
        } else {
            for consumer in &binding.consumer {
                writeln!(out, "            Consumer: {}", consumer)?;
            }
        }

        for filter in &binding.filter {
            writeln!(out, "\n            Filter: {}", filter)?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Static closing message, always the last thing written
    pub fn write_footer(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "\n    {}", FOOTER).map_err(io_err("Failed to write report footer"))
    }
}
