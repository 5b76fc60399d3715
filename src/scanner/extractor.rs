//! Detail pass: for every name found by the binding pass, pull the stored
//! consumer and filter fields out of the surrounding bytes.

use crate::error::Result;
use crate::patterns::{EntityPatterns, MarkerPatterns};
use crate::scanner::records::{ConsumerDetail, FilterDetail};
use crate::scanner::registry::{ConsumerRegistry, FilterRegistry, Registries};
use crate::scanner::DetailPassStats;
use crate::source::ByteSource;
use crate::window::WindowReader;

pub struct DetailExtractor<'a> {
    markers: &'a MarkerPatterns,
    patterns: EntityPatterns,
}

impl<'a> DetailExtractor<'a> {
    /// Compile name-anchored patterns for every consumer and filter known so far
    ///
    /// Names whose pattern does not compile are skipped and keep an empty
    /// detail set.
    pub fn new(markers: &'a MarkerPatterns, registries: &Registries) -> Self {
        let patterns =
            EntityPatterns::compile(registries.consumers.names(), registries.filters.names());
        tracing::debug!(
            "Compiled {} entity patterns, skipped {} names",
            patterns.len(),
            patterns.skipped()
        );

        Self { markers, patterns }
    }

    /// Extract details from one window (unit delimiters already removed).
    /// Returns how many new detail records were added.
    pub fn extract(
        &self,
        bytes: &[u8],
        consumers: &mut ConsumerRegistry,
        filters: &mut FilterRegistry,
    ) -> usize {
        self.extract_consumers(bytes, consumers) + self.extract_filters(bytes, filters)
    }

    fn extract_consumers(&self, bytes: &[u8], consumers: &mut ConsumerRegistry) -> usize {
        if !self.markers.has_consumer(bytes) {
            return 0;
        }

        // A window holding a command line consumer is only read with that layout
        let command_line = self.markers.has_command_line_consumer(bytes);
        let mut added = 0;

        for (name, details) in consumers.entries_mut() {
            let Some(patterns) = self.patterns.consumer(name) else {
                continue;
            };

            let detail = if command_line {
                patterns
                    .command_line
                    .captures(bytes)
                    .map(|caps| ConsumerDetail::from_command_line(&caps))
            } else {
                patterns
                    .generic
                    .captures(bytes)
                    .map(|caps| ConsumerDetail::from_generic(&caps))
            };

            if let Some(detail) = detail {
                if details.insert(detail) {
                    tracing::debug!(
                        "New detail record for consumer {}",
                        String::from_utf8_lossy(name)
                    );
                    added += 1;
                }
            }
        }

        added
    }

    fn extract_filters(&self, bytes: &[u8], filters: &mut FilterRegistry) -> usize {
        let mut added = 0;

        for (name, details) in filters.entries_mut() {
            let Some(pattern) = self.patterns.filter(name) else {
                continue;
            };

            if let Some(caps) = pattern.captures(bytes) {
                if details.insert(FilterDetail::from_captures(&caps)) {
                    tracing::debug!(
                        "New detail record for filter {}",
                        String::from_utf8_lossy(name)
                    );
                    added += 1;
                }
            }
        }

        added
    }

    /// Run a full traversal of `source`
    pub fn run(
        &self,
        source: &dyn ByteSource,
        window_depth: usize,
        registries: &mut Registries,
    ) -> Result<DetailPassStats> {
        let mut stats = DetailPassStats {
            skipped_names: self.patterns.skipped() as u64,
            ..DetailPassStats::default()
        };
        let reader = source.open()?;

        for window in WindowReader::new(reader, window_depth) {
            let window = window?;
            stats.windows += 1;

            let bytes = window.without_delimiters();
            let added = self.extract(&bytes, &mut registries.consumers, &mut registries.filters);
            if added > 0 {
                stats.productive_windows += 1;
                stats.details += added as u64;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(consumer: &[u8], filter: &[u8]) -> Registries {
        let mut registries = Registries::default();
        registries.register_binding(consumer, filter, 0);
        registries
    }

    #[test]
    fn test_command_line_consumer_detail() {
        let markers = MarkerPatterns::new().unwrap();
        let mut registries = seeded(b"Updater", b"Trigger");
        let extractor = DetailExtractor::new(&markers, &registries);

        let window = b"\x05CommandLineEventConsumer\x00\x00cmd.exe /c update.bat\x00\x11Updater\x00\x00C:\\Temp";
        let added = extractor.extract(window, &mut registries.consumers, &mut registries.filters);

        assert_eq!(added, 1);
        let details = registries.consumers.details(b"Updater").unwrap();
        match details.first().unwrap() {
            ConsumerDetail::CommandLine {
                consumer_type,
                arguments,
                other,
                ..
            } => {
                assert_eq!(consumer_type, b"CommandLineEventConsumer");
                assert_eq!(arguments, b"cmd.exe /c update.bat");
                assert_eq!(other, b"C:\\Temp");
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_generic_consumer_detail() {
        let markers = MarkerPatterns::new().unwrap();
        let mut registries = seeded(b"Beacon", b"Trigger");
        let extractor = DetailExtractor::new(&markers, &registries);

        let window = b"ActiveScriptEventConsumer\x01Beacon\x00\x00VBScript\x00\x00Set x = 1";
        extractor.extract(window, &mut registries.consumers, &mut registries.filters);

        let details = registries.consumers.details(b"Beacon").unwrap();
        assert_eq!(details.len(), 1);
        assert!(matches!(
            details.first().unwrap(),
            ConsumerDetail::Generic { first, second, .. }
                if first == b"VBScript" && second == b"Set x = 1"
        ));
    }

    #[test]
    fn test_command_line_window_skips_generic_layout() {
        let markers = MarkerPatterns::new().unwrap();
        let mut registries = seeded(b"Beacon", b"Trigger");
        let extractor = DetailExtractor::new(&markers, &registries);

        // Generic layout for Beacon, but a command line consumer shares the window
        let window = b"ActiveScriptEventConsumer\x01Beacon\x00\x00VBScript\x00\x00x CommandLineEventConsumer";
        let added = extractor.extract(window, &mut registries.consumers, &mut registries.filters);

        assert_eq!(added, 0);
        assert!(registries.consumers.details(b"Beacon").unwrap().is_empty());
    }

    #[test]
    fn test_filter_detail_deduplicates() {
        let markers = MarkerPatterns::new().unwrap();
        let mut registries = seeded(b"Updater", b"Trigger");
        let extractor = DetailExtractor::new(&markers, &registries);

        let query = b"Trigger\x00\x00SELECT * FROM __InstanceCreationEvent\x00\x00";
        let first = extractor.extract(query, &mut registries.consumers, &mut registries.filters);
        let second = extractor.extract(query, &mut registries.consumers, &mut registries.filters);

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(registries.filters.details(b"Trigger").unwrap().len(), 1);
    }
}
