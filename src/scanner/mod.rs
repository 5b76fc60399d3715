//! Two-pass persistence scanner
//!
//! This module provides:
//! - The binding pass, which finds FilterToConsumerBinding instances and the
//!   consumer/filter names they reference
//! - The detail pass, which anchors on those names to extract consumer and
//!   filter fields
//! - Registries holding the results, in discovery order
//!
//! The detail pass only knows what to look for once the binding pass has
//! drained the whole source, so the passes run strictly one after the other:
//! `locate_bindings` yields a `BindingScan`, which `extract_details` consumes.

mod extractor;
mod locator;
mod records;
mod registry;

pub use extractor::DetailExtractor;
pub use locator::{BindingLocator, LocateOutcome};
pub use records::{is_printable, printable, ConsumerDetail, FilterDetail};
pub use registry::{
    binding_id, Binding, BindingRegistry, ConsumerRegistry, DetailSet, EntityRegistry,
    FilterRegistry, Registries,
};

use crate::config::ScanConfig;
use crate::error::Result;
use crate::patterns::MarkerPatterns;
use crate::source::ByteSource;

/// Counters for the binding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingPassStats {
    /// Windows examined
    pub windows: u64,
    /// Windows containing the binding marker
    pub marker_hits: u64,
    /// Binding markers dropped because a name reference was missing
    pub incomplete: u64,
    /// Bindings registered for the first time
    pub bindings: u64,
}

/// Counters for the detail pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailPassStats {
    /// Windows examined
    pub windows: u64,
    /// Windows that added at least one detail record
    pub productive_windows: u64,
    /// Detail records added
    pub details: u64,
    /// Names left without details because their pattern did not compile
    pub skipped_names: u64,
}

/// Counters for a whole scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub binding_pass: BindingPassStats,
    pub detail_pass: DetailPassStats,
}

/// Output of the binding pass, the only input the detail pass accepts
#[derive(Debug, Clone)]
pub struct BindingScan {
    pub registries: Registries,
    pub stats: BindingPassStats,
}

impl BindingScan {
    pub fn binding_count(&self) -> usize {
        self.registries.bindings.len()
    }
}

/// Output of a complete scan
#[derive(Debug, Clone)]
pub struct ScanResults {
    pub registries: Registries,
    pub stats: ScanStats,
}

/// Scanner over a re-openable byte source
pub struct Scanner {
    markers: MarkerPatterns,
    window_depth: usize,
}

impl Scanner {
    /// Create scanner with configuration
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Self::with_window_depth(config.window_depth)
    }

    pub fn with_window_depth(window_depth: usize) -> Result<Self> {
        Ok(Self {
            markers: MarkerPatterns::new()?,
            window_depth: window_depth.max(1),
        })
    }

    pub fn window_depth(&self) -> usize {
        self.window_depth
    }

    /// First pass: discover bindings and seed the consumer/filter registries
    pub fn locate_bindings(&self, source: &dyn ByteSource) -> Result<BindingScan> {
        tracing::info!("Enumerating bindings in {}", source.describe());

        let mut registries = Registries::default();
        let stats =
            BindingLocator::new(&self.markers).run(source, self.window_depth, &mut registries)?;

        tracing::info!(
            "Binding pass done: {} windows, {} marker hits, {} incomplete, {} bindings",
            stats.windows,
            stats.marker_hits,
            stats.incomplete,
            stats.bindings
        );

        Ok(BindingScan { registries, stats })
    }

    /// Second pass: extract consumer and filter details for every known name
    pub fn extract_details(
        &self,
        source: &dyn ByteSource,
        scan: BindingScan,
    ) -> Result<ScanResults> {
        let BindingScan {
            mut registries,
            stats: binding_pass,
        } = scan;

        tracing::info!(
            "Enumerating {} consumers and {} filters",
            registries.consumers.len(),
            registries.filters.len()
        );

        let extractor = DetailExtractor::new(&self.markers, &registries);
        let detail_pass = extractor.run(source, self.window_depth, &mut registries)?;

        tracing::info!(
            "Detail pass done: {} windows, {} with new details, {} detail records",
            detail_pass.windows,
            detail_pass.productive_windows,
            detail_pass.details
        );
        if detail_pass.skipped_names > 0 {
            tracing::warn!(
                "{} names could not be searched for details",
                detail_pass.skipped_names
            );
        }

        Ok(ScanResults {
            registries,
            stats: ScanStats {
                binding_pass,
                detail_pass,
            },
        })
    }

    /// Run both passes in order
    pub fn scan(&self, source: &dyn ByteSource) -> Result<ScanResults> {
        let bindings = self.locate_bindings(source)?;
        self.extract_details(source, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::window::DEFAULT_WINDOW_DEPTH;

    fn sample() -> MemorySource {
        let mut data = Vec::new();
        data.extend_from_slice(b"header\x01\x02\n");
        data.extend_from_slice(b"CommandLineEventConsumer\x00\x00cmd.exe /c run.bat\x00\x03Updater\x00\x00\n");
        data.extend_from_slice(b"Trigger\x00\x00SELECT * FROM __TimerEvent\x00\x00\n");
        data.extend_from_slice(b"__FilterToConsumerBinding CommandLineEventConsumer.Name=\"Updater\"\n");
        data.extend_from_slice(b"__EventFilter.Name=\"Trigger\"\n");
        data.extend_from_slice(b"trailer\n");
        MemorySource::from(data)
    }

    #[test]
    fn test_scan_runs_both_passes() {
        let scanner = Scanner::with_window_depth(DEFAULT_WINDOW_DEPTH).unwrap();
        let results = scanner.scan(&sample()).unwrap();

        assert_eq!(results.registries.bindings.len(), 1);
        assert!(results.registries.bindings.get("Updater-Trigger").is_some());
        assert_eq!(results.registries.consumers.details(b"Updater").unwrap().len(), 1);
        assert_eq!(results.registries.filters.details(b"Trigger").unwrap().len(), 1);
        assert_eq!(results.stats.binding_pass.windows, results.stats.detail_pass.windows);
    }

    #[test]
    fn test_detail_pass_needs_names_from_binding_pass() {
        let scanner = Scanner::with_window_depth(DEFAULT_WINDOW_DEPTH).unwrap();
        let empty = BindingScan {
            registries: Registries::default(),
            stats: BindingPassStats::default(),
        };

        let results = scanner.extract_details(&sample(), empty).unwrap();
        assert!(results.registries.consumers.is_empty());
        assert_eq!(results.stats.detail_pass.details, 0);
    }

    #[test]
    fn test_window_depth_from_config() {
        let scanner = Scanner::new(&ScanConfig { window_depth: 7 }).unwrap();
        assert_eq!(scanner.window_depth(), 7);
    }
}
