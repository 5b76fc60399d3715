//! Binding pass: find FilterToConsumerBinding instances and seed the entity
//! registries with the names they reference.

use crate::error::Result;
use crate::patterns::MarkerPatterns;
use crate::scanner::registry::Registries;
use crate::scanner::BindingPassStats;
use crate::source::ByteSource;
use crate::window::{Window, WindowReader};

/// What a single window contributed to the binding pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    /// No binding marker in the window
    NoMarker,
    /// Marker present but the consumer or filter reference did not match
    Incomplete,
    /// Binding already registered from an earlier window
    Known,
    /// New binding registered
    Registered,
}

pub struct BindingLocator<'a> {
    markers: &'a MarkerPatterns,
}

impl<'a> BindingLocator<'a> {
    pub fn new(markers: &'a MarkerPatterns) -> Self {
        Self { markers }
    }

    /// Inspect one window's bytes
    ///
    /// Both name references must be present for anything to be recorded.
    pub fn locate(
        &self,
        bytes: &[u8],
        offset: u64,
        registries: &mut Registries,
    ) -> LocateOutcome {
        if !self.markers.has_binding(bytes) {
            return LocateOutcome::NoMarker;
        }

        let (consumer_name, filter_name) =
            match (self.markers.consumer_name(bytes), self.markers.filter_name(bytes)) {
                (Some(consumer), Some(filter)) => (consumer, filter),
                _ => {
                    tracing::trace!(
                        "Binding marker without name references at offset {}",
                        offset
                    );
                    return LocateOutcome::Incomplete;
                }
            };

        if registries.register_binding(consumer_name, filter_name, offset) {
            tracing::debug!(
                "Found binding {}-{} at offset {}",
                String::from_utf8_lossy(consumer_name),
                String::from_utf8_lossy(filter_name),
                offset
            );
            LocateOutcome::Registered
        } else {
            LocateOutcome::Known
        }
    }

    fn locate_window(&self, window: &Window, registries: &mut Registries) -> LocateOutcome {
        self.locate(window.as_bytes(), window.offset, registries)
    }

    /// Run a full traversal of `source`
    pub fn run(
        &self,
        source: &dyn ByteSource,
        window_depth: usize,
        registries: &mut Registries,
    ) -> Result<BindingPassStats> {
        let mut stats = BindingPassStats::default();
        let reader = source.open()?;

        for window in WindowReader::new(reader, window_depth) {
            let window = window?;
            stats.windows += 1;

            match self.locate_window(&window, registries) {
                LocateOutcome::NoMarker => {}
                LocateOutcome::Incomplete => {
                    stats.marker_hits += 1;
                    stats.incomplete += 1;
                }
                LocateOutcome::Known => stats.marker_hits += 1,
                LocateOutcome::Registered => {
                    stats.marker_hits += 1;
                    stats.bindings += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINDING: &[u8] = b"__FilterToConsumerBinding\x00\x00CommandLineEventConsumer.Name=\"Updater\"\x00__EventFilter.Name=\"Trigger\"";

    #[test]
    fn test_registers_binding_and_names() {
        let markers = MarkerPatterns::new().unwrap();
        let locator = BindingLocator::new(&markers);
        let mut registries = Registries::default();

        assert_eq!(
            locator.locate(BINDING, 42, &mut registries),
            LocateOutcome::Registered
        );
        assert_eq!(
            locator.locate(BINDING, 99, &mut registries),
            LocateOutcome::Known
        );

        let binding = registries.bindings.get("Updater-Trigger").unwrap();
        assert_eq!(binding.first_seen_offset, 42);
        assert!(registries.consumers.contains(b"Updater"));
        assert!(registries.filters.contains(b"Trigger"));
    }

    #[test]
    fn test_marker_without_both_names_changes_nothing() {
        let markers = MarkerPatterns::new().unwrap();
        let locator = BindingLocator::new(&markers);
        let mut registries = Registries::default();

        let outcome = locator.locate(
            b"__FilterToConsumerBinding CommandLineEventConsumer.Name=\"Updater\"",
            0,
            &mut registries,
        );

        assert_eq!(outcome, LocateOutcome::Incomplete);
        assert!(registries.bindings.is_empty());
        assert!(registries.consumers.is_empty());
        assert!(registries.filters.is_empty());
    }

    #[test]
    fn test_names_without_marker_are_ignored() {
        let markers = MarkerPatterns::new().unwrap();
        let locator = BindingLocator::new(&markers);
        let mut registries = Registries::default();

        let outcome = locator.locate(
            b"CommandLineEventConsumer.Name=\"Updater\" __EventFilter.Name=\"Trigger\"",
            0,
            &mut registries,
        );

        assert_eq!(outcome, LocateOutcome::NoMarker);
        assert!(registries.bindings.is_empty());
    }
}
