//! Overlapping window reader
//!
//! The repository dump is read as newline-delimited units (raw binary runs,
//! the delimiter is incidental). A FIFO of the last `depth` units is joined
//! with a single space byte into a window, and the FIFO advances one unit at a
//! time, so any record spanning fewer than `depth` unit boundaries is fully
//! visible in at least one window.

use crate::error::{Result, WmipfError};
use std::collections::VecDeque;
use std::io::BufRead;

/// Units per window used by both passes unless configured otherwise
pub const DEFAULT_WINDOW_DEPTH: usize = 4;

/// Byte placed between adjacent units inside a window
pub const UNIT_SEPARATOR: u8 = b' ';

const UNIT_DELIMITER: u8 = b'\n';

/// A single window of concatenated units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Ordinal of this window within its traversal (0-based)
    pub index: u64,
    /// Source offset of the first byte of the oldest unit in the window
    pub offset: u64,
    bytes: Vec<u8>,
}

impl Window {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Window content with every unit delimiter removed, so that fields split
    /// by a delimiter byte are matched as one run
    pub fn without_delimiters(&self) -> Vec<u8> {
        self.bytes
            .iter()
            .copied()
            .filter(|&b| b != UNIT_DELIMITER)
            .collect()
    }
}

/// Lazily produces windows from a sequential reader
///
/// One reader serves one traversal; open a new reader on the source for the
/// next pass.
pub struct WindowReader<R> {
    reader: R,
    depth: usize,
    units: VecDeque<(u64, Vec<u8>)>,
    position: u64,
    emitted: u64,
    primed: bool,
    finished: bool,
}

impl<R: BufRead> WindowReader<R> {
    /// Create a reader producing windows of `depth` units (clamped to at least 1)
    pub fn new(reader: R, depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            reader,
            depth,
            units: VecDeque::with_capacity(depth + 1),
            position: 0,
            emitted: 0,
            primed: false,
            finished: false,
        }
    }

    /// Read the next unit, delimiter included. `None` once the source is drained.
    fn read_unit(&mut self) -> Result<Option<(u64, Vec<u8>)>> {
        let mut unit = Vec::new();
        let read = self
            .reader
            .read_until(UNIT_DELIMITER, &mut unit)
            .map_err(|e| WmipfError::Io {
                source: e,
                context: format!("Failed to read unit at offset {}", self.position),
            })?;

        if read == 0 {
            return Ok(None);
        }

        let start = self.position;
        self.position += read as u64;
        Ok(Some((start, unit)))
    }

    fn current_window(&mut self) -> Window {
        let total = self.units.iter().map(|(_, u)| u.len()).sum::<usize>() + self.units.len();
        let mut bytes = Vec::with_capacity(total);

        for (i, (_, unit)) in self.units.iter().enumerate() {
            if i > 0 {
                bytes.push(UNIT_SEPARATOR);
            }
            bytes.extend_from_slice(unit);
        }

        let window = Window {
            index: self.emitted,
            offset: self.units.front().map(|(offset, _)| *offset).unwrap_or(0),
            bytes,
        };
        self.emitted += 1;
        window
    }

    fn step(&mut self) -> Result<Option<Window>> {
        if self.finished {
            return Ok(None);
        }

        if !self.primed {
            self.primed = true;
            while self.units.len() < self.depth {
                match self.read_unit()? {
                    Some(unit) => self.units.push_back(unit),
                    None => {
                        self.finished = true;
                        break;
                    }
                }
            }

            if self.units.is_empty() {
                return Ok(None);
            }
            return Ok(Some(self.current_window()));
        }

        match self.read_unit()? {
            Some(unit) => {
                self.units.push_back(unit);
                if self.units.len() > self.depth {
                    self.units.pop_front();
                }
                Ok(Some(self.current_window()))
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

impl<R: BufRead> Iterator for WindowReader<R> {
    type Item = Result<Window>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(window)) => Some(Ok(window)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
