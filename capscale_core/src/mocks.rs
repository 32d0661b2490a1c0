//! Reading sources for tests and offline replay.

use std::collections::VecDeque;

use capscale_traits::{RawReading, RawReadingSource};

/// Replays a fixed list of primary readings, one per call, and remembers the
/// averaging counts it was asked for. Errors once exhausted.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    readings: VecDeque<i32>,
    requested_counts: Vec<u32>,
}

impl ScriptedSource {
    pub fn new(readings: impl IntoIterator<Item = i32>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            requested_counts: Vec::new(),
        }
    }

    pub fn push(&mut self, reading: i32) {
        self.readings.push_back(reading);
    }

    pub fn requested_counts(&self) -> &[u32] {
        &self.requested_counts
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl RawReadingSource for ScriptedSource {
    fn averaged_reading(
        &mut self,
        count: u32,
    ) -> Result<RawReading, Box<dyn std::error::Error + Send + Sync>> {
        self.requested_counts.push(count);
        let primary = self
            .readings
            .pop_front()
            .ok_or_else(|| std::io::Error::other("scripted source exhausted"))?;
        Ok(RawReading {
            primary,
            secondary: 0,
        })
    }
}

/// A source that always errors on read.
pub struct FailingSource;

impl RawReadingSource for FailingSource {
    fn averaged_reading(
        &mut self,
        _count: u32,
    ) -> Result<RawReading, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("failing source")))
    }
}
