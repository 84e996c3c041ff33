//! Cross-chunk result accumulation
//!
//! A [`ChunkResult`] holds one value per instrument for a single chunk. The
//! [`AggregatedResult`] appends those values per instrument, one entry per
//! chunk the instrument appeared in. Appending only happens after a chunk's
//! dispatch has fully completed, so sequence order equals chunk read order.

use std::collections::HashMap;

/// Per-instrument results of one chunk, in the chunk's first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkResult {
    order: Vec<String>,
    values: HashMap<String, Option<f64>>,
}

impl ChunkResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instrument's value, replacing an earlier one for the same key
    ///
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, key: String, value: Option<f64>) {
        if self.values.insert(key.clone(), value).is_none() {
            self.order.push(key);
        }
    }

    /// `Some(None)` means the instrument was processed but had no result
    pub fn get(&self, key: &str) -> Option<Option<f64>> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.order
            .iter()
            .filter_map(|key| self.values.get(key).map(|value| (key.as_str(), *value)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Per-instrument result sequences across the whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    /// Instruments in run-wide first-seen order
    order: Vec<String>,
    series: HashMap<String, Vec<Option<f64>>>,
}

impl AggregatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every value of one chunk to its instrument's sequence
    ///
    /// Must be called once per chunk, in chunk order.
    pub fn append(&mut self, chunk_result: ChunkResult) {
        let ChunkResult { order, mut values } = chunk_result;

        for key in order {
            let Some(value) = values.remove(&key) else {
                continue;
            };
            match self.series.get_mut(&key) {
                Some(series) => series.push(value),
                None => {
                    self.order.push(key.clone());
                    self.series.insert(key, vec![value]);
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[Option<f64>]> {
        self.series.get(key).map(Vec::as_slice)
    }

    /// Instruments and their sequences in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.order
            .iter()
            .filter_map(|key| self.series.get(key).map(|values| (key.as_str(), values.as_slice())))
    }

    pub fn instrument_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
