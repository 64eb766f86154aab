//! Fixed-size batch regrouping
//!
//! Batches may span page boundaries. Only the final flush can be short.

use super::types::{BatchInfo, BatchResult};
use crate::types::JsonValue;

/// Regroups a record stream into batches of a fixed size
#[derive(Debug)]
pub struct BatchAggregator {
    batch_size: usize,
    pending: Vec<JsonValue>,
    batches: u64,
    processed: u64,
}

impl BatchAggregator {
    /// Create an aggregator; a batch size of 0 is raised to 1
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
            batches: 0,
            processed: 0,
        }
    }

    /// Add a record; returns the batch it completes, if any
    pub fn push(
        &mut self,
        record: JsonValue,
        total_result_count: Option<u64>,
    ) -> Option<(Vec<JsonValue>, BatchInfo)> {
        self.pending.push(record);
        if self.pending.len() < self.batch_size {
            return None;
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        Some(self.emit(batch, total_result_count))
    }

    /// Take the remaining records as a final, possibly short batch
    pub fn flush(
        &mut self,
        total_result_count: Option<u64>,
    ) -> Option<(Vec<JsonValue>, BatchInfo)> {
        if self.pending.is_empty() {
            return None;
        }
        let batch = std::mem::take(&mut self.pending);
        Some(self.emit(batch, total_result_count))
    }

    /// Records waiting for a full batch
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Summary of everything emitted so far
    pub fn result(&self, completed: bool) -> BatchResult {
        BatchResult {
            total_processed: self.processed,
            total_batches: self.batches,
            completed,
        }
    }

    fn emit(
        &mut self,
        batch: Vec<JsonValue>,
        total_result_count: Option<u64>,
    ) -> (Vec<JsonValue>, BatchInfo) {
        self.batches += 1;
        self.processed += batch.len() as u64;
        let info = BatchInfo {
            batch_number: self.batches,
            count: batch.len(),
            processed: self.processed,
            total_result_count,
        };
        (batch, info)
    }
}
