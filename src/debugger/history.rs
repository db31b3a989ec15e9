use crate::value::{CallRecord, Value};
use std::collections::VecDeque;

/// Fixed-capacity ring of the most recent calls.
#[derive(Debug)]
pub struct CallHistory {
    records: VecDeque<CallRecord>,
    capacity: usize,
    next_seq: u64,
}

impl CallHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Appends a record, evicting the oldest one at capacity. Returns its sequence position.
    pub fn add(&mut self, mut record: CallRecord) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        record.seq = seq;
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        seq
    }

    /// Records in `[start, end)` counted backward from the newest, returned oldest first.
    pub fn query(&self, start: usize, end: usize) -> Vec<CallRecord> {
        let size = self.records.len();
        if start >= size {
            return Vec::new();
        }
        let end = end.min(size);
        if end <= start {
            return Vec::new();
        }
        self.records
            .range(size - end..size - start)
            .cloned()
            .collect()
    }

    pub fn set_ret(&mut self, ret: Value) {
        if let Some(last) = self.records.back_mut() {
            last.ret = Some(ret);
        }
    }

    pub fn set_error(&mut self, error: u32) {
        if let Some(last) = self.records.back_mut() {
            last.error = Some(error);
        }
    }

    pub fn set_debug_output(&mut self, text: String) {
        if let Some(last) = self.records.back_mut() {
            last.debug_output = Some(text);
        }
    }

    pub fn last(&self) -> Option<&CallRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence position the next added record will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}
