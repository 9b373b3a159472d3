//! Per-transition stage queues.
//!
//! The scan queue is a priority queue keyed by the parsed scan time, so
//! out-of-order scanner delivery still yields chronological matching.
//! The downstream queues are strict FIFOs: within a window the pipeline
//! processes cameras in belt order, so arrival order equals belt order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use contracts::Stage;

/// Scan queue entry ordered by scan time, then uid for stability.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub time_s: f64,
    pub uid: String,
}

impl PartialEq for ScanEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time_s == other.time_s && self.uid == other.uid
    }
}

impl Eq for ScanEntry {}

impl PartialOrd for ScanEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScanEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest scan
        // at the top.
        other
            .time_s
            .total_cmp(&self.time_s)
            .then_with(|| other.uid.cmp(&self.uid))
    }
}

/// One queue per checkpoint transition, keyed by the from-stage.
#[derive(Debug, Default)]
pub struct StageQueues {
    /// Masters awaiting their first camera confirmation
    scan: BinaryHeap<ScanEntry>,
    /// Masters last confirmed at a camera, awaiting the next one
    downstream: HashMap<Stage, VecDeque<String>>,
}

impl StageQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a freshly scanned master.
    pub fn push_scan(&mut self, uid: String, time_s: f64) {
        self.scan.push(ScanEntry { time_s, uid });
    }

    /// Enqueue a master last confirmed at `from`.
    pub fn push_downstream(&mut self, from: Stage, uid: String) {
        self.downstream.entry(from).or_default().push_back(uid);
    }

    /// Peek the head master awaiting departure from `from`.
    pub fn head(&self, from: Stage) -> Option<&str> {
        match from {
            Stage::Scanner => self.scan.peek().map(|e| e.uid.as_str()),
            _ => self
                .downstream
                .get(&from)
                .and_then(|q| q.front())
                .map(String::as_str),
        }
    }

    /// Pop the head master of `from`'s queue.
    pub fn pop_head(&mut self, from: Stage) -> Option<String> {
        match from {
            Stage::Scanner => self.scan.pop().map(|e| e.uid),
            _ => self.downstream.get_mut(&from).and_then(VecDeque::pop_front),
        }
    }

    /// Pop the head of `from`'s queue only if it is `uid`.
    ///
    /// Defends against removing the wrong entry after the queue has
    /// progressed.
    pub fn pop_head_if(&mut self, from: Stage, uid: &str) -> bool {
        if self.head(from) == Some(uid) {
            self.pop_head(from);
            true
        } else {
            false
        }
    }

    /// Remove `uid` from every queue, wherever it sits.
    ///
    /// Only used when archiving, so a retired master can never linger
    /// as a dangling head.
    pub fn purge(&mut self, uid: &str) {
        if self.scan.iter().any(|e| e.uid == uid) {
            let kept: Vec<ScanEntry> = self.scan.drain().filter(|e| e.uid != uid).collect();
            self.scan = kept.into_iter().collect();
        }
        for queue in self.downstream.values_mut() {
            queue.retain(|m| m != uid);
        }
    }

    pub fn len(&self, from: Stage) -> usize {
        match from {
            Stage::Scanner => self.scan.len(),
            _ => self.downstream.get(&from).map_or(0, VecDeque::len),
        }
    }

    pub fn is_empty(&self, from: Stage) -> bool {
        self.len(from) == 0
    }
}
