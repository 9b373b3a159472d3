//! Per-camera frame buffer ordered by receive time.
//!
//! Uses index-based separation for better performance:
//! - HeapRb stores lightweight metadata (receive time + slab key)
//! - Slab stores actual FramePacket data
//!
//! This avoids moving image payloads during buffer operations.

use std::cmp::Ordering;
use std::fmt;

use contracts::FramePacket;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight metadata stored in ring buffer
#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    /// Arrival time, the grouping key
    receive_time: f64,
    /// Key into the slab storage
    slab_key: usize,
}

/// Per-camera buffer with oldest-first eviction
///
/// Uses index separation: HeapRb stores only lightweight metadata,
/// while actual FramePacket data lives in a Slab. This minimizes
/// memory movement for image payloads.
pub struct CameraBuffer {
    /// Ring buffer of metadata (receive time + slab key)
    index: HeapRb<FrameMeta>,
    /// Actual frame storage
    storage: Slab<FramePacket>,
    max_size: usize,
    dropped_count: u64,
    out_of_order_count: u64,
    received_in_period: u64,
    quarter_counts: [u64; 4],
    last_receive_time: Option<f64>,
}

impl fmt::Debug for CameraBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraBuffer")
            .field("len", &self.index.occupied_len())
            .field("max_size", &self.max_size)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl CameraBuffer {
    /// Create a new camera buffer
    #[inline]
    pub fn new(max_size: usize) -> Self {
        Self {
            index: HeapRb::new(max_size),
            storage: Slab::with_capacity(max_size),
            max_size,
            dropped_count: 0,
            out_of_order_count: 0,
            received_in_period: 0,
            quarter_counts: [0; 4],
            last_receive_time: None,
        }
    }

    /// Push a frame into the buffer
    ///
    /// If the buffer is full, overwrites the oldest frame.
    #[inline]
    pub fn push(&mut self, packet: FramePacket) {
        let receive_time = packet.receive_time;

        // Track out-of-order arrivals
        if let Some(last) = self.last_receive_time {
            if receive_time < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_receive_time = Some(receive_time);
        self.received_in_period += 1;

        // 250 ms bucket within the arrival second
        let quarter = (receive_time.rem_euclid(1.0) * 4.0) as usize;
        self.quarter_counts[quarter.min(3)] += 1;

        // If full, remove oldest entry from both index and storage
        if self.index.is_full() {
            if let Some(old_meta) = self.index.try_pop() {
                self.storage.remove(old_meta.slab_key);
            }
            self.dropped_count += 1;
        }

        // Insert frame into slab and metadata into ring buffer
        let slab_key = self.storage.insert(packet);
        let meta = FrameMeta {
            receive_time,
            slab_key,
        };
        let _ = self.index.try_push(meta);
    }

    /// Earliest buffered receive time, if any
    #[inline]
    pub fn min_receive_time(&self) -> Option<f64> {
        self.index
            .iter()
            .map(|m| m.receive_time)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }

    /// Collect frames whose receive time falls in [start, end)
    ///
    /// Returns (slab key, frame) pairs so a selected frame can later be
    /// removed with [`remove_key`](Self::remove_key).
    #[inline]
    pub fn frames_in_interval(&self, start: f64, end: f64) -> Vec<(usize, &FramePacket)> {
        self.index
            .iter()
            .filter(|m| m.receive_time >= start && m.receive_time < end)
            .filter_map(|m| self.storage.get(m.slab_key).map(|p| (m.slab_key, p)))
            .collect()
    }

    /// Remove a single frame by its slab key
    #[inline]
    pub fn remove_key(&mut self, slab_key: usize) -> Option<FramePacket> {
        if !self.storage.contains(slab_key) {
            return None;
        }
        let remaining: Vec<FrameMeta> = self
            .index
            .pop_iter()
            .filter(|m| m.slab_key != slab_key)
            .collect();
        for m in remaining {
            let _ = self.index.try_push(m);
        }
        Some(self.storage.remove(slab_key))
    }

    /// Remove frames whose receive time falls in [start, end)
    #[inline]
    pub fn remove_interval(&mut self, start: f64, end: f64) -> usize {
        let mut removed = 0;
        let remaining: Vec<FrameMeta> = self
            .index
            .pop_iter()
            .filter(|m| {
                if m.receive_time >= start && m.receive_time < end {
                    self.storage.remove(m.slab_key);
                    removed += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        // Rebuild index (only moves small metadata, not payloads)
        for m in remaining {
            let _ = self.index.try_push(m);
        }

        removed
    }

    /// Get the number of frames in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get dropped frame count
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Get out-of-order frame count
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }

    /// Frames received since the last call, then reset the counter
    #[inline]
    pub fn take_received_in_period(&mut self) -> u64 {
        std::mem::take(&mut self.received_in_period)
    }

    /// Per-quarter (250 ms) arrival counts since the last call, then
    /// reset the buckets
    #[inline]
    pub fn take_quarter_counts(&mut self) -> [u64; 4] {
        std::mem::take(&mut self.quarter_counts)
    }
}
