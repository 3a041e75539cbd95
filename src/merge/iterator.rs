// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! K-way merge iterator over sorted segments.

use log::{debug, warn};

use super::heap::{Comparator, PriorityQueue};
use super::segment::{Segment, SegmentAdvance};
use crate::error::Result;

/// Orders segments by raw byte-wise lexicographic comparison of their
/// current keys.
///
/// This must match exactly the comparator used to originally sort each
/// input run; any mismatch silently corrupts merge order.
pub struct KeyOrdering;

impl Comparator<Box<dyn Segment>> for KeyOrdering {
    fn less_than(&self, a: &Box<dyn Segment>, b: &Box<dyn Segment>) -> bool {
        a.key() < b.key()
    }
}

/// Outcome of offering a segment to the merge.
pub enum InsertOutcome {
    /// The segment had a record and entered the priority queue.
    Queued,
    /// The segment was already exhausted and has been dropped.
    Exhausted,
    /// The segment's record was not yet available; its buffering strategy
    /// was switched and the caller should retry the insert later.
    Deferred(Box<dyn Segment>),
    /// The segment's record was not available and no buffering switch was
    /// possible; it has been dropped.
    Dropped,
}

impl std::fmt::Debug for InsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertOutcome::Queued => write!(f, "Queued"),
            InsertOutcome::Exhausted => write!(f, "Exhausted"),
            InsertOutcome::Deferred(segment) => {
                write!(f, "Deferred({})", segment.task_id())
            }
            InsertOutcome::Dropped => write!(f, "Dropped"),
        }
    }
}

/// Merges up to N independently advancing sorted segments into one
/// globally sorted key/value stream.
///
/// N is the priority-queue capacity, fixed per instance. Each segment is
/// owned by exactly one place at a time: the queue, or the caller while
/// an insert is deferred. Exhausted segments are dropped exactly once.
///
/// Advancement is lazy: the record exposed after a successful
/// [`MergeIterator::next`] stays valid and stable until the next call,
/// because the minimum segment is only advanced at that point. The
/// accessor borrows are tied to the iterator, so a stale view cannot
/// outlive the record it refers to.
pub struct MergeIterator {
    queue: PriorityQueue<Box<dyn Segment>, KeyOrdering>,
    exposed: bool,
}

impl MergeIterator {
    /// Creates a merge over at most `capacity` concurrent segments.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: PriorityQueue::with_capacity(capacity, KeyOrdering),
            exposed: false,
        }
    }

    /// Number of segments currently live in the merge.
    pub fn live_segments(&self) -> usize {
        self.queue.len()
    }

    /// Offers a segment to the merge, advancing it to its first record.
    ///
    /// An exhausted segment is dropped immediately and never enters the
    /// queue. An interrupted segment is asked to switch its buffering
    /// strategy: on success it is handed back for a later retry, on
    /// failure it is dropped. Capacity errors from the underlying queue
    /// propagate.
    pub fn insert(&mut self, mut segment: Box<dyn Segment>) -> Result<InsertOutcome> {
        match segment.advance() {
            SegmentAdvance::Exhausted => {
                debug!("segment {} exhausted on insert", segment.task_id());
                Ok(InsertOutcome::Exhausted)
            }
            SegmentAdvance::HasNext => {
                self.queue.put(segment)?;
                debug!("merge queue size {}", self.queue.len());
                Ok(InsertOutcome::Queued)
            }
            SegmentAdvance::Interrupted => {
                if segment.switch_buffering() {
                    debug!(
                        "segment {} interrupted on insert, buffering switched",
                        segment.task_id()
                    );
                    Ok(InsertOutcome::Deferred(segment))
                } else {
                    warn!(
                        "segment {}: record incomplete and buffering switch failed, dropping",
                        segment.task_id()
                    );
                    Ok(InsertOutcome::Dropped)
                }
            }
        }
    }

    /// Advances the externally visible cursor by exactly one record.
    ///
    /// Returns false when no more data is available. Otherwise the
    /// record accessors view the new minimum until the next call.
    pub fn next(&mut self) -> bool {
        if self.queue.is_empty() {
            self.exposed = false;
            return false;
        }
        if self.exposed {
            self.advance_min();
            if self.queue.is_empty() {
                self.exposed = false;
                return false;
            }
        }
        self.exposed = true;
        true
    }

    /// The current record's key. Empty when no record is exposed.
    pub fn key(&self) -> &[u8] {
        self.current().map(|s| s.key()).unwrap_or(&[])
    }

    /// The current record's value. Empty when no record is exposed.
    pub fn value(&self) -> &[u8] {
        self.current().map(|s| s.value()).unwrap_or(&[])
    }

    /// Logical length of the current key in bytes.
    pub fn key_len(&self) -> usize {
        self.current().map(|s| s.key_len()).unwrap_or(0)
    }

    /// Logical length of the current value in bytes.
    pub fn value_len(&self) -> usize {
        self.current().map(|s| s.value_len()).unwrap_or(0)
    }

    /// Raw bytes consumed from the source for the current key.
    pub fn key_bytes(&self) -> usize {
        self.current().map(|s| s.key_bytes()).unwrap_or(0)
    }

    /// Raw bytes consumed from the source for the current value.
    pub fn value_bytes(&self) -> usize {
        self.current().map(|s| s.value_bytes()).unwrap_or(0)
    }

    fn current(&self) -> Option<&Box<dyn Segment>> {
        if self.exposed {
            self.queue.top()
        } else {
            None
        }
    }

    /// Advances the previously exposed minimum and reclassifies it,
    /// adjusting or shrinking the queue accordingly.
    fn advance_min(&mut self) {
        let outcome = match self.queue.top_mut() {
            Some(segment) => segment.advance(),
            None => return,
        };
        match outcome {
            SegmentAdvance::HasNext => self.queue.adjust_top(),
            SegmentAdvance::Exhausted => {
                if let Some(segment) = self.queue.pop() {
                    debug!(
                        "segment {} exhausted, {} remaining",
                        segment.task_id(),
                        self.queue.len()
                    );
                }
            }
            SegmentAdvance::Interrupted => {
                let switched = self
                    .queue
                    .top_mut()
                    .map(|s| s.switch_buffering())
                    .unwrap_or(false);
                if switched {
                    self.queue.adjust_top();
                } else if let Some(segment) = self.queue.pop() {
                    warn!(
                        "segment {}: record incomplete and buffering switch failed, dropping",
                        segment.task_id()
                    );
                }
            }
        }
    }
}
