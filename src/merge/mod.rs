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

//! K-way external merge for sorted map-output segments.
//!
//! A reduce task receives one sorted run per map task. This module merges
//! those independently advancing runs into one globally sorted key/value
//! stream: a bounded priority queue keyed on each segment's current head
//! record, and an iterator that lazily advances the minimum segment as
//! the caller consumes records.
//!
//! The merge side is strictly single-threaded. Exactly one thread may
//! drive a given iterator; no internal locking is provided.

mod heap;
mod iterator;
mod segment;

pub use heap::{Comparator, InsertResult, PriorityQueue};
pub use iterator::{InsertOutcome, KeyOrdering, MergeIterator};
pub use segment::{encode_records, MemorySegment, Segment, SegmentAdvance};
