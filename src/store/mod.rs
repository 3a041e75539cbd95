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

//! Staged map output: chunks, index metadata and partition lookup.

mod chunk;
mod index;
mod memory;

pub use chunk::Chunk;
pub use index::{IndexRecord, PartitionIndex};
pub use memory::InMemoryPartitionStore;

use crate::error::Result;
use crate::server::ShuffleRequest;

/// The staged data a dispatcher needs to service one fetch request.
#[derive(Debug, Clone)]
pub struct StagedPartition {
    /// Per-partition length metadata for the acknowledgment.
    pub record: IndexRecord,
    /// Staging buffer holding the partition bytes.
    pub chunk: Chunk,
    /// Bytes to transfer for this request.
    pub length: u64,
    /// Offset into the chunk's buffer where the transfer starts.
    pub offset_alignment: usize,
}

/// Resolves fetch requests to staged partition data.
///
/// Implementations own the staging memory; the dispatcher borrows one
/// chunk per write and the external completion path returns it to the
/// pool.
pub trait PartitionStore: Send + Sync {
    /// Locates the buffer and metadata for the partition a request names,
    /// honoring the request's byte offset into the map output.
    fn locate(&self, req: &ShuffleRequest) -> Result<StagedPartition>;
}
