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

//! In-memory partition store.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use log::debug;

use super::{Chunk, IndexRecord, PartitionStore, StagedPartition};
use crate::error::{Result, ShuffleError};
use crate::server::ShuffleRequest;
use crate::transport::ChunkTag;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PartitionKey {
    job_id: String,
    map_id: String,
    reduce_id: u32,
}

struct StagedEntry {
    record: IndexRecord,
    chunk: Chunk,
}

/// Map-output partitions staged entirely in memory, keyed by
/// `(job, map, reduce)`.
///
/// This is the store used by tests and by embedders that keep fetched
/// partitions resident rather than delegating to a disk-backed map
/// output manager.
#[derive(Default)]
pub struct InMemoryPartitionStore {
    partitions: DashMap<PartitionKey, StagedEntry>,
    next_tag: AtomicU64,
}

impl InMemoryPartitionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages one partition's bytes, returning the chunk tag assigned to
    /// the staging buffer.
    pub fn stage(
        &self,
        job_id: impl Into<String>,
        map_id: impl Into<String>,
        reduce_id: u32,
        record: IndexRecord,
        data: Bytes,
    ) -> ChunkTag {
        let tag = ChunkTag(self.next_tag.fetch_add(1, Ordering::Relaxed));
        let key = PartitionKey {
            job_id: job_id.into(),
            map_id: map_id.into(),
            reduce_id,
        };
        debug!(
            "staging {} bytes for job {} map {} reduce {}",
            data.len(),
            key.job_id,
            key.map_id,
            key.reduce_id
        );
        self.partitions.insert(
            key,
            StagedEntry {
                record,
                chunk: Chunk::new(tag, data),
            },
        );
        tag
    }

    /// Drops every partition staged for a job. Called at job boundary.
    pub fn evict_job(&self, job_id: &str) {
        self.partitions.retain(|key, _| key.job_id != job_id);
    }

    /// Number of partitions currently staged.
    pub fn staged_count(&self) -> usize {
        self.partitions.len()
    }
}

impl PartitionStore for InMemoryPartitionStore {
    fn locate(&self, req: &ShuffleRequest) -> Result<StagedPartition> {
        let key = PartitionKey {
            job_id: req.job_id.clone(),
            map_id: req.map_id.clone(),
            reduce_id: req.reduce_id,
        };
        let entry = self.partitions.get(&key).ok_or_else(|| {
            ShuffleError::PartitionNotFound(format!(
                "job {} map {} reduce {}",
                req.job_id, req.map_id, req.reduce_id
            ))
        })?;

        let offset = req.map_offset as usize;
        if offset > entry.chunk.len() {
            return Err(ShuffleError::InvalidRequest(format!(
                "offset {offset} beyond staged partition of {} bytes",
                entry.chunk.len()
            )));
        }

        Ok(StagedPartition {
            record: entry.record,
            chunk: entry.chunk.clone(),
            length: (entry.chunk.len() - offset) as u64,
            offset_alignment: offset,
        })
    }
}
