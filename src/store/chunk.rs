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

//! Staging buffer chunks.

use bytes::Bytes;

use crate::error::{Result, ShuffleError};
use crate::transport::ChunkTag;

/// A buffer region used to stage transfer data.
///
/// Chunks are owned by a memory pool and borrowed by the dispatcher for
/// the duration of one remote write; the transport's completion path
/// returns them to the pool by tag. Cloning a chunk shares the backing
/// memory.
#[derive(Debug, Clone)]
pub struct Chunk {
    tag: ChunkTag,
    data: Bytes,
}

impl Chunk {
    /// Wraps staged bytes with their pool bookkeeping tag.
    pub fn new(tag: ChunkTag, data: Bytes) -> Self {
        Self { tag, data }
    }

    /// The tag the completion path uses to return this chunk to its pool.
    pub fn tag(&self) -> ChunkTag {
        self.tag
    }

    /// Length of the staged data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The full staged data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// A view of `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Bytes> {
        let end = offset.checked_add(len).ok_or_else(|| {
            ShuffleError::Internal(format!(
                "chunk slice overflows: offset {offset} + len {len}"
            ))
        })?;
        if end > self.data.len() {
            return Err(ShuffleError::Internal(format!(
                "chunk slice [{offset}, {end}) out of range for {} staged bytes",
                self.data.len()
            )));
        }
        Ok(self.data.slice(offset..end))
    }
}
