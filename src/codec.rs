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

//! Decompression codec capability.
//!
//! Map output may arrive block-compressed. Segment implementations that
//! stage compressed data consume a [`Decompressor`] to expand blocks as
//! the cursor crosses block boundaries. The backing library is an
//! implementation detail of the collaborator; this crate depends only on
//! the capability shape.

use bytes::Bytes;

use crate::error::Result;

/// Sizes of the next compressed block, read from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLengths {
    /// On-the-wire size of the block.
    pub compressed: usize,
    /// Size of the block once expanded.
    pub uncompressed: usize,
}

/// A block decompressor for staged map output.
pub trait Decompressor: Send {
    /// Prepares the codec for use. Called once before the first block.
    fn initialize(&mut self) -> Result<()>;

    /// Reads the next block's lengths from its header bytes.
    fn next_block_length(&self, header: &[u8]) -> Result<BlockLengths>;

    /// Expands one compressed block.
    fn decompress(&mut self, compressed: &[u8]) -> Result<Bytes>;
}
