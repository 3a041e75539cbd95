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

//! Shuffle error types

use std::{
    error::Error,
    fmt::{Display, Formatter},
    io, result,
};

/// Result type alias for shuffle operations.
pub type Result<T> = result::Result<T, ShuffleError>;

/// Error types for shuffle data movement.
#[derive(Debug)]
pub enum ShuffleError {
    /// General error with a descriptive message.
    General(String),
    /// Internal error indicating a bug or unexpected state.
    Internal(String),
    /// A fetch request string failed to parse.
    InvalidRequest(String),
    /// An element was inserted into a priority queue that is already at capacity.
    HeapCapacity {
        /// The fixed capacity the queue was constructed with.
        capacity: usize,
    },
    /// A remote write or send was rejected by the transport.
    Transport(String),
    /// A fetch request named a partition that is not staged.
    PartitionNotFound(String),
    /// Error reported by a decompression codec.
    Codec(String),
    /// I/O operation error.
    IoError(io::Error),
}

#[allow(clippy::from_over_into)]
impl<T> Into<Result<T>> for ShuffleError {
    fn into(self) -> Result<T> {
        Err(self)
    }
}

/// Creates a general shuffle error from a string message.
pub fn shuffle_error(message: &str) -> ShuffleError {
    ShuffleError::General(message.to_owned())
}

impl From<String> for ShuffleError {
    fn from(e: String) -> Self {
        ShuffleError::General(e)
    }
}

impl From<io::Error> for ShuffleError {
    fn from(e: io::Error) -> Self {
        ShuffleError::IoError(e)
    }
}

impl Display for ShuffleError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ShuffleError::General(desc) => write!(f, "General error: {desc}"),
            ShuffleError::Internal(desc) => {
                write!(f, "Internal shuffle error: {desc}")
            }
            ShuffleError::InvalidRequest(desc) => {
                write!(f, "Invalid fetch request: {desc}")
            }
            ShuffleError::HeapCapacity { capacity } => {
                write!(f, "Priority queue capacity {capacity} exceeded")
            }
            ShuffleError::Transport(desc) => write!(f, "Transport error: {desc}"),
            ShuffleError::PartitionNotFound(desc) => {
                write!(f, "Partition not found: {desc}")
            }
            ShuffleError::Codec(desc) => write!(f, "Codec error: {desc}"),
            ShuffleError::IoError(desc) => write!(f, "IO error: {desc}"),
        }
    }
}

impl Error for ShuffleError {}
