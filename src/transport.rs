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

//! Capability traits for the zero-copy network transport.
//!
//! The transport implementation (connection setup, completion queues,
//! memory registration) lives outside this crate. The dispatcher consumes
//! it through [`Transport`], and acquires one bound to a configured
//! endpoint through [`TransportProvider`].

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::error::Result;

/// Opaque handle identifying an established connection to a remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tag identifying the staging chunk involved in a transport operation.
///
/// The completion path uses the tag to return the chunk to its owning
/// pool once the hardware reports the operation done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub u64);

/// Data-movement operations of the remote-memory transport.
///
/// Both operations are non-blocking posts. Completion is reported through
/// an external mechanism keyed on the [`ChunkTag`]; that return path is
/// outside this crate's responsibility. Within one connection, the
/// relative order of writes observed by the remote side is the
/// transport's responsibility.
pub trait Transport: Send + Sync {
    /// Issues a remote-memory write of `local` into the peer's buffer at
    /// `remote_addr` over `conn`.
    ///
    /// Returns the number of bytes actually accepted by the transport for
    /// this write, which may be less than `local.len()` (a short write).
    fn write(
        &self,
        conn: ConnectionId,
        local: &[u8],
        remote_addr: u64,
        tag: ChunkTag,
    ) -> Result<usize>;

    /// Sends a short control message over `conn`, tagged with the
    /// requester's completion-slot id `peer_wqe` so the remote side can
    /// correlate it to its pending receive.
    fn send(
        &self,
        buf: &[u8],
        peer_wqe: u64,
        tag: ChunkTag,
        conn: ConnectionId,
    ) -> Result<()>;
}

/// A factory responsible for binding transports to endpoints.
///
/// Implementations may create RDMA or plain TCP transports.
pub trait TransportProvider: Send + Sync {
    /// Acquires a transport bound to the given endpoint.
    fn bind(&self, endpoint: &str) -> Result<Arc<dyn Transport>>;
}
