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

//! Fetch request descriptors and the acknowledgment wire format.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bytes::Bytes;

use crate::error::{Result, ShuffleError};
use crate::transport::ConnectionId;

/// Lifecycle of a fetch request inside the dispatcher.
///
/// `Errored` is terminal and reachable from `Dispatching` on transport
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Parsed from the wire, not yet queued.
    Received,
    /// Waiting in the inbound queue.
    Queued,
    /// A worker is issuing the remote write.
    Dispatching,
    /// The acknowledgment was handed to the transport.
    Acknowledged,
    /// The dispatch failed; the requester sees no complete ack.
    Errored,
}

/// A parsed, immutable description of one fetch request.
///
/// Created by the receive path, transferred to the dispatcher queue,
/// destroyed after service or on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleRequest {
    /// Identifier of the originating job.
    pub job_id: String,
    /// Identifier of the map task whose output is requested.
    pub map_id: String,
    /// Byte offset into the map output partition.
    pub map_offset: u64,
    /// Destination reduce partition id.
    pub reduce_id: u32,
    /// Remote memory address the partition bytes are written to.
    pub remote_addr: u64,
    /// Connection the request arrived on; writes and the ack go back
    /// over it.
    pub conn: ConnectionId,
    /// The requester's completion-slot id, echoed with the ack so the
    /// remote side can correlate it to its pending receive.
    pub peer_wqe: u64,
}

impl ShuffleRequest {
    /// Parses the colon-delimited fetch parameter string
    /// `jobId:mapId:mapOffset:reduceId:remoteAddr`.
    ///
    /// The first two fields are opaque strings without embedded colons;
    /// the last three are decimal integers, the last 64-bit. A missing
    /// field or a non-numeric integer is an [`ShuffleError::InvalidRequest`];
    /// nothing is ever silently defaulted to zero.
    pub fn parse(param: &str, conn: ConnectionId, peer_wqe: u64) -> Result<Self> {
        let mut fields = param.splitn(5, ':');
        let job_id = next_field(&mut fields, param, "jobId")?;
        let map_id = next_field(&mut fields, param, "mapId")?;
        let map_offset = parse_field(&mut fields, param, "mapOffset")?;
        let reduce_id = parse_field(&mut fields, param, "reduceId")?;
        let remote_addr = parse_field(&mut fields, param, "remoteAddr")?;

        Ok(Self {
            job_id: job_id.to_owned(),
            map_id: map_id.to_owned(),
            map_offset,
            reduce_id,
            remote_addr,
            conn,
            peer_wqe,
        })
    }

    /// Derives the continuation request for the bytes remaining after a
    /// short write of `sent` bytes: both the map output offset and the
    /// remote target address advance past what was delivered.
    pub fn continuation(&self, sent: u64) -> Self {
        Self {
            map_offset: self.map_offset + sent,
            remote_addr: self.remote_addr + sent,
            ..self.clone()
        }
    }
}

impl Display for ShuffleRequest {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}/{} reduce {} offset {}",
            self.job_id, self.map_id, self.reduce_id, self.map_offset
        )
    }
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    param: &str,
    name: &str,
) -> Result<&'a str> {
    fields.next().ok_or_else(|| {
        ShuffleError::InvalidRequest(format!("missing {name} in '{param}'"))
    })
}

fn parse_field<'a, T: FromStr>(
    fields: &mut impl Iterator<Item = &'a str>,
    param: &str,
    name: &str,
) -> Result<T> {
    let raw = next_field(fields, param, name)?;
    raw.parse::<T>().map_err(|_| {
        ShuffleError::InvalidRequest(format!("invalid {name} '{raw}' in '{param}'"))
    })
}

/// Builds the fixed-format acknowledgment payload
/// `rawLength:partLength:bytesSent:` (trailing colon retained),
/// terminated with a NUL byte as transmitted on the wire.
pub fn format_ack(raw_length: u64, part_length: u64, bytes_sent: usize) -> Bytes {
    let mut ack = format!("{raw_length}:{part_length}:{bytes_sent}:").into_bytes();
    ack.push(0);
    Bytes::from(ack)
}
