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

#![doc = include_str!("../README.md")]

/// The current version of the shuffle core, derived from the Cargo package version.
pub const RDMA_SHUFFLE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decompression codec capability consumed by segment implementations.
pub mod codec;
/// Configuration options for the output server and the merge path.
pub mod config;
/// Error types and result definitions for shuffle operations.
pub mod error;
/// Bounded priority queue and k-way external-merge iterator.
pub mod merge;
/// Shuffle fetch request parsing, queuing and dispatch.
pub mod server;
/// Staging buffers, partition index metadata and partition lookup.
pub mod store;
/// Capability traits for the zero-copy network transport.
pub mod transport;
