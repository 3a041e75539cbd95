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

//! Shuffle core configuration

use std::time::Duration;

/// Configuration for the output server.
///
/// Controls the transport endpoint, the size of the worker pool that
/// services fetch requests, and how long `stop` waits for pending
/// requests to drain before releasing the transport.
#[derive(Debug, Clone)]
pub struct OutputServerConfig {
    /// Endpoint the transport is bound to (default: `0.0.0.0:9010`)
    pub endpoint: String,
    /// Number of worker threads servicing the inbound queue
    /// (default: available parallelism)
    pub worker_threads: usize,
    /// Maximum time `stop` waits for the inbound queue to drain
    /// (default: 30s)
    pub drain_timeout: Duration,
}

impl Default for OutputServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "0.0.0.0:9010".to_owned(),
            worker_threads: std::thread::available_parallelism()
                .map(|v| v.get())
                .unwrap_or(1),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl OutputServerConfig {
    /// Creates a configuration bound to the given endpoint with defaults
    /// for everything else.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

/// Configuration for the merge path.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Maximum number of concurrently open segments per merge
    /// (default: 100). This is the fixed capacity of the merge
    /// iterator's priority queue.
    pub merge_factor: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { merge_factor: 100 }
    }
}
