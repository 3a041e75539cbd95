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

//! The output server: dispatches fetch requests to remote-memory writes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use dashmap::DashMap;
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::config::OutputServerConfig;
use crate::error::{Result, ShuffleError};
use crate::server::queue::RequestQueue;
use crate::server::request::{format_ack, RequestState, ShuffleRequest};
use crate::store::{Chunk, IndexRecord, PartitionStore};
use crate::transport::{Transport, TransportProvider};

/// Result of servicing one fetch request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The full requested length was written and acknowledged.
    Acknowledged {
        /// Bytes accepted by the transport for the write.
        bytes_sent: usize,
    },
    /// The transport accepted only part of the write. The ack reporting
    /// the true byte count was still sent; `continuation` covers the
    /// remainder and should be re-enqueued.
    ShortWrite {
        /// Derived descriptor for the bytes not yet delivered.
        continuation: ShuffleRequest,
        /// Bytes accepted by the transport for this write.
        sent: usize,
    },
}

/// Per-job diagnostic counters. Informational only; never gate
/// correctness.
#[derive(Debug, Default)]
struct JobCounters {
    received: AtomicU64,
    sent: AtomicU64,
}

/// Accepts shuffle fetch requests and drives outgoing remote-memory
/// writes plus acknowledgments.
///
/// Producers (network receive threads) call
/// [`OutputServer::insert_incoming_req`]; a pool of worker threads pulls
/// descriptors from the inbound queue, locates the staged partition
/// through the [`PartitionStore`], and services each request once. No
/// ordering is guaranteed across requests from different connections or
/// map tasks.
pub struct OutputServer {
    config: OutputServerConfig,
    provider: Arc<dyn TransportProvider>,
    store: Arc<dyn PartitionStore>,
    queue: Arc<RequestQueue>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    counters: DashMap<String, Arc<JobCounters>>,
}

impl OutputServer {
    /// Creates a stopped server. Call [`OutputServer::start`] to bind the
    /// transport and begin accepting requests.
    pub fn new(
        config: OutputServerConfig,
        provider: Arc<dyn TransportProvider>,
        store: Arc<dyn PartitionStore>,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            queue: Arc::new(RequestQueue::new()),
            transport: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            counters: DashMap::new(),
        }
    }

    /// Acquires a transport bound to the configured endpoint and spawns
    /// the worker pool.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ShuffleError::Internal(
                "output server already started".to_owned(),
            ));
        }

        let transport = match self.provider.bind(&self.config.endpoint) {
            Ok(transport) => transport,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        info!("output server listening on {}", self.config.endpoint);
        *self.transport.lock() = Some(transport);
        self.queue.reopen();

        let mut workers = self.workers.lock();
        for id in 0..self.config.worker_threads {
            let server = Arc::clone(self);
            let handle = thread::Builder::new()
                .name(format!("shuffle-worker-{id}"))
                .spawn(move || server.worker_loop(id))?;
            workers.push(handle);
        }
        Ok(())
    }

    /// Stops the server: refuses new requests, drains pending ones until
    /// the queue empties or the drain timeout elapses, waits for in-flight
    /// dispatches to finish, then releases the transport exactly once.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.queue.close();

        let deadline = Instant::now() + self.config.drain_timeout;
        while !self.queue.is_empty() {
            if Instant::now() >= deadline {
                let dropped = self.queue.clear_pending();
                warn!("drain timed out, {dropped} pending requests dropped");
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }

        for handle in self.workers.lock().drain(..) {
            if handle.join().is_err() {
                error!("shuffle worker panicked");
            }
        }
        *self.transport.lock() = None;
        info!("output server stopped");
    }

    /// Appends a parsed request to the tail of the inbound queue and
    /// wakes a worker. Safe for many concurrent producers.
    pub fn insert_incoming_req(&self, req: ShuffleRequest) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ShuffleError::Internal(
                "output server is not running".to_owned(),
            ));
        }
        self.job_counters(&req.job_id)
            .received
            .fetch_add(1, Ordering::Relaxed);
        debug!(
            "request {req}: {:?} -> {:?}",
            RequestState::Received,
            RequestState::Queued
        );
        self.queue.push(req)
    }

    /// Services one request: issues the remote write of `length` bytes
    /// from `chunk` at `offset_alignment` to the descriptor's remote
    /// address, then sends the acknowledgment over the same connection.
    ///
    /// A short write returns [`DispatchOutcome::ShortWrite`] carrying the
    /// continuation descriptor; a write the transport accepts no bytes of
    /// is a transport error, so continuation chains always make progress.
    pub fn start_outgoing_req(
        &self,
        req: &ShuffleRequest,
        record: &IndexRecord,
        chunk: &Chunk,
        length: u64,
        offset_alignment: usize,
    ) -> Result<DispatchOutcome> {
        let transport = self.transport()?;
        let payload = chunk.slice(offset_alignment, length as usize)?;

        let sent = transport.write(req.conn, &payload, req.remote_addr, chunk.tag())?;
        if sent == 0 && length > 0 {
            return Err(ShuffleError::Transport(format!(
                "remote write to {:#x} accepted no bytes",
                req.remote_addr
            )));
        }

        let ack = format_ack(record.raw_length, record.part_length, sent);
        transport.send(&ack, req.peer_wqe, chunk.tag(), req.conn)?;
        self.job_counters(&req.job_id)
            .sent
            .fetch_add(1, Ordering::Relaxed);

        if (sent as u64) < length {
            Ok(DispatchOutcome::ShortWrite {
                continuation: req.continuation(sent as u64),
                sent,
            })
        } else {
            Ok(DispatchOutcome::Acknowledged { bytes_sent: sent })
        }
    }

    /// Resets the diagnostic counters of one job at job boundary.
    pub fn clean_job(&self, job_id: &str) {
        self.counters.remove(job_id);
        info!("job {job_id} counters cleaned");
    }

    /// Resets the diagnostic counters of every job.
    pub fn clean_all_jobs(&self) {
        self.counters.clear();
        info!("all job counters cleaned");
    }

    /// Records received and sent for a job, or `None` if never seen.
    pub fn job_stats(&self, job_id: &str) -> Option<(u64, u64)> {
        self.counters.get(job_id).map(|counters| {
            (
                counters.received.load(Ordering::Relaxed),
                counters.sent.load(Ordering::Relaxed),
            )
        })
    }

    fn worker_loop(&self, id: usize) {
        debug!("shuffle worker {id} started");
        while let Some(req) = self.queue.pop_wait() {
            self.service(req);
        }
        debug!("shuffle worker {id} stopped");
    }

    /// Pulls one request through `Dispatching` to a terminal state.
    fn service(&self, req: ShuffleRequest) {
        debug!(
            "request {req}: {:?} -> {:?}",
            RequestState::Queued,
            RequestState::Dispatching
        );
        let staged = match self.store.locate(&req) {
            Ok(staged) => staged,
            Err(e) => {
                error!("request {req}: {:?}: {e}", RequestState::Errored);
                return;
            }
        };
        match self.start_outgoing_req(
            &req,
            &staged.record,
            &staged.chunk,
            staged.length,
            staged.offset_alignment,
        ) {
            Ok(DispatchOutcome::Acknowledged { bytes_sent }) => {
                debug!(
                    "request {req}: {:?} ({bytes_sent} bytes)",
                    RequestState::Acknowledged
                );
            }
            Ok(DispatchOutcome::ShortWrite { continuation, sent }) => {
                warn!(
                    "request {req}: short write ({sent} of {} bytes), re-enqueueing remainder",
                    staged.length
                );
                self.queue.requeue(continuation);
            }
            Err(e) => {
                error!("request {req}: {:?}: {e}", RequestState::Errored);
            }
        }
    }

    fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.transport.lock().clone().ok_or_else(|| {
            ShuffleError::Internal("output server transport not acquired".to_owned())
        })
    }

    fn job_counters(&self, job_id: &str) -> Arc<JobCounters> {
        self.counters
            .entry(job_id.to_owned())
            .or_default()
            .clone()
    }
}
