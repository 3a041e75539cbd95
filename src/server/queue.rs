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

//! Inbound fetch request queue.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, ShuffleError};
use crate::server::request::ShuffleRequest;

struct QueueInner {
    queue: VecDeque<ShuffleRequest>,
    closed: bool,
}

/// FIFO of pending fetch requests shared between receive-path producers
/// and dispatch workers.
///
/// Producers append under an exclusive lock and broadcast a wakeup to
/// all waiting consumers. The wakeup is a hint, not a guarantee of
/// available work: consumers re-check the queue state under the same
/// lock after every wakeup. Once closed, the queue rejects new requests
/// but still hands out whatever is pending, so a close-then-drain
/// shutdown loses nothing.
pub struct RequestQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    /// Creates an open, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                queue: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends a request to the tail and wakes all waiting consumers.
    ///
    /// Safe for many concurrent producers. Fails once the queue has been
    /// closed.
    pub fn push(&self, req: ShuffleRequest) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ShuffleError::Internal(
                "request queue is closed".to_owned(),
            ));
        }
        inner.queue.push_back(req);
        self.available.notify_all();
        Ok(())
    }

    /// Removes the request at the head, blocking while the queue is
    /// empty and open.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn pop_wait(&self) -> Option<ShuffleRequest> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(req) = inner.queue.pop_front() {
                return Some(req);
            }
            if inner.closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Re-enqueues the continuation of an in-flight request.
    ///
    /// Unlike [`RequestQueue::push`] this is allowed while the queue is
    /// draining: a continuation belongs to a request that was already
    /// accepted, and dropping it would truncate that transfer.
    pub fn requeue(&self, req: ShuffleRequest) {
        let mut inner = self.inner.lock();
        inner.queue.push_back(req);
        self.available.notify_all();
    }

    /// Stops accepting new requests and wakes every waiter.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.available.notify_all();
    }

    /// Reopens a closed queue for a fresh start of the server.
    pub fn reopen(&self) {
        self.inner.lock().closed = false;
    }

    /// Discards all pending requests, returning how many were dropped.
    pub fn clear_pending(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.queue.len();
        inner.queue.clear();
        dropped
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Returns true if no requests are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// Returns true once the queue no longer accepts requests.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
