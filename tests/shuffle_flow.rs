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

//! End-to-end exercise of the data-movement core: map outputs are staged
//! on the serving side, fetch requests flow through the output server to
//! a recording transport, and the delivered runs are merged back into one
//! globally sorted stream on the reducing side.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use rdma_shuffle::config::OutputServerConfig;
use rdma_shuffle::error::Result;
use rdma_shuffle::merge::{encode_records, MemorySegment, MergeIterator};
use rdma_shuffle::server::{OutputServer, ShuffleRequest};
use rdma_shuffle::store::{IndexRecord, InMemoryPartitionStore};
use rdma_shuffle::transport::{ChunkTag, ConnectionId, Transport, TransportProvider};

/// Simulates the requester's memory: remote writes land at their target
/// addresses, acks are collected per completion slot.
#[derive(Default)]
struct RemoteMemory {
    regions: Mutex<HashMap<u64, Vec<u8>>>,
    acks: Mutex<Vec<(u64, Vec<u8>)>>,
    max_accept: usize,
}

impl RemoteMemory {
    fn region(&self, base_addr: u64) -> Vec<u8> {
        // Reassemble a region from writes at and after the base address,
        // which folds short-write continuations back together.
        let regions = self.regions.lock();
        let mut parts: Vec<_> = regions
            .iter()
            .filter(|(addr, _)| **addr >= base_addr && **addr < base_addr + (1 << 20))
            .collect();
        parts.sort_by_key(|(addr, _)| **addr);
        parts.into_iter().flat_map(|(_, data)| data.clone()).collect()
    }

    fn ack_count(&self) -> usize {
        self.acks.lock().len()
    }
}

impl Transport for RemoteMemory {
    fn write(
        &self,
        _conn: ConnectionId,
        local: &[u8],
        remote_addr: u64,
        _tag: ChunkTag,
    ) -> Result<usize> {
        let accepted = if self.max_accept == 0 {
            local.len()
        } else {
            local.len().min(self.max_accept)
        };
        self.regions
            .lock()
            .insert(remote_addr, local[..accepted].to_vec());
        Ok(accepted)
    }

    fn send(
        &self,
        buf: &[u8],
        peer_wqe: u64,
        _tag: ChunkTag,
        _conn: ConnectionId,
    ) -> Result<()> {
        self.acks.lock().push((peer_wqe, buf.to_vec()));
        Ok(())
    }
}

struct Provider(Arc<RemoteMemory>);

impl TransportProvider for Provider {
    fn bind(&self, _endpoint: &str) -> Result<Arc<dyn Transport>> {
        Ok(self.0.clone())
    }
}

fn sorted_run(records: &[(&str, &str)]) -> Bytes {
    encode_records(
        records
            .iter()
            .map(|(k, v)| (k.as_bytes(), v.as_bytes())),
    )
}

fn config() -> OutputServerConfig {
    OutputServerConfig {
        endpoint: "127.0.0.1:0".to_owned(),
        worker_threads: 2,
        drain_timeout: Duration::from_secs(10),
    }
}

#[test]
fn fetch_dispatch_and_merge() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Three map tasks, each with a sorted run for reduce partition 0.
    let runs: Vec<(&str, Bytes)> = vec![
        ("map_0", sorted_run(&[("apple", "1"), ("melon", "3")])),
        ("map_1", sorted_run(&[("banana", "2")])),
        ("map_2", sorted_run(&[("peach", "4")])),
    ];

    let store = Arc::new(InMemoryPartitionStore::new());
    for (map_id, data) in &runs {
        let record = IndexRecord {
            start_offset: 0,
            raw_length: data.len() as u64,
            part_length: data.len() as u64,
        };
        store.stage("job_7", *map_id, 0, record, data.clone());
    }

    let remote = Arc::new(RemoteMemory::default());
    let server = Arc::new(OutputServer::new(
        config(),
        Arc::new(Provider(remote.clone())),
        store,
    ));
    server.start().unwrap();

    // One fetch per map output, each targeting its own remote region.
    let bases: Vec<u64> = (0..runs.len() as u64).map(|i| 0x10_0000 * (i + 1)).collect();
    for (i, (map_id, _)) in runs.iter().enumerate() {
        let param = format!("job_7:{map_id}:0:0:{}", bases[i]);
        let req = ShuffleRequest::parse(&param, ConnectionId(5), 100 + i as u64).unwrap();
        server.insert_incoming_req(req).unwrap();
    }
    server.stop();

    // Every fetch was acknowledged with the staged lengths.
    assert_eq!(remote.ack_count(), 3);
    for (peer_wqe, ack) in remote.acks.lock().iter() {
        assert!((100..103).contains(peer_wqe));
        let text = std::str::from_utf8(&ack[..ack.len() - 1]).unwrap();
        let fields: Vec<&str> = text.split(':').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3], "");
        // raw == part == bytes sent for these uncompressed runs.
        assert_eq!(fields[0], fields[1]);
        assert_eq!(fields[1], fields[2]);
    }
    assert_eq!(server.job_stats("job_7"), Some((3, 3)));

    // The reducer side: wrap each delivered region in a segment and merge.
    let mut merge = MergeIterator::new(runs.len());
    for (i, (map_id, data)) in runs.iter().enumerate() {
        let delivered = remote.region(bases[i]);
        assert_eq!(&delivered[..], &data[..], "partition {map_id} corrupted in flight");
        merge
            .insert(Box::new(MemorySegment::new(
                *map_id,
                Bytes::from(delivered),
            )))
            .unwrap();
    }

    let mut keys = Vec::new();
    let mut values = Vec::new();
    while merge.next() {
        keys.push(String::from_utf8(merge.key().to_vec()).unwrap());
        values.push(String::from_utf8(merge.value().to_vec()).unwrap());
    }
    assert_eq!(keys, vec!["apple", "banana", "melon", "peach"]);
    assert_eq!(values, vec!["1", "2", "3", "4"]);
}

#[test]
fn short_writes_reassemble_at_the_remote() {
    let _ = env_logger::builder().is_test(true).try_init();

    let data = sorted_run(&[("key_a", "aaaa"), ("key_b", "bbbb"), ("key_c", "cccc")]);
    let store = Arc::new(InMemoryPartitionStore::new());
    store.stage(
        "job_8",
        "map_0",
        3,
        IndexRecord {
            start_offset: 0,
            raw_length: data.len() as u64,
            part_length: data.len() as u64,
        },
        data.clone(),
    );

    // A transport that accepts at most 7 bytes per post forces a
    // continuation chain.
    let remote = Arc::new(RemoteMemory {
        max_accept: 7,
        ..Default::default()
    });
    let server = Arc::new(OutputServer::new(
        config(),
        Arc::new(Provider(remote.clone())),
        store,
    ));
    server.start().unwrap();

    let base = 0x20_0000;
    let req = ShuffleRequest::parse(
        &format!("job_8:map_0:0:3:{base}"),
        ConnectionId(2),
        7,
    )
    .unwrap();
    server.insert_incoming_req(req).unwrap();
    server.stop();

    // The chain delivered every byte, in place, and each hop was acked.
    assert_eq!(remote.region(base), data.to_vec());
    assert!(remote.ack_count() >= 2);

    // The reassembled region is still a readable sorted run.
    let mut merge = MergeIterator::new(1);
    merge
        .insert(Box::new(MemorySegment::new(
            "map_0",
            Bytes::from(remote.region(base)),
        )))
        .unwrap();
    let mut count = 0;
    while merge.next() {
        count += 1;
    }
    assert_eq!(count, 3);
}
