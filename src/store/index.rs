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

//! Partition index for consolidated map-output files.
//!
//! Each map task writes one consolidated output file plus an index with
//! one fixed-width record per reduce partition. Format:
//!
//! ```text
//! [u64: start_offset][u64: raw_length][u64: part_length]  (per partition)
//! ```
//!
//! All values are little-endian u64. `start_offset` is the byte offset of
//! the partition within the data file, `raw_length` its uncompressed
//! size, `part_length` its size as stored (compressed).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, ShuffleError};

/// Per-partition length metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Byte offset of the partition within the map output file.
    pub start_offset: u64,
    /// Uncompressed length of the partition.
    pub raw_length: u64,
    /// Stored (compressed) length of the partition.
    pub part_length: u64,
}

/// Bytes per index record: three little-endian u64 values.
const RECORD_SIZE: usize = 24;

/// Index mapping reduce partition ids to their ranges in a map output
/// file.
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    records: Vec<IndexRecord>,
}

impl PartitionIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index from existing records, ordered by reduce id.
    pub fn from_records(records: Vec<IndexRecord>) -> Self {
        Self { records }
    }

    /// Appends the record for the next reduce partition.
    pub fn push(&mut self, record: IndexRecord) {
        self.records.push(record);
    }

    /// Number of reduce partitions in this index.
    pub fn partition_count(&self) -> usize {
        self.records.len()
    }

    /// The record for a reduce partition, or `None` if out of range.
    pub fn record(&self, reduce_id: usize) -> Option<&IndexRecord> {
        self.records.get(reduce_id)
    }

    /// Writes the index to a file.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(ShuffleError::IoError)?;
        let mut writer = BufWriter::new(file);

        for record in &self.records {
            writer
                .write_all(&record.start_offset.to_le_bytes())
                .map_err(ShuffleError::IoError)?;
            writer
                .write_all(&record.raw_length.to_le_bytes())
                .map_err(ShuffleError::IoError)?;
            writer
                .write_all(&record.part_length.to_le_bytes())
                .map_err(ShuffleError::IoError)?;
        }

        writer.flush().map_err(ShuffleError::IoError)?;
        Ok(())
    }

    /// Reads an index from a file.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(ShuffleError::IoError)?;
        let metadata = file.metadata().map_err(ShuffleError::IoError)?;
        let file_size = metadata.len() as usize;

        if file_size % RECORD_SIZE != 0 {
            return Err(ShuffleError::General(format!(
                "Invalid index file size: {file_size} (must be multiple of {RECORD_SIZE})"
            )));
        }

        let mut reader = BufReader::new(file);
        let mut records = Vec::with_capacity(file_size / RECORD_SIZE);
        let mut buf = [0u8; 8];

        for _ in 0..file_size / RECORD_SIZE {
            let mut fields = [0u64; 3];
            for field in &mut fields {
                reader.read_exact(&mut buf).map_err(ShuffleError::IoError)?;
                *field = u64::from_le_bytes(buf);
            }
            records.push(IndexRecord {
                start_offset: fields[0],
                raw_length: fields[1],
                part_length: fields[2],
            });
        }

        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_push_and_lookup() {
        let mut index = PartitionIndex::new();
        index.push(IndexRecord {
            start_offset: 0,
            raw_length: 200,
            part_length: 120,
        });
        index.push(IndexRecord {
            start_offset: 120,
            raw_length: 60,
            part_length: 60,
        });

        assert_eq!(index.partition_count(), 2);
        assert_eq!(index.record(1).unwrap().start_offset, 120);
        assert!(index.record(2).is_none());
    }

    #[test]
    fn test_write_and_read() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let index_path = temp_dir.path().join("file.out.index");

        let index = PartitionIndex::from_records(vec![
            IndexRecord {
                start_offset: 0,
                raw_length: 100,
                part_length: 80,
            },
            IndexRecord {
                start_offset: 80,
                raw_length: 300,
                part_length: 250,
            },
        ]);
        index.write_to_file(&index_path)?;

        let loaded = PartitionIndex::read_from_file(&index_path)?;
        assert_eq!(loaded.partition_count(), 2);
        assert_eq!(
            loaded.record(0),
            Some(&IndexRecord {
                start_offset: 0,
                raw_length: 100,
                part_length: 80,
            })
        );
        assert_eq!(loaded.record(1).unwrap().part_length, 250);

        Ok(())
    }

    #[test]
    fn test_read_rejects_torn_file() {
        let temp_dir = TempDir::new().unwrap();
        let index_path = temp_dir.path().join("torn.index");
        std::fs::write(&index_path, [0u8; 25]).unwrap();

        assert!(PartitionIndex::read_from_file(&index_path).is_err());
    }
}
