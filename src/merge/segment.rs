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

//! Sorted-run segment capability.
//!
//! A segment is one sorted run of key/value records from a single source,
//! consumed incrementally. Sources may be fully resident in staging
//! memory or still arriving over the network, which is why advancing the
//! cursor has a three-way outcome.

use bytes::{BufMut, Bytes, BytesMut};

/// Outcome of advancing a segment's cursor by one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAdvance {
    /// The run has no more records.
    Exhausted,
    /// The cursor now rests on a valid record.
    HasNext,
    /// The next record is not yet available, e.g. the source is waiting
    /// on more network data.
    Interrupted,
}

/// One sorted run consumed incrementally by the merge iterator.
///
/// After [`Segment::advance`] returns [`SegmentAdvance::HasNext`], the
/// record accessors view the current record until the next `advance`.
/// Their content before the first successful advance is unspecified.
pub trait Segment {
    /// Moves the cursor to the next record.
    fn advance(&mut self) -> SegmentAdvance;

    /// Asks the segment to switch its buffering strategy after an
    /// [`SegmentAdvance::Interrupted`] outcome.
    ///
    /// Returns true if the pending record became available under the new
    /// strategy; false means this source can never produce it, and the
    /// caller drops the segment.
    fn switch_buffering(&mut self) -> bool;

    /// The current record's key.
    fn key(&self) -> &[u8];

    /// The current record's value.
    fn value(&self) -> &[u8];

    /// Logical length of the current key in bytes.
    fn key_len(&self) -> usize {
        self.key().len()
    }

    /// Logical length of the current value in bytes.
    fn value_len(&self) -> usize {
        self.value().len()
    }

    /// Raw bytes consumed from the source for the current key, including
    /// any length headers.
    fn key_bytes(&self) -> usize;

    /// Raw bytes consumed from the source for the current value,
    /// including any length headers.
    fn value_bytes(&self) -> usize;

    /// Identifier of the task this run belongs to, for diagnostics.
    fn task_id(&self) -> &str;
}

/// Length header per record field: u32 little-endian.
const LEN_HEADER: usize = 4;

/// Encodes key/value pairs into the staged run layout consumed by
/// [`MemorySegment`]: per record, a u32 LE key length, a u32 LE value
/// length, the key bytes, then the value bytes.
pub fn encode_records<'a, I>(records: I) -> Bytes
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut buf = BytesMut::new();
    for (key, value) in records {
        buf.put_u32_le(key.len() as u32);
        buf.put_u32_le(value.len() as u32);
        buf.put_slice(key);
        buf.put_slice(value);
    }
    buf.freeze()
}

/// A segment over one fully staged sorted run.
///
/// This is the segment a reducer uses once a map-output partition has
/// been fetched into local staging memory. A truncated trailing record
/// reports [`SegmentAdvance::Interrupted`]; since the whole run is
/// already resident there is no other buffering strategy to switch to,
/// so `switch_buffering` returns false and the merge drops the segment.
pub struct MemorySegment {
    task_id: String,
    data: Bytes,
    pos: usize,
    key: Bytes,
    value: Bytes,
}

impl MemorySegment {
    /// Creates a segment over an encoded run (see [`encode_records`]).
    pub fn new(task_id: impl Into<String>, data: Bytes) -> Self {
        Self {
            task_id: task_id.into(),
            data,
            pos: 0,
            key: Bytes::new(),
            value: Bytes::new(),
        }
    }

    /// Convenience constructor encoding `records` in run layout.
    pub fn from_records(task_id: impl Into<String>, records: &[(&[u8], &[u8])]) -> Self {
        Self::new(task_id, encode_records(records.iter().copied()))
    }
}

impl Segment for MemorySegment {
    fn advance(&mut self) -> SegmentAdvance {
        if self.pos == self.data.len() {
            return SegmentAdvance::Exhausted;
        }
        if self.pos + 2 * LEN_HEADER > self.data.len() {
            return SegmentAdvance::Interrupted;
        }
        let header = &self.data[self.pos..];
        let key_len =
            u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let value_len =
            u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let key_start = self.pos + 2 * LEN_HEADER;
        let value_start = key_start + key_len;
        let record_end = value_start + value_len;
        if record_end > self.data.len() {
            return SegmentAdvance::Interrupted;
        }
        self.key = self.data.slice(key_start..value_start);
        self.value = self.data.slice(value_start..record_end);
        self.pos = record_end;
        SegmentAdvance::HasNext
    }

    fn switch_buffering(&mut self) -> bool {
        // Fully resident: nothing further will arrive.
        false
    }

    fn key(&self) -> &[u8] {
        &self.key
    }

    fn value(&self) -> &[u8] {
        &self.value
    }

    fn key_bytes(&self) -> usize {
        LEN_HEADER + self.key.len()
    }

    fn value_bytes(&self) -> usize {
        LEN_HEADER + self.value.len()
    }

    fn task_id(&self) -> &str {
        &self.task_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_over_records() {
        let mut segment = MemorySegment::from_records(
            "map_0",
            &[(b"apple", b"1"), (b"berry", b"22")],
        );

        assert_eq!(segment.advance(), SegmentAdvance::HasNext);
        assert_eq!(segment.key(), b"apple");
        assert_eq!(segment.value(), b"1");
        assert_eq!(segment.key_len(), 5);
        assert_eq!(segment.value_len(), 1);
        assert_eq!(segment.key_bytes(), 9);
        assert_eq!(segment.value_bytes(), 5);

        assert_eq!(segment.advance(), SegmentAdvance::HasNext);
        assert_eq!(segment.key(), b"berry");
        assert_eq!(segment.value(), b"22");

        assert_eq!(segment.advance(), SegmentAdvance::Exhausted);
    }

    #[test]
    fn test_empty_run_is_exhausted() {
        let mut segment = MemorySegment::new("map_1", Bytes::new());
        assert_eq!(segment.advance(), SegmentAdvance::Exhausted);
    }

    #[test]
    fn test_truncated_record_interrupts() {
        let encoded = encode_records([(b"key".as_slice(), b"value".as_slice())]);
        // Drop the last two bytes of the value.
        let truncated = encoded.slice(..encoded.len() - 2);
        let mut segment = MemorySegment::new("map_2", truncated);

        assert_eq!(segment.advance(), SegmentAdvance::Interrupted);
        assert!(!segment.switch_buffering());
    }

    #[test]
    fn test_truncated_header_interrupts() {
        let mut segment = MemorySegment::new("map_3", Bytes::from_static(&[7, 0, 0]));
        assert_eq!(segment.advance(), SegmentAdvance::Interrupted);
    }

    #[test]
    fn test_task_id() {
        let segment = MemorySegment::new("attempt_001_m_04", Bytes::new());
        assert_eq!(segment.task_id(), "attempt_001_m_04");
    }
}
