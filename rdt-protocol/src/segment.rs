//! File segmentation
//!
//! Slices an input stream into offset-stamped data segments before any
//! network I/O happens. The resulting table is immutable for the lifetime
//! of a transfer: the send window resolves cumulative acknowledgments to
//! table indices, so offsets must form a contiguous partition of the file.

use crate::packet::{DataSegment, MAX_PAYLOAD_SIZE};
use bytes::Bytes;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Segmentation errors
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid segment size {0} (must be 1..={MAX_PAYLOAD_SIZE})")]
    InvalidSegmentSize(usize),

    #[error("Source of {0} bytes exceeds the 32-bit offset space")]
    SourceTooLarge(u64),
}

/// The complete, ordered segment table for one transfer
///
/// Covers the byte range `[0, size)` in `segment_size` chunks, terminated
/// by exactly one zero-length end-of-stream sentinel at offset `size`.
/// Consecutive entries always satisfy `seqno + len == next seqno`.
#[derive(Debug)]
pub struct SegmentTable {
    segments: Vec<DataSegment>,
    segment_size: usize,
    stream_end: u32,
}

impl SegmentTable {
    /// Segment a file on disk
    pub fn from_file<P: AsRef<Path>>(path: P, segment_size: usize) -> Result<Self, SegmentError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), segment_size)
    }

    /// Segment an arbitrary byte source
    ///
    /// Reads the source to exhaustion; a short read mid-stream surfaces as
    /// the underlying I/O error.
    pub fn from_reader<R: Read>(mut reader: R, segment_size: usize) -> Result<Self, SegmentError> {
        if segment_size == 0 || segment_size > MAX_PAYLOAD_SIZE {
            return Err(SegmentError::InvalidSegmentSize(segment_size));
        }

        let mut segments = Vec::new();
        let mut offset: u64 = 0;
        let mut chunk = vec![0u8; segment_size];

        loop {
            let len = read_chunk(&mut reader, &mut chunk)?;
            if len == 0 {
                break;
            }

            let seqno = u32::try_from(offset)
                .map_err(|_| SegmentError::SourceTooLarge(offset + len as u64))?;
            segments.push(DataSegment::new(seqno, Bytes::copy_from_slice(&chunk[..len])));
            offset += len as u64;
        }

        let stream_end =
            u32::try_from(offset).map_err(|_| SegmentError::SourceTooLarge(offset))?;
        segments.push(DataSegment::sentinel(stream_end));

        tracing::debug!(
            segments = segments.len(),
            bytes = stream_end,
            "segmented input stream"
        );

        Ok(SegmentTable {
            segments,
            segment_size,
            stream_end,
        })
    }

    /// Total number of segments, sentinel included
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// A table always holds at least the sentinel
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at table index `idx`
    pub fn get(&self, idx: usize) -> Option<&DataSegment> {
        self.segments.get(idx)
    }

    /// Slice of segments in index range `[start, end)`
    pub fn range(&self, start: usize, end: usize) -> &[DataSegment] {
        &self.segments[start..end]
    }

    /// Chunk size used to build this table
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Size of the underlying byte stream; also the sentinel's offset
    pub fn stream_end(&self) -> u32 {
        self.stream_end
    }

    /// Map a byte offset to the index of the segment that starts at it
    ///
    /// Cumulative ACK values always name a segment boundary, so a lookup
    /// miss means the peer acknowledged an offset this table never
    /// produced.
    pub fn index_of_offset(&self, offset: u32) -> Option<usize> {
        let idx = self.segments.partition_point(|seg| seg.seqno() < offset);
        match self.segments.get(idx) {
            Some(seg) if seg.seqno() == offset => Some(idx),
            _ => None,
        }
    }

    /// Iterate over all segments in stream order
    pub fn iter(&self) -> impl Iterator<Item = &DataSegment> {
        self.segments.iter()
    }
}

/// Fill `chunk` from the reader, tolerating short reads, until the chunk
/// is full or the source is exhausted. Returns the number of bytes read.
fn read_chunk<R: Read>(reader: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        match reader.read(&mut chunk[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
