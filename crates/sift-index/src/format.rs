//! Binary artifact formats.
//!
//! # File Structure
//!
//! ```text
//! Offset   Size    Type        Description
//! ─────────────────────────────────────────────
//! 0x00     8       [u8; 8]     Magic: "SIFTIDX2" or "SIFTMAT1"
//! 0x08     8       u64 LE      N: number of vectors
//! 0x10     4       u32 LE      D: dimensions
//! 0x14     4       u32 LE      CRC-32 of the payload
//! 0x18     ...                 Payload
//! ```
//!
//! Index payload: the catalog snapshot fingerprint (u32 LE), then `N` row
//! ids (u64 LE), then `N*D` vector components (f32 LE). Matrix payload:
//! `N*D` components only.
//!
//! Version 1 index files carried no snapshot and are rejected as corrupt.
//! Rebuilding writes the current version.
//!
//! Floats are stored by bit pattern, so a decode of an encode is exact.

use std::collections::HashSet;
use std::path::Path;

use sift_core::RowId;

use crate::error::{IndexError, IndexResult};
use crate::index::{Index, Matrix};

/// Magic bytes identifying an index file.
pub const INDEX_MAGIC: [u8; 8] = *b"SIFTIDX2";

/// Magic bytes identifying a raw embedding matrix file.
pub const MATRIX_MAGIC: [u8; 8] = *b"SIFTMAT1";

/// Header size in bytes: 8 (magic) + 8 (count) + 4 (dims) + 4 (crc) = 24
pub const HEADER_SIZE: usize = 24;

const SNAPSHOT_SIZE: usize = std::mem::size_of::<u32>();
const ROW_ID_SIZE: usize = std::mem::size_of::<u64>();
const COMPONENT_SIZE: usize = std::mem::size_of::<f32>();

/// Parsed artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub count: u64,
    pub dimension: u32,
    pub checksum: u32,
}

impl Header {
    /// Parse the first [`HEADER_SIZE`] bytes of an artifact.
    pub fn from_bytes(bytes: &[u8], path: &Path) -> IndexResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(IndexError::corrupt(
                path,
                format!("{} bytes is too small for a header", bytes.len()),
            ));
        }

        Ok(Self {
            magic: le_array(bytes, 0),
            count: u64::from_le_bytes(le_array(bytes, 8)),
            dimension: u32::from_le_bytes(le_array(bytes, 16)),
            checksum: u32::from_le_bytes(le_array(bytes, 20)),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..8].copy_from_slice(&self.magic);
        buf[8..16].copy_from_slice(&self.count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.dimension.to_le_bytes());
        buf[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    fn expect_magic(&self, magic: [u8; 8], path: &Path) -> IndexResult<()> {
        if self.magic == magic {
            Ok(())
        } else {
            Err(IndexError::corrupt(
                path,
                format!(
                    "invalid magic bytes: expected {}",
                    String::from_utf8_lossy(&magic)
                ),
            ))
        }
    }

    /// `(count, dimension)` as sizes, rejecting vectors with no components.
    fn shape(&self, path: &Path) -> IndexResult<(usize, usize)> {
        let count = usize::try_from(self.count)
            .map_err(|_| IndexError::corrupt(path, format!("vector count {} overflows", self.count)))?;
        let dimension = self.dimension as usize;
        if count > 0 && dimension == 0 {
            return Err(IndexError::corrupt(
                path,
                format!("{count} vectors declared with zero dimensions"),
            ));
        }
        Ok((count, dimension))
    }
}

/// Serialize an index.
#[must_use]
pub fn encode_index(index: &Index) -> Vec<u8> {
    let mut payload = Vec::with_capacity(
        SNAPSHOT_SIZE + index.len() * ROW_ID_SIZE + index.as_flat().len() * COMPONENT_SIZE,
    );
    payload.extend_from_slice(&index.snapshot().to_le_bytes());
    for row_id in index.row_ids() {
        payload.extend_from_slice(&row_id.get().to_le_bytes());
    }
    write_components(&mut payload, index.as_flat());

    with_header(INDEX_MAGIC, index.len(), index.dimension(), payload)
}

/// Deserialize and validate an index. `path` is only used in error reports.
pub fn decode_index(bytes: &[u8], path: &Path) -> IndexResult<Index> {
    let header = Header::from_bytes(bytes, path)?;
    header.expect_magic(INDEX_MAGIC, path)?;
    let (count, dimension) = header.shape(path)?;
    let payload = &bytes[HEADER_SIZE..];

    let ids_len = count.checked_mul(ROW_ID_SIZE);
    let data_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(COMPONENT_SIZE));
    let expected = ids_len
        .zip(data_len)
        .and_then(|(ids, data)| ids.checked_add(data))
        .and_then(|n| n.checked_add(SNAPSHOT_SIZE));
    check_payload(&header, payload, expected, path)?;

    let snapshot = u32::from_le_bytes(le_array(payload, 0));
    let payload = &payload[SNAPSHOT_SIZE..];
    let ids_len = count * ROW_ID_SIZE;
    let mut seen = HashSet::with_capacity(count);
    let mut row_ids = Vec::with_capacity(count);
    for chunk in payload[..ids_len].chunks_exact(ROW_ID_SIZE) {
        let row_id = RowId::new(u64::from_le_bytes(le_array(chunk, 0)));
        if !seen.insert(row_id) {
            return Err(IndexError::corrupt(path, format!("duplicate row id {row_id}")));
        }
        row_ids.push(row_id);
    }
    let data = read_components(&payload[ids_len..]);

    Ok(Index::from_raw_parts(dimension, snapshot, row_ids, data))
}

/// Serialize a raw embedding matrix.
#[must_use]
pub fn encode_matrix(matrix: &Matrix) -> Vec<u8> {
    let mut payload = Vec::with_capacity(matrix.as_flat().len() * COMPONENT_SIZE);
    write_components(&mut payload, matrix.as_flat());

    with_header(MATRIX_MAGIC, matrix.rows(), matrix.dimension(), payload)
}

/// Deserialize and validate a raw embedding matrix.
pub fn decode_matrix(bytes: &[u8], path: &Path) -> IndexResult<Matrix> {
    let header = Header::from_bytes(bytes, path)?;
    header.expect_magic(MATRIX_MAGIC, path)?;
    let (rows, dimension) = header.shape(path)?;
    let payload = &bytes[HEADER_SIZE..];

    let expected = rows
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(COMPONENT_SIZE));
    check_payload(&header, payload, expected, path)?;

    Ok(Matrix::from_raw_parts(
        rows,
        dimension,
        read_components(payload),
    ))
}

fn with_header(magic: [u8; 8], count: usize, dimension: usize, payload: Vec<u8>) -> Vec<u8> {
    let header = Header {
        magic,
        count: count as u64,
        dimension: dimension as u32,
        checksum: crc32fast::hash(&payload),
    };

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend(payload);
    bytes
}

/// The payload must be exactly as long as the header implies and match its
/// checksum.
fn check_payload(
    header: &Header,
    payload: &[u8],
    expected_len: Option<usize>,
    path: &Path,
) -> IndexResult<()> {
    let Some(expected_len) = expected_len else {
        return Err(IndexError::corrupt(
            path,
            format!(
                "header declares {} vectors of {} dimensions, which overflows",
                header.count, header.dimension
            ),
        ));
    };
    if payload.len() != expected_len {
        return Err(IndexError::corrupt(
            path,
            format!(
                "header declares {} vectors of {} dimensions ({} payload bytes) but found {} bytes",
                header.count,
                header.dimension,
                expected_len,
                payload.len()
            ),
        ));
    }
    let actual = crc32fast::hash(payload);
    if actual != header.checksum {
        return Err(IndexError::corrupt(
            path,
            format!(
                "payload checksum {actual:08x} does not match header checksum {:08x}",
                header.checksum
            ),
        ));
    }
    Ok(())
}

fn write_components(buf: &mut Vec<u8>, components: &[f32]) {
    for &val in components {
        buf.extend_from_slice(&val.to_le_bytes());
    }
}

fn read_components(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(COMPONENT_SIZE)
        .map(|chunk| f32::from_le_bytes(le_array(chunk, 0)))
        .collect()
}

/// Copy `N` bytes starting at `offset`. Callers check bounds first.
fn le_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    std::array::from_fn(|i| bytes[offset + i])
}
