//! Binary records for chunks and blocks.
//!
//! Every record starts with one header byte naming its compression,
//! followed by a MessagePack payload.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::CompressionConfig;
use crate::error::{StoreError, StoreResult};

/// Compression of a stored record.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    #[default]
    None = 0,
    Gzip = 1,
}

impl TryFrom<u8> for CompressionType {
    type Error = StoreError;

    fn try_from(v: u8) -> StoreResult<Self> {
        match v {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Gzip),
            other => Err(StoreError::Serialization(format!(
                "unknown compression header {other}"
            ))),
        }
    }
}

/// A persisted chunk: identifiers plus packed membership bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: usize,
    pub ids: Vec<String>,
    pub rows: usize,
    pub cols: usize,
    /// Row-major presence bits, eight per byte, least significant first.
    pub bits: Vec<u8>,
}

impl ChunkRecord {
    /// Pack `matrix`; any non-zero entry counts as present.
    pub fn pack(index: usize, ids: Vec<String>, matrix: ArrayView2<f32>) -> Self {
        let (rows, cols) = matrix.dim();
        let mut bits = vec![0u8; (rows * cols).div_ceil(8)];
        for (pos, &v) in matrix.iter().enumerate() {
            if v != 0.0 {
                bits[pos / 8] |= 1 << (pos % 8);
            }
        }
        Self {
            index,
            ids,
            rows,
            cols,
            bits,
        }
    }

    /// Unpack into a 0/1 matrix.
    pub fn matrix(&self) -> StoreResult<Array2<f32>> {
        let n = self.rows * self.cols;
        if self.bits.len() != n.div_ceil(8) {
            return Err(StoreError::Serialization(format!(
                "chunk {}: {} bit bytes for {}x{}",
                self.index,
                self.bits.len(),
                self.rows,
                self.cols
            )));
        }
        let values: Vec<f32> = (0..n)
            .map(|pos| {
                if self.bits[pos / 8] & (1 << (pos % 8)) != 0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Array2::from_shape_vec((self.rows, self.cols), values).map_err(StoreError::serialization)
    }
}

/// A persisted similarity block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f32>,
}

impl BlockRecord {
    pub fn from_matrix(matrix: ArrayView2<f32>) -> Self {
        let (rows, cols) = matrix.dim();
        Self {
            rows,
            cols,
            values: matrix.iter().copied().collect(),
        }
    }

    pub fn into_matrix(self) -> StoreResult<Array2<f32>> {
        Array2::from_shape_vec((self.rows, self.cols), self.values).map_err(StoreError::serialization)
    }
}

/// Serialize `record` and frame it with a compression header.
pub fn encode<T: Serialize>(record: &T, compression: CompressionConfig) -> StoreResult<Vec<u8>> {
    let payload = rmp_serde::to_vec(record).map_err(StoreError::serialization)?;
    if !compression.enabled {
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.push(CompressionType::None as u8);
        out.extend_from_slice(&payload);
        return Ok(out);
    }

    let mut out = vec![CompressionType::Gzip as u8];
    let mut encoder = GzEncoder::new(&mut out, Compression::new(compression.level.min(9)));
    encoder.write_all(&payload)?;
    encoder.finish()?;
    Ok(out)
}

/// Inverse of [`encode`].
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> StoreResult<T> {
    let (&header, body) = data
        .split_first()
        .ok_or_else(|| StoreError::Serialization("empty record".to_string()))?;
    match CompressionType::try_from(header)? {
        CompressionType::None => rmp_serde::from_slice(body).map_err(StoreError::serialization),
        CompressionType::Gzip => {
            let mut payload = Vec::new();
            GzDecoder::new(body).read_to_end(&mut payload)?;
            rmp_serde::from_slice(&payload).map_err(StoreError::serialization)
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn chunk_bits_read_back_as_ones() {
        let m = array![[1.0, 0.0, 2.5], [0.0, 0.0, 0.0], [0.0, 1.0, 1.0]];
        let rec = ChunkRecord::pack(3, vec!["a".into(), "b".into(), "c".into()], m.view());
        assert_eq!(rec.bits.len(), 2);
        assert_eq!(
            rec.matrix().unwrap(),
            array![[1.0, 0.0, 1.0], [0.0, 0.0, 0.0], [0.0, 1.0, 1.0]]
        );
    }

    #[test]
    fn compressed_and_raw_records_decode_alike() {
        let block = BlockRecord::from_matrix(array![[1.0, 0.25], [0.25, 1.0]].view());
        let raw = encode(&block, CompressionConfig { enabled: false, level: 0 }).unwrap();
        let gz = encode(&block, CompressionConfig::default()).unwrap();
        assert_eq!(raw[0], CompressionType::None as u8);
        assert_eq!(gz[0], CompressionType::Gzip as u8);

        let a: BlockRecord = decode(&raw).unwrap();
        let b: BlockRecord = decode(&gz).unwrap();
        assert_eq!(a, block);
        assert_eq!(b, block);
    }

    #[test]
    fn compression_shrinks_sparse_chunks() {
        let m = Array2::<f32>::zeros((200, 300));
        let rec = ChunkRecord::pack(0, vec![String::new(); 200], m.view());
        let raw = encode(&rec, CompressionConfig { enabled: false, level: 0 }).unwrap();
        let gz = encode(&rec, CompressionConfig::default()).unwrap();
        assert!(gz.len() < raw.len() / 4, "gz {} raw {}", gz.len(), raw.len());
    }

    #[test]
    fn rejects_unknown_header_and_empty_input() {
        assert!(matches!(decode::<BlockRecord>(&[7, 1, 2]), Err(StoreError::Serialization(_))));
        assert!(matches!(decode::<BlockRecord>(&[]), Err(StoreError::Serialization(_))));
    }
}
