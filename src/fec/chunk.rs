/*
    FluxTape

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/fec/chunk.rs

    Chunk codec: CRC16 stamped payload protected by RS(255, 223) parity.

*/

//! Chunk layout, offsets in bytes:
//!
//! | offset | size | field                            |
//! |--------|------|----------------------------------|
//! | 0      | 221  | payload                          |
//! | 221    | 2    | CRC16/MODBUS of payload, LE      |
//! | 223    | 32   | Reed-Solomon parity              |

use super::{
    crc::crc16_modbus,
    reed_solomon::{ReedSolomon, RS_BLOCK_LEN, RS_MESSAGE_LEN},
};

pub const CHUNK_LEN: usize = RS_BLOCK_LEN;
pub const CHUNK_PAYLOAD_LEN: usize = RS_MESSAGE_LEN - 2;
pub const CHUNK_CRC_OFFSET: usize = CHUNK_PAYLOAD_LEN;

/// The outcome of decoding one chunk.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChunkStatus {
    /// The chunk was received without errors.
    #[default]
    Clean,
    /// The chunk was repaired. Holds the number of corrected bytes.
    Corrected(u32),
    /// The chunk had more errors than the code can correct. The payload holds the raw bytes.
    Unrecoverable,
    /// Error correction succeeded but the payload failed its CRC. Holds the number of bytes
    /// the decoder changed.
    CrcMismatch(u32),
}

impl ChunkStatus {
    /// Returns true if the payload is verified.
    pub fn is_ok(&self) -> bool {
        matches!(self, ChunkStatus::Clean | ChunkStatus::Corrected(_))
    }

    /// Number of bytes repaired in a verified chunk.
    pub fn corrected(&self) -> u32 {
        match self {
            ChunkStatus::Corrected(n) => *n,
            _ => 0,
        }
    }
}

/// Encodes and decodes chunks. Holds the Reed-Solomon tables, so build one and reuse it.
#[derive(Clone, Debug, Default)]
pub struct ChunkCodec {
    rs: ReedSolomon,
}

impl ChunkCodec {
    pub fn new() -> Self {
        Self { rs: ReedSolomon::new() }
    }

    /// Build a chunk from `payload` into `block`.
    ///
    /// `payload` may be shorter than [CHUNK_PAYLOAD_LEN]; the remainder is zero filled.
    pub fn encode(&self, payload: &[u8], block: &mut [u8; CHUNK_LEN]) {
        assert!(payload.len() <= CHUNK_PAYLOAD_LEN);

        block[..payload.len()].copy_from_slice(payload);
        block[payload.len()..CHUNK_PAYLOAD_LEN].fill(0);
        let crc = crc16_modbus(&block[..CHUNK_PAYLOAD_LEN]);
        block[CHUNK_CRC_OFFSET..RS_MESSAGE_LEN].copy_from_slice(&crc.to_le_bytes());

        self.rs.encode(block);
    }

    /// Decode the chunk in `block`, writing the payload into `payload`.
    ///
    /// An unrecoverable chunk still has its raw, uncorrected payload copied out, so the caller
    /// always sees what was on tape. The CRC is checked after every successful decode.
    pub fn decode(&self, block: &[u8], payload: &mut [u8]) -> ChunkStatus {
        assert_eq!(block.len(), CHUNK_LEN);
        assert_eq!(payload.len(), CHUNK_PAYLOAD_LEN);

        let mut work = [0u8; CHUNK_LEN];
        work.copy_from_slice(block);

        match self.rs.decode(&mut work) {
            Ok(corrected) => {
                payload.copy_from_slice(&work[..CHUNK_PAYLOAD_LEN]);
                if Self::crc_ok(&work) {
                    match corrected {
                        0 => ChunkStatus::Clean,
                        n => ChunkStatus::Corrected(n as u32),
                    }
                }
                else {
                    log::warn!("ChunkCodec::decode(): CRC mismatch after correcting {} bytes", corrected);
                    ChunkStatus::CrcMismatch(corrected as u32)
                }
            }
            Err(e) => {
                payload.copy_from_slice(&block[..CHUNK_PAYLOAD_LEN]);
                log::debug!(
                    "ChunkCodec::decode(): {}; raw CRC {}",
                    e,
                    if Self::crc_ok(block) { "matches" } else { "fails" }
                );
                ChunkStatus::Unrecoverable
            }
        }
    }

    fn crc_ok(block: &[u8]) -> bool {
        let recorded = u16::from_le_bytes([block[CHUNK_CRC_OFFSET], block[CHUNK_CRC_OFFSET + 1]]);
        recorded == crc16_modbus(&block[..CHUNK_PAYLOAD_LEN])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "rand")]
    use crate::fec::inject_byte_errors;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn chunk_layout() {
        let codec = ChunkCodec::new();
        let mut block = [0xEEu8; CHUNK_LEN];
        codec.encode(b"HELLO", &mut block);

        assert_eq!(&block[..5], b"HELLO");
        assert!(block[5..CHUNK_PAYLOAD_LEN].iter().all(|&b| b == 0));
        let crc = crc16_modbus(&block[..CHUNK_PAYLOAD_LEN]);
        assert_eq!(&block[CHUNK_CRC_OFFSET..CHUNK_CRC_OFFSET + 2], &crc.to_le_bytes());

        let mut payload = [0u8; CHUNK_PAYLOAD_LEN];
        assert_eq!(codec.decode(&block, &mut payload), ChunkStatus::Clean);
        assert_eq!(&payload[..5], b"HELLO");
    }

    #[test]
    fn raw_bytes_pass_through_when_unrecoverable() {
        let codec = ChunkCodec::new();
        let mut block = [0u8; CHUNK_LEN];
        codec.encode(&[0x5A; CHUNK_PAYLOAD_LEN], &mut block);
        for b in block[..40].iter_mut() {
            *b = 0xFF;
        }

        let mut payload = [0u8; CHUNK_PAYLOAD_LEN];
        assert_eq!(codec.decode(&block, &mut payload), ChunkStatus::Unrecoverable);
        assert_eq!(&payload[..], &block[..CHUNK_PAYLOAD_LEN]);
    }

    #[test]
    #[cfg(feature = "rand")]
    fn random_fault_injection_never_passes_bad_data() {
        let codec = ChunkCodec::new();
        let mut rng = StdRng::seed_from_u64(0xFA01_7001);

        for trial in 0..300 {
            let original: Vec<u8> = (0..CHUNK_PAYLOAD_LEN).map(|_| rng.gen()).collect();
            let mut block = [0u8; CHUNK_LEN];
            codec.encode(&original, &mut block);

            let n_errors = trial % 33;
            inject_byte_errors(&mut block, n_errors, &mut rng);

            let mut payload = [0u8; CHUNK_PAYLOAD_LEN];
            let status = codec.decode(&block, &mut payload);
            if n_errors <= 16 {
                assert_eq!(status.corrected(), n_errors as u32);
                assert!(status.is_ok());
            }
            if status.is_ok() {
                assert_eq!(payload.to_vec(), original, "trial {} reported success on bad data", trial);
            }
        }
    }
}
