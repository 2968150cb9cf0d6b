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

    src/fec/mod.rs

    Forward error correction: CRC16 stamping and Reed-Solomon protected chunks.

*/

pub mod chunk;
pub mod crc;
pub mod reed_solomon;

pub use chunk::{ChunkCodec, ChunkStatus, CHUNK_LEN, CHUNK_PAYLOAD_LEN};
pub use crc::{crc16_modbus, Crc16Hasher};
pub use reed_solomon::{ReedSolomon, RsError, RS_MAX_CORRECTIONS};

/// Corrupt `count` distinct, randomly chosen bytes of `buf`, each with a non-zero random xor mask.
/// Used to exercise the error correction path.
#[cfg(feature = "rand")]
pub fn inject_byte_errors<R: rand::Rng + ?Sized>(buf: &mut [u8], count: usize, rng: &mut R) {
    let count = count.min(buf.len());
    for pos in rand::seq::index::sample(rng, buf.len(), count).into_iter() {
        buf[pos] ^= rng.gen_range(1..=255u8);
    }
}
