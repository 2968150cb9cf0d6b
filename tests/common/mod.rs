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

    tests/common/mod.rs

    Common support routines for tests

*/
#![allow(dead_code)]

use fluxtape::{
    fec::{inject_byte_errors, CHUNK_LEN},
    prelude::*,
};

use hex::encode;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha1::{Digest, Sha1};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compute_slice_hash(slice: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(slice);
    let result = hasher.finalize();

    encode(result)
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A reproducible pseudo-random payload.
pub fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seeded_rng(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Corrupt `count` bytes in every chunk of a staged sector.
pub fn corrupt_chunks(staged: &mut [u8], count: usize, rng: &mut StdRng) {
    for chunk in staged.chunks_exact_mut(CHUNK_LEN) {
        inject_byte_errors(chunk, count, rng);
    }
}

/// Record `data` onto a simulated tape with the given impairments.
pub fn record_stream(session: &mut ChannelSession, data: &[u8], impairments: Impairments) -> TapeImage {
    let mut recorder = TapeRecorder::new(session.config())
        .with_impairments(impairments)
        .unwrap();
    session.write_stream(&mut recorder, data, "test").unwrap();
    recorder.finish()
}
