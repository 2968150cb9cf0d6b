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

    src/fec/reed_solomon.rs

    Reed-Solomon RS(255, 223) codec over GF(2^8).

*/

//! Systematic Reed-Solomon encoder and decoder with 32 parity bytes, correcting up to 16 byte
//! errors per 255 byte block.
//!
//! The field is generated by the primitive polynomial x^8 + x^7 + x^2 + x + 1 (0x187) and the
//! generator polynomial has the consecutive roots alpha^1 through alpha^32. This is the
//! conventional (non dual-basis) form of the CCSDS code.
//!
//! Decoding uses Berlekamp-Massey to find the error locator, a Chien search for the error
//! positions and Forney's algorithm for the error values. Decoding never allocates; all
//! polynomials live in fixed size arrays.

use thiserror::Error;

pub const RS_BLOCK_LEN: usize = 255;
pub const RS_PARITY_LEN: usize = 32;
pub const RS_MESSAGE_LEN: usize = RS_BLOCK_LEN - RS_PARITY_LEN;
/// Maximum number of byte errors that can be corrected in one block.
pub const RS_MAX_CORRECTIONS: usize = RS_PARITY_LEN / 2;

const PRIM_POLY: u16 = 0x187;
/// First consecutive root of the generator polynomial.
const FCR: usize = 1;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RsError {
    #[error("Invalid block length: {0}")]
    InvalidLength(usize),
    #[error("Too many errors to correct")]
    TooManyErrors,
}

/// GF(2^8) arithmetic tables.
#[derive(Clone)]
struct GfTables {
    // exp[i] = alpha^i, doubled to avoid a modulo on multiplication
    exp: [u8; 512],
    log: [u8; 256],
}

impl GfTables {
    fn new() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];

        let mut x: u16 = 1;
        for i in 0..255 {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIM_POLY;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }

        Self { exp, log }
    }

    #[inline]
    fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp[self.log[a as usize] as usize + self.log[b as usize] as usize]
    }

    /// Divide `a` by `b`. `b` must not be zero.
    #[inline]
    fn div(&self, a: u8, b: u8) -> u8 {
        if a == 0 {
            return 0;
        }
        self.exp[(self.log[a as usize] as usize + 255 - self.log[b as usize] as usize) % 255]
    }

    #[inline]
    fn alpha_pow(&self, p: usize) -> u8 {
        self.exp[p % 255]
    }

    /// Evaluate a polynomial stored lowest degree first.
    fn eval_ascending(&self, poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| self.mul(acc, x) ^ c)
    }
}

impl std::fmt::Debug for GfTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GfTables").finish()
    }
}

#[derive(Clone, Debug)]
pub struct ReedSolomon {
    gf: GfTables,
    /// Generator polynomial, highest degree first. generator[0] is always 1.
    generator: [u8; RS_PARITY_LEN + 1],
}

impl Default for ReedSolomon {
    fn default() -> Self {
        Self::new()
    }
}

impl ReedSolomon {
    pub fn new() -> Self {
        let gf = GfTables::new();

        // Multiply out (x - alpha^fcr)(x - alpha^(fcr+1))...(x - alpha^(fcr+31))
        let mut generator = [0u8; RS_PARITY_LEN + 1];
        generator[0] = 1;
        for i in 0..RS_PARITY_LEN {
            let root = gf.alpha_pow(FCR + i);
            for j in (1..=i + 1).rev() {
                generator[j] ^= gf.mul(generator[j - 1], root);
            }
        }

        Self { gf, generator }
    }

    /// Compute the parity bytes of `message` into `parity`.
    /// `message` must be [RS_MESSAGE_LEN] bytes and `parity` [RS_PARITY_LEN] bytes long.
    pub fn encode_parity(&self, message: &[u8], parity: &mut [u8]) -> Result<(), RsError> {
        if message.len() != RS_MESSAGE_LEN {
            return Err(RsError::InvalidLength(message.len()));
        }
        if parity.len() != RS_PARITY_LEN {
            return Err(RsError::InvalidLength(parity.len()));
        }
        self.lfsr(message, parity);
        Ok(())
    }

    /// Encode a systematic codeword in place: the first [RS_MESSAGE_LEN] bytes of `block` are
    /// the message, and the parity is written over the remaining [RS_PARITY_LEN] bytes.
    pub fn encode(&self, block: &mut [u8; RS_BLOCK_LEN]) {
        let (message, parity) = block.split_at_mut(RS_MESSAGE_LEN);
        self.lfsr(message, parity);
    }

    fn lfsr(&self, message: &[u8], parity: &mut [u8]) {
        parity.fill(0);
        for &byte in message {
            let feedback = byte ^ parity[0];
            parity.copy_within(1.., 0);
            parity[RS_PARITY_LEN - 1] = 0;
            if feedback != 0 {
                for (p, &g) in parity.iter_mut().zip(&self.generator[1..]) {
                    *p ^= self.gf.mul(feedback, g);
                }
            }
        }
    }

    /// Calculate the syndromes of `block`, returning true if any is non-zero.
    fn syndromes(&self, block: &[u8], syndromes: &mut [u8; RS_PARITY_LEN]) -> bool {
        let mut dirty = false;
        for (i, s) in syndromes.iter_mut().enumerate() {
            let root = self.gf.alpha_pow(FCR + i);
            *s = block.iter().fold(0, |acc, &c| self.gf.mul(acc, root) ^ c);
            dirty |= *s != 0;
        }
        dirty
    }

    /// Correct `block` in place, returning the number of corrected bytes.
    /// If the block is not correctable its contents are unspecified.
    pub fn decode(&self, block: &mut [u8]) -> Result<usize, RsError> {
        if block.len() != RS_BLOCK_LEN {
            return Err(RsError::InvalidLength(block.len()));
        }

        let mut s = [0u8; RS_PARITY_LEN];
        if !self.syndromes(block, &mut s) {
            return Ok(0);
        }

        // Berlekamp-Massey. The error locator is stored lowest degree first.
        let mut lambda = [0u8; RS_PARITY_LEN + 1];
        let mut prev = [0u8; RS_PARITY_LEN + 1];
        lambda[0] = 1;
        prev[0] = 1;
        let mut l = 0usize;
        let mut m = 1usize;
        let mut prev_discrepancy = 1u8;

        for n in 0..RS_PARITY_LEN {
            let mut d = s[n];
            for i in 1..=l {
                d ^= self.gf.mul(lambda[i], s[n - i]);
            }

            if d == 0 {
                m += 1;
                continue;
            }

            let coef = self.gf.div(d, prev_discrepancy);
            let saved = lambda;
            for i in 0..(RS_PARITY_LEN + 1).saturating_sub(m) {
                lambda[i + m] ^= self.gf.mul(coef, prev[i]);
            }

            if 2 * l <= n {
                l = n + 1 - l;
                prev = saved;
                prev_discrepancy = d;
                m = 1;
            }
            else {
                m += 1;
            }
        }

        if l > RS_MAX_CORRECTIONS {
            return Err(RsError::TooManyErrors);
        }

        // Chien search. Position p (a power of alpha) is byte index RS_BLOCK_LEN - 1 - p.
        let mut positions = [0usize; RS_MAX_CORRECTIONS];
        let mut found = 0;
        for p in 0..RS_BLOCK_LEN {
            let x_inv = self.gf.alpha_pow(255 - p);
            if self.gf.eval_ascending(&lambda[..=l], x_inv) == 0 {
                if found == l {
                    return Err(RsError::TooManyErrors);
                }
                positions[found] = p;
                found += 1;
            }
        }
        if found != l {
            return Err(RsError::TooManyErrors);
        }

        // Error evaluator omega = S(x) * lambda(x) mod x^32
        let mut omega = [0u8; RS_PARITY_LEN];
        for (i, o) in omega.iter_mut().enumerate() {
            for j in 0..=i.min(l) {
                *o ^= self.gf.mul(lambda[j], s[i - j]);
            }
        }

        // Forney. With a first root of alpha^1 the error value is omega(X^-1) / lambda'(X^-1).
        for &p in &positions[..found] {
            let x_inv = self.gf.alpha_pow(255 - p);
            let numerator = self.gf.eval_ascending(&omega, x_inv);

            let mut denominator = 0u8;
            let mut x_pow = 1u8;
            let x_inv_sq = self.gf.mul(x_inv, x_inv);
            for k in (1..=l).step_by(2) {
                denominator ^= self.gf.mul(lambda[k], x_pow);
                x_pow = self.gf.mul(x_pow, x_inv_sq);
            }
            if denominator == 0 {
                return Err(RsError::TooManyErrors);
            }

            block[RS_BLOCK_LEN - 1 - p] ^= self.gf.div(numerator, denominator);
        }

        // A miscorrection past the correction radius leaves a non-codeword behind.
        if self.syndromes(block, &mut s) {
            return Err(RsError::TooManyErrors);
        }

        log::trace!("ReedSolomon::decode(): corrected {} bytes", found);
        Ok(found)
    }
}
