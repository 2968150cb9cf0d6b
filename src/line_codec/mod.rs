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

    src/line_codec/mod.rs

    Self-clocking line codes. A code word is 32 channel cells, most significant bit first, holding the
    line level of each cell. Two data bytes occupy one code word: each data bit is a clock cell followed
    by a data cell, and a `1` in the transition domain toggles the level.

*/

pub mod fm;
pub mod mfm;

pub use fm::FmCodec;
pub use mfm::MfmCodec;

use crate::types::LineCode;

/// Mask of the data cell positions of a code word in the transition domain.
pub const DATA_CELLS: u32 = 0x5555_5555;
/// Mask of the clock cell positions of a code word in the transition domain.
pub const CLOCK_CELLS: u32 = 0xAAAA_AAAA;

/// The line state carried across consecutive code words of one contiguous transmission.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LineState {
    /// Level of the last written cell.
    pub level: bool,
    /// Last data bit written. Only MFM clocking depends on it.
    pub prev_bit: bool,
}

impl LineState {
    /// Return the encoder state that continues seamlessly after the fixed pattern `word`.
    /// Every sector region starts from the state following its sync word.
    pub fn following(word: u32) -> Self {
        Self {
            level: word & 1 != 0,
            prev_bit: ((word >> 1) ^ word) & 1 != 0,
        }
    }
}

/// A line code that maps pairs of bytes to 32-cell code words and back.
pub trait LineCodec {
    /// Encode two bytes into a code word, advancing `state`.
    fn encode_pair(&self, b1: u8, b2: u8, state: &mut LineState) -> u32;

    /// Decode a code word into two bytes. `level` is the level of the cell preceding the word and
    /// is updated to the level of the word's last cell.
    fn decode_pair(&self, word: u32, level: &mut bool) -> (u8, u8) {
        let data = compress_cells(transitions(word, *level));
        *level = word & 1 != 0;
        ((data >> 8) as u8, data as u8)
    }

    /// Count the clock cells of a received word that break the code's clocking rule.
    fn clock_violations(&self, word: u32, level: bool) -> u32;
}

impl LineCodec for LineCode {
    fn encode_pair(&self, b1: u8, b2: u8, state: &mut LineState) -> u32 {
        match self {
            LineCode::Fm => FmCodec.encode_pair(b1, b2, state),
            LineCode::Mfm => MfmCodec.encode_pair(b1, b2, state),
        }
    }

    fn clock_violations(&self, word: u32, level: bool) -> u32 {
        match self {
            LineCode::Fm => FmCodec.clock_violations(word, level),
            LineCode::Mfm => MfmCodec.clock_violations(word, level),
        }
    }
}

/// Convert a word of line levels into a word of transitions, given the level of the cell preceding it.
#[inline]
pub fn transitions(word: u32, prev_level: bool) -> u32 {
    word ^ ((word >> 1) | ((prev_level as u32) << 31))
}

/// Convert a word of transitions into line levels starting from `level`.
#[inline]
pub fn integrate(transitions: u32, level: bool) -> u32 {
    let mut x = transitions;
    x ^= x >> 1;
    x ^= x >> 2;
    x ^= x >> 4;
    x ^= x >> 8;
    x ^= x >> 16;
    if level {
        !x
    }
    else {
        x
    }
}

/// Distribute the 16 bits of `data` to the data cell positions of a word.
#[inline]
pub fn spread_cells(data: u16) -> u32 {
    let mut x = data as u32;
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

/// Gather the data cell positions of a word into 16 bits.
#[inline]
pub fn compress_cells(word: u32) -> u16 {
    let mut x = word & DATA_CELLS;
    x = (x | (x >> 1)) & 0x3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF;
    x as u16
}
