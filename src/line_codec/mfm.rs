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

    src/line_codec/mfm.rs

    Implements MFM (modified frequency modulation) encoding of byte pairs into code words.

*/

use super::{integrate, spread_cells, transitions, LineCodec, LineState, CLOCK_CELLS};

/// MFM writes a clock transition only between two `0` data bits, and a data transition in the
/// middle of the cell for each `1` bit. Runs between transitions are 2 to 4 cells long.
#[derive(Copy, Clone, Debug, Default)]
pub struct MfmCodec;

impl MfmCodec {
    /// Compute the clock bits for 16 data bits, where bit 16 of the input holds the previous data bit.
    #[inline]
    fn clocks(data_with_prev: u32) -> u16 {
        !((data_with_prev | (data_with_prev >> 1)) as u16)
    }
}

impl LineCodec for MfmCodec {
    fn encode_pair(&self, b1: u8, b2: u8, state: &mut LineState) -> u32 {
        let data = u16::from_be_bytes([b1, b2]);
        let clocks = MfmCodec::clocks(data as u32 | ((state.prev_bit as u32) << 16));
        let word = integrate(spread_cells(data) | (spread_cells(clocks) << 1), state.level);

        state.level = word & 1 != 0;
        state.prev_bit = data & 1 != 0;
        word
    }

    fn clock_violations(&self, word: u32, level: bool) -> u32 {
        let t = transitions(word, level);
        let data = super::compress_cells(t);
        // The first clock cell depends on a data bit from the previous word, so it is not checked.
        let expected = spread_cells(MfmCodec::clocks(data as u32) & 0x7FFF) << 1;
        ((t ^ expected) & CLOCK_CELLS & 0x7FFF_FFFF).count_ones()
    }
}
