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

    src/line_codec/fm.rs

    Implements FM (frequency modulation) encoding of byte pairs into code words.

*/

use super::{integrate, spread_cells, transitions, LineCodec, LineState, CLOCK_CELLS};

/// FM writes a clock transition at the start of every bit cell and a data transition in the
/// middle of the cell for each `1` bit.
#[derive(Copy, Clone, Debug, Default)]
pub struct FmCodec;

impl LineCodec for FmCodec {
    fn encode_pair(&self, b1: u8, b2: u8, state: &mut LineState) -> u32 {
        let data = u16::from_be_bytes([b1, b2]);
        let word = integrate(spread_cells(data) | CLOCK_CELLS, state.level);

        state.level = word & 1 != 0;
        state.prev_bit = data & 1 != 0;
        word
    }

    fn clock_violations(&self, word: u32, level: bool) -> u32 {
        // Every clock cell must carry a transition.
        (!transitions(word, level) & CLOCK_CELLS).count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fm_encode_vectors() {
        let mut state = LineState::default();
        assert_eq!(FmCodec.encode_pair(0x55, 0xA1, &mut state), 0xD2D2_B4CD);
        assert_eq!(state, LineState { level: true, prev_bit: true });

        // All ones is the FM leader pattern.
        let mut state = LineState::default();
        assert_eq!(FmCodec.encode_pair(0xFF, 0xFF, &mut state), 0xAAAA_AAAA);
    }

    #[test]
    fn fm_detects_missing_clocks() {
        let mut state = LineState::default();
        let word = FmCodec.encode_pair(0x00, 0x00, &mut state);
        assert_eq!(FmCodec.clock_violations(word, false), 0);
        // A flat line has no clock transitions at all.
        assert_eq!(FmCodec.clock_violations(0, false), 16);
    }
}
