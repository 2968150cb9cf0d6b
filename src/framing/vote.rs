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

    src/framing/vote.rs

    Boyer-Moore majority vote over repeated header words.

*/

/// Recover a value written several times from possibly corrupted copies.
///
/// Returns the value held by a strict majority of `values`, or `None` if no value has more than
/// half of the votes.
pub fn pick_sector_number(values: &[u16]) -> Option<u16> {
    let mut candidate = 0u16;
    let mut count = 0usize;

    for &value in values {
        if count == 0 {
            candidate = value;
            count = 1;
        }
        else if value == candidate {
            count += 1;
        }
        else {
            count -= 1;
        }
    }

    // The first pass only finds the sole possible majority; confirm it actually is one.
    let votes = values.iter().filter(|&&v| v == candidate).count();
    (votes * 2 > values.len()).then_some(candidate)
}
