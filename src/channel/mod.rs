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

    src/channel/mod.rs

    The boundary between the channel and the tape deck: bit sources, bit sinks and their simulated
    counterparts.

*/

//! Hardware is reached only through two traits. A [BitSource] yields one raw line sample per
//! channel tick, and a [BitSink] accepts one 32-bit code word per transmission slot. Both block
//! as long as the hardware needs them to.
//!
//! For everything short of a real deck, [recorder::TapeRecorder] renders code words into a
//! [image::TapeImage] of raw samples, and [TapePlayback] plays one back.

pub mod cancel;
pub mod image;
pub mod recorder;

pub use cancel::{CancelToken, CancellableSource};
pub use image::TapeImage;
pub use recorder::{Dropout, Impairments, TapeRecorder};

use crate::TapeError;

/// A source of raw line samples.
pub trait BitSource {
    /// Return the next sample, or `None` to end the read.
    fn next_bit(&mut self) -> Option<bool>;
}

impl<S: BitSource + ?Sized> BitSource for &mut S {
    fn next_bit(&mut self) -> Option<bool> {
        (**self).next_bit()
    }
}

impl<S: BitSource + ?Sized> BitSource for Box<S> {
    fn next_bit(&mut self) -> Option<bool> {
        (**self).next_bit()
    }
}

/// A sink for line coded words.
pub trait BitSink {
    /// Transmit one code word, blocking until the channel accepts it.
    fn emit(&mut self, word: u32) -> Result<(), TapeError>;
}

impl<K: BitSink + ?Sized> BitSink for &mut K {
    fn emit(&mut self, word: u32) -> Result<(), TapeError> {
        (**self).emit(word)
    }
}

/// Collects code words in memory.
impl BitSink for Vec<u32> {
    fn emit(&mut self, word: u32) -> Result<(), TapeError> {
        self.push(word);
        Ok(())
    }
}

/// Plays back the samples of a [TapeImage].
#[derive(Clone, Debug)]
pub struct TapePlayback {
    image: TapeImage,
    cursor: usize,
}

impl TapePlayback {
    pub fn new(image: TapeImage) -> Self {
        Self { image, cursor: 0 }
    }

    /// Index of the next sample to be played.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn image(&self) -> &TapeImage {
        &self.image
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl BitSource for TapePlayback {
    fn next_bit(&mut self) -> Option<bool> {
        let bit = self.image.samples().get(self.cursor)?;
        self.cursor += 1;
        Some(bit)
    }
}
