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

    src/channel/recorder.rs

    Renders line coded words into a simulated tape of raw samples, with optional timing impairments.

*/

//! Each code word carries 32 channel cells, most significant bit first. A bit value is the line
//! level of its cell. The recorder places a flux transition at the start of every cell whose
//! level differs from the previous cell, then samples the resulting waveform `bit_width` times
//! per nominal cell.
//!
//! Impairments model the things a cassette deck does to that waveform:
//! * `jitter` moves every transition by a uniformly distributed offset, in samples.
//! * `speed` scales the duration of every cell. Values above 1.0 model a slow transport.
//! * `dropouts` hold the line level for a range of cells, erasing every transition inside it.

#[cfg(feature = "rand")]
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    channel::{image::TapeImage, BitSink},
    config::ChannelConfig,
    TapeError,
};

/// A range of channel cells with no transitions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dropout {
    pub start_cell: u64,
    pub cells: u64,
}

impl Dropout {
    #[inline]
    pub fn contains(&self, cell: u64) -> bool {
        cell >= self.start_cell && cell - self.start_cell < self.cells
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Impairments {
    /// Maximum transition displacement, in samples.
    pub jitter: f64,
    /// Cell duration multiplier.
    pub speed: f64,
    pub dropouts: Vec<Dropout>,
    /// Seed for the jitter generator. Identical seeds render identical tapes.
    pub seed: u64,
}

impl Default for Impairments {
    fn default() -> Self {
        Self {
            jitter: 0.0,
            speed: 1.0,
            dropouts: Vec::new(),
            seed: 0,
        }
    }
}

impl Impairments {
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_dropout(mut self, start_cell: u64, cells: u64) -> Self {
        self.dropouts.push(Dropout { start_cell, cells });
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn in_dropout(&self, cell: u64) -> bool {
        self.dropouts.iter().any(|d| d.contains(cell))
    }

    fn validate(&self, bit_width: u32) -> Result<(), TapeError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(TapeError::ParameterError(format!(
                "tape speed must be a positive number, got {}",
                self.speed
            )));
        }
        // Transitions may not overtake each other.
        let half_cell = bit_width as f64 * self.speed / 2.0;
        if !self.jitter.is_finite() || self.jitter < 0.0 || self.jitter >= half_cell {
            return Err(TapeError::ParameterError(format!(
                "jitter must be within 0.0..{}, got {}",
                half_cell, self.jitter
            )));
        }
        #[cfg(not(feature = "rand"))]
        {
            if self.jitter > 0.0 {
                return Err(TapeError::ParameterError(
                    "jitter requires the 'rand' feature".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A [BitSink] that records onto a [TapeImage].
pub struct TapeRecorder {
    image: TapeImage,
    impairments: Impairments,
    cell_len: f64,
    cells: u64,
    /// Level of the previous cell as written, `None` before the first word.
    last_cell: Option<bool>,
    /// Level currently being sampled.
    level: bool,
    #[cfg(feature = "rand")]
    rng: Option<StdRng>,
}

impl TapeRecorder {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            image: TapeImage::new(config.line_code, config.bit_width),
            impairments: Impairments::default(),
            cell_len: config.bit_width as f64,
            cells: 0,
            last_cell: None,
            level: false,
            #[cfg(feature = "rand")]
            rng: None,
        }
    }

    /// Apply `impairments` to everything recorded from now on.
    pub fn with_impairments(mut self, impairments: Impairments) -> Result<Self, TapeError> {
        impairments.validate(self.image.bit_width)?;
        log::debug!("TapeRecorder::with_impairments(): {:?}", impairments);

        self.cell_len = self.image.bit_width as f64 * impairments.speed;
        #[cfg(feature = "rand")]
        {
            self.rng = (impairments.jitter > 0.0).then(|| StdRng::seed_from_u64(impairments.seed));
        }
        self.impairments = impairments;
        Ok(self)
    }

    /// Number of channel cells recorded so far.
    pub fn cells(&self) -> u64 {
        self.cells
    }

    /// Stop recording and return the tape.
    pub fn finish(mut self) -> TapeImage {
        let total = (self.cells as f64 * self.cell_len) as usize;
        self.fill_to(total as f64);
        self.image.samples_mut().truncate(total);
        log::debug!(
            "TapeRecorder::finish(): {} cells, {} samples",
            self.cells,
            self.image.len()
        );
        self.image
    }

    fn displacement(&mut self) -> f64 {
        #[cfg(feature = "rand")]
        {
            if let Some(rng) = self.rng.as_mut() {
                let jitter = self.impairments.jitter;
                return rng.gen_range(-jitter..=jitter);
            }
        }
        0.0
    }

    /// Sample the current level up to, but not including, time `t`.
    fn fill_to(&mut self, t: f64) {
        while (self.image.len() as f64) < t {
            self.image.push(self.level);
        }
    }

    fn record_cell(&mut self, cell_level: bool) {
        let cell = self.cells;
        self.cells += 1;

        let Some(last) = self.last_cell
        else {
            self.last_cell = Some(cell_level);
            self.level = cell_level;
            return;
        };

        if cell_level == last || self.impairments.in_dropout(cell) {
            return;
        }

        let t = cell as f64 * self.cell_len + self.displacement();
        self.fill_to(t);
        self.level = cell_level;
        self.last_cell = Some(cell_level);
    }
}

impl BitSink for TapeRecorder {
    fn emit(&mut self, word: u32) -> Result<(), TapeError> {
        for i in (0..32).rev() {
            self.record_cell((word >> i) & 1 != 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(words: &[u32], impairments: Impairments) -> Vec<bool> {
        let mut recorder = TapeRecorder::new(&ChannelConfig::default())
            .with_impairments(impairments)
            .unwrap();
        for &w in words {
            recorder.emit(w).unwrap();
        }
        recorder.finish().samples().iter().collect()
    }

    #[test]
    fn ideal_rendering() {
        let samples = render(&[0xCCCC_CCCC], Impairments::default());
        assert_eq!(samples.len(), 256);
        for (i, s) in samples.iter().enumerate() {
            assert_eq!(*s, (i / 16) % 2 == 0, "sample {}", i);
        }
    }

    #[test]
    fn speed_scales_duration() {
        let samples = render(&[0xFFFF_0000; 4], Impairments::default().with_speed(1.25));
        assert_eq!(samples.len(), 1280);
        // Cell 16 starts at 160.0
        assert!(samples[159]);
        assert!(!samples[160]);
    }

    #[test]
    fn dropout_holds_level() {
        let samples = render(&[0xAAAA_AAAA; 2], Impairments::default().with_dropout(8, 16));
        assert_eq!(samples.len(), 512);
        // Cell 7 is low, cells 8..24 are held low, cell 24 is high again.
        assert!(samples[8 * 8..24 * 8].iter().all(|s| !*s));
        assert!(samples[24 * 8]);
        assert!(samples[6 * 8]);
    }

    #[cfg(feature = "rand")]
    #[test]
    fn jitter_is_bounded_and_repeatable() {
        let impairments = Impairments::default().with_jitter(1.0).with_seed(7);
        let a = render(&[0xCCCC_CCCC; 16], impairments.clone());
        let b = render(&[0xCCCC_CCCC; 16], impairments);
        assert_eq!(a, b);

        let ideal = render(&[0xCCCC_CCCC; 16], Impairments::default());
        assert_eq!(a.len(), ideal.len());
        // Every run length stays within one jitter range of 16 samples.
        let mut run = 1;
        for pair in a.windows(2).take(a.len() - 20) {
            if pair[0] == pair[1] {
                run += 1;
            }
            else {
                assert!((14..=18).contains(&run), "run of {}", run);
                run = 1;
            }
        }
    }

    #[test]
    fn rejects_excessive_jitter() {
        let recorder = TapeRecorder::new(&ChannelConfig::default());
        assert!(recorder.with_impairments(Impairments::default().with_jitter(4.0)).is_err());
    }
}
