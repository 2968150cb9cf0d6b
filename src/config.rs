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

    src/config.rs

    Channel configuration: line code, oversampling ratio, clock recovery loop gains and leader lengths.

*/

//! The writer and the reader of a tape must agree on the line code and on the oversampling ratio
//! (`bit_width`, in raw samples per channel cell). The loop gains only affect the reader, and the
//! leader lengths only affect the writer.

use crate::{types::LineCode, TapeError};

pub const DEFAULT_BIT_WIDTH: u32 = 8;

/// Gains of the digital delay-locked loop, as real numbers. They are converted to fixed point
/// once when a [ClockRecovery](crate::cdr::ClockRecovery) is created.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DllParams {
    /// Proportional gain applied to the filtered phase error.
    pub kp: f64,
    /// Integral gain applied to the filtered phase error.
    pub ki: f64,
    /// Coefficient of the single-pole low pass filter on the phase error.
    pub alpha: f64,
}

impl Default for DllParams {
    fn default() -> Self {
        Self {
            kp: 0.0333,
            ki: 0.000001,
            alpha: 0.1,
        }
    }
}

/// Leader lengths emitted by the writer, in code words. The reader never depends on these;
/// the gaps only need to be long enough for the clock recovery loop to settle and for the
/// reader to finish decoding a sector before the next sync word arrives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderConfig {
    /// Beginning of tape leader, written once before the first sector of a pass.
    pub bot_words: usize,
    /// Leader written before every sector sync.
    pub sector_words: usize,
    /// Gap between the sector header and the data sync.
    pub gap_words: usize,
    /// Trailer written after the sector data.
    pub trailer_words: usize,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self {
            bot_words: 1024,
            sector_words: 8,
            gap_words: 8,
            trailer_words: 8,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelConfig {
    pub line_code: LineCode,
    /// Raw samples per channel cell.
    pub bit_width: u32,
    pub dll: DllParams,
    pub leaders: LeaderConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            line_code: LineCode::default(),
            bit_width: DEFAULT_BIT_WIDTH,
            dll: DllParams::default(),
            leaders: LeaderConfig::default(),
        }
    }
}

impl ChannelConfig {
    pub fn with_line_code(mut self, line_code: LineCode) -> Self {
        self.line_code = line_code;
        self
    }

    pub fn with_bit_width(mut self, bit_width: u32) -> Self {
        self.bit_width = bit_width;
        self
    }

    pub fn with_dll(mut self, dll: DllParams) -> Self {
        self.dll = dll;
        self
    }

    pub fn with_leaders(mut self, leaders: LeaderConfig) -> Self {
        self.leaders = leaders;
        self
    }

    /// Check that the configuration describes a usable channel.
    pub fn validate(&self) -> Result<(), TapeError> {
        if !(2..=256).contains(&self.bit_width) {
            return Err(TapeError::ParameterError(format!(
                "bit width must be between 2 and 256 samples, got {}",
                self.bit_width
            )));
        }

        let gains = [("kp", self.dll.kp), ("ki", self.dll.ki), ("alpha", self.dll.alpha)];
        for (name, value) in gains {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TapeError::ParameterError(format!(
                    "loop gain {} must be within 0.0..=1.0, got {}",
                    name, value
                )));
            }
        }

        if self.leaders.bot_words == 0 || self.leaders.sector_words == 0 {
            return Err(TapeError::ParameterError(
                "leaders must be at least one code word long".to_string(),
            ));
        }
        Ok(())
    }
}
