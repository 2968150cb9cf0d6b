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

    src/cdr/dll.rs

    A fixed point digital delay-locked loop recovering the bit clock from oversampled line levels.

*/

//! The loop runs a phase accumulator that wraps once per channel cell. Its nominal step is
//! `ACC_SIZE / bit_width`, so an undisturbed loop samples the line once every `bit_width` samples.
//! Whenever the line changes level, the phase error is the distance of the accumulator from the
//! middle of its range. The error is low pass filtered, then steers the step through a
//! proportional and an integral path. The loop emits the current line level each time the
//! accumulator wraps, which settles half a cell away from the transitions.
//!
//! Everything is integer arithmetic scaled by 2^[NSCALE].

use crate::config::DllParams;

pub const NSCALE: u32 = 20;
const ONE: i64 = 1 << NSCALE;
/// Accumulator range, scaled.
pub const ACC_SIZE: i64 = 512 << NSCALE;
const INTEG_MAX: i64 = 512 << NSCALE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DllGains {
    pub kp: i64,
    pub ki: i64,
    pub alpha: i64,
}

impl From<&DllParams> for DllGains {
    fn from(params: &DllParams) -> Self {
        let scale = ONE as f64;
        Self {
            kp: (params.kp * scale) as i64,
            ki: (params.ki * scale) as i64,
            alpha: (params.alpha * scale) as i64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Dll {
    gains: DllGains,
    ftw0: i64,
    acc: i64,
    phase_err: i64,
    phase_err_f: i64,
    integ: i64,
    last_sample: bool,
}

impl Dll {
    pub fn new(bit_width: u32, params: &DllParams) -> Self {
        let gains = DllGains::from(params);
        let ftw0 = ACC_SIZE / bit_width.max(1) as i64;
        log::trace!("Dll::new(): bit width {} ftw0: {} gains: {:?}", bit_width, ftw0, gains);
        Self {
            gains,
            ftw0,
            acc: ACC_SIZE / 2,
            phase_err: 0,
            phase_err_f: 0,
            integ: 0,
            last_sample: false,
        }
    }

    /// Return the loop to its initial state.
    pub fn reset(&mut self) {
        self.acc = ACC_SIZE / 2;
        self.phase_err = 0;
        self.phase_err_f = 0;
        self.integ = 0;
        self.last_sample = false;
    }

    /// Current step of the accumulator, scaled.
    pub fn ftw(&self) -> i64 {
        self.ftw0 + ((self.phase_err_f * self.gains.kp) >> NSCALE) + self.integ
    }

    /// Nominal step of the accumulator, scaled.
    pub fn ftw0(&self) -> i64 {
        self.ftw0
    }

    /// Feed one raw sample. Returns a recovered bit when the accumulator wraps.
    #[inline]
    pub fn sample(&mut self, sample: bool) -> Option<bool> {
        if sample != self.last_sample {
            self.phase_err = ACC_SIZE / 2 - self.acc;
        }

        self.phase_err_f = (self.phase_err * self.gains.alpha + self.phase_err_f * (ONE - self.gains.alpha)) >> NSCALE;
        self.integ = (self.integ + ((self.phase_err_f * self.gains.ki) >> NSCALE)).clamp(-INTEG_MAX, INTEG_MAX);

        let ftw = self.ftw();
        self.last_sample = sample;
        self.acc += ftw;

        if self.acc >= ACC_SIZE {
            self.acc -= ACC_SIZE;
            Some(sample)
        }
        else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gains_to_fixed_point() {
        let gains = DllGains::from(&DllParams::default());
        assert_eq!(gains.kp, 34917);
        assert_eq!(gains.ki, 1);
        assert_eq!(gains.alpha, 104857);
    }

    #[test]
    fn free_running_loop() {
        let mut dll = Dll::new(8, &DllParams::default());
        let mut emitted = Vec::new();
        for i in 0..800 {
            if dll.sample(false).is_some() {
                emitted.push(i);
            }
        }
        assert_eq!(emitted.len(), 100);
        assert_eq!(emitted[0], 3);
        assert!(emitted.windows(2).all(|w| w[1] - w[0] == 8));
    }

    #[test]
    fn reset_restores_free_run() {
        let mut dll = Dll::new(8, &DllParams::default());
        assert_eq!(dll.ftw0(), ACC_SIZE / 8);
        assert_eq!(dll.ftw(), dll.ftw0());

        // Pull the loop off nominal with an off-rate transition pattern.
        for i in 0..1000 {
            dll.sample((i / 7) % 2 == 1);
        }
        assert_ne!(dll.ftw(), dll.ftw0());

        dll.reset();
        assert_eq!(dll.ftw(), dll.ftw0());
        let first = (0..16).find(|_| dll.sample(false).is_some());
        assert_eq!(first, Some(3));
    }

    #[test]
    fn locks_to_cell_centers() {
        // Transitions every 16 samples; the loop should sample each cell in its middle.
        let mut dll = Dll::new(8, &DllParams::default());
        let mut bits = Vec::new();
        for i in 0..4096 {
            let level = (i / 16) % 2 == 1;
            if let Some(b) = dll.sample(level) {
                bits.push((i % 8, b));
            }
        }
        let tail = &bits[bits.len() - 64..];
        let phase = tail[0].0;
        assert!(tail.iter().all(|(p, _)| *p == phase));
        assert!((2..=5).contains(&phase), "sampling at phase {}", phase);
        for pair in tail.chunks(2) {
            assert_eq!(pair[0].1, pair[1].1);
        }
    }
}
