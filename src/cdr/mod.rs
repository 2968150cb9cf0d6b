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

    src/cdr/mod.rs

    Clock and data recovery: turns raw line samples into bits and dispatches 32-bit windows to the
    sector state machine.

*/

pub mod dll;

use bit_vec::BitVec;

use crate::{channel::BitSource, config::ChannelConfig, types::ReadState};
pub use dll::Dll;

/// Receives bit windows from the [ClockRecovery] loop.
///
/// In a resync state the handler sees the window after every recovered bit. In a read state it
/// sees each 32-bit window exactly once, starting with the first 32 bits after the state was
/// entered.
pub trait WindowHandler {
    fn step(&mut self, state: ReadState, window: u32) -> ReadState;
}

impl<F> WindowHandler for F
where
    F: FnMut(ReadState, u32) -> ReadState,
{
    fn step(&mut self, state: ReadState, window: u32) -> ReadState {
        self(state, window)
    }
}

/// Why a [ClockRecovery::run] loop exited.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopExit {
    /// The handler returned [ReadState::Terminate].
    Terminated,
    /// The bit source ended.
    SourceEnded,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopStats {
    /// Raw samples consumed.
    pub samples: u64,
    /// Bits recovered.
    pub bits: u64,
    /// Windows dispatched to the handler.
    pub windows: u64,
}

pub struct ClockRecovery {
    dll: Dll,
    stats: LoopStats,
    capture: Option<BitVec>,
    capture_limit: usize,
}

impl ClockRecovery {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            dll: Dll::new(config.bit_width, &config.dll),
            stats: LoopStats::default(),
            capture: None,
            capture_limit: 0,
        }
    }

    /// Keep a copy of the first `limit` raw samples for diagnostics.
    pub fn with_capture(mut self, limit: usize) -> Self {
        self.capture = Some(BitVec::with_capacity(limit));
        self.capture_limit = limit;
        self
    }

    pub fn capture(&self) -> Option<&BitVec> {
        self.capture.as_ref()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Consume samples from `source` until the loop produces a bit. Returns `None` if the source
    /// ends first.
    pub fn recover_bit<S: BitSource + ?Sized>(&mut self, source: &mut S) -> Option<bool> {
        loop {
            let sample = source.next_bit()?;
            self.stats.samples += 1;

            if let Some(capture) = self.capture.as_mut() {
                if capture.len() < self.capture_limit {
                    capture.push(sample);
                }
            }

            if let Some(bit) = self.dll.sample(sample) {
                self.stats.bits += 1;
                return Some(bit);
            }
        }
    }

    /// Run the window loop from `initial` until the handler terminates or the source ends.
    pub fn run<S, H>(&mut self, source: &mut S, handler: &mut H, initial: ReadState) -> LoopExit
    where
        S: BitSource + ?Sized,
        H: WindowHandler + ?Sized,
    {
        let mut state = initial;
        let mut window = 0u32;
        let mut bit_count = 0u32;

        if state == ReadState::Terminate {
            return LoopExit::Terminated;
        }

        while let Some(bit) = self.recover_bit(source) {
            window = (window << 1) | bit as u32;
            bit_count += 1;

            if state.is_resync() || bit_count == 32 {
                bit_count = 0;
                self.stats.windows += 1;

                let next = handler.step(state, window);
                if next != state {
                    log::trace!("ClockRecovery::run(): {} -> {}", state, next);
                }
                state = next;
                if state == ReadState::Terminate {
                    return LoopExit::Terminated;
                }
            }
        }
        LoopExit::SourceEnded
    }
}
