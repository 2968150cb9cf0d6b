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

    src/lib.rs

    The main library crate for fluxtape, a self-clocking magnetic read/write channel for storing data on
    cassette tape.

*/

//! fluxtape turns a cassette tape into a sequential, sector-addressed storage medium. The write path runs
//! user bytes through Reed-Solomon/CRC16 forward error correction, a self-clocking line code (FM or MFM)
//! and into a [BitSink] one 32-bit code word at a time. The read path recovers the bit clock from a raw
//! sample stream with a digital delay-locked loop, frames sectors with a small state machine and returns
//! verified payload bytes.
//!
//! The physical tape deck is never touched directly; it is reached only through the [BitSource] and
//! [BitSink] traits. For testing and experimentation, [TapeRecorder] renders code words into a simulated
//! sample stream with configurable timing impairments, and [TapePlayback] plays it back.
//!
//! ```no_run
//! use fluxtape::prelude::*;
//!
//! let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
//! let mut recorder = TapeRecorder::new(session.config());
//! session.write_stream(&mut recorder, b"Hello, tape!", "hello").unwrap();
//!
//! let tape = recorder.finish();
//! let report = session.read_stream(TapePlayback::new(tape), &CancelToken::new(), |_| {}).unwrap();
//! assert_eq!(report.data, b"Hello, tape!");
//! ```

pub mod cdr;
pub mod channel;
pub mod config;
pub mod fec;
pub mod framing;
pub mod line_codec;
pub mod session;
pub mod types;

use thiserror::Error;

/// [TapeError] is the error type for fallible channel operations.
///
/// Data integrity problems found while reading (failed chunks, unreadable headers, sync misses) are not
/// errors: they are reported through [ReaderMessage] values and the [ReadReport].
#[derive(Clone, Debug, Error)]
pub enum TapeError {
    #[error("An IO error occurred reading or writing the tape image: {0}")]
    IoError(String),
    #[error("The tape image parser encountered an error: {0}")]
    FormatParseError(String),
    #[error("Invalid parameters were specified to a library function: {0}")]
    ParameterError(String),
    #[error("Stream of {0} bytes requires more sectors than a tape pass can number")]
    StreamTooLong(usize),
    #[error("The bit sink rejected a code word: {0}")]
    SinkError(String),
    #[error("The reader thread terminated abnormally")]
    ReaderThreadError,
}

impl From<std::io::Error> for TapeError {
    fn from(e: std::io::Error) -> Self {
        TapeError::IoError(e.to_string())
    }
}

impl From<binrw::Error> for TapeError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(e) => TapeError::IoError(e.to_string()),
            _ => TapeError::FormatParseError(e.to_string()),
        }
    }
}

pub use crate::{
    cdr::{ClockRecovery, LoopExit, LoopStats, WindowHandler},
    channel::{
        image::TapeImage,
        recorder::{Dropout, Impairments, TapeRecorder},
        BitSink,
        BitSource,
        CancelToken,
        CancellableSource,
        TapePlayback,
    },
    config::{ChannelConfig, DllParams, LeaderConfig},
    fec::{chunk::ChunkStatus, ChunkCodec},
    framing::{
        reader::{ReaderMessage, SectorEvents, SectorReader},
        writer::SectorWriter,
        SectorBuffers,
        SectorHeader,
        SectorInfo,
    },
    line_codec::{LineCodec, LineState},
    session::{ChannelSession, ReadReport, SectorSummary, WriteReport},
    types::{LineCode, ReadState, SectorFlags},
};

pub mod prelude {
    pub use crate::{
        BitSink,
        BitSource,
        CancelToken,
        ChannelConfig,
        ChannelSession,
        ChunkStatus,
        DllParams,
        Impairments,
        LeaderConfig,
        LineCode,
        ReadReport,
        ReaderMessage,
        SectorSummary,
        TapeError,
        TapeImage,
        TapePlayback,
        TapeRecorder,
        WriteReport,
    };
}
