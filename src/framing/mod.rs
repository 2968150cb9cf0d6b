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

    src/framing/mod.rs

    Sector framing: sync words, sector geometry, the reading state machine and the writing procedure.

*/

//! A sector on tape, in code words:
//!
//! ```text
//! [BOT leader] leader.. SECTOR_SYNC header header header gap.. DATA_SYNC data[510] trailer..
//! ```
//!
//! The beginning of tape leader is only written before the first sector of a pass. The header
//! and data regions are line coded, starting from the line state that follows their sync word.
//! Everything else is a fixed pattern.

pub mod layout;
pub mod reader;
pub mod vote;
pub mod writer;

pub use layout::{
    file_id_from_str,
    SectorHeader,
    SectorInfo,
    FILE_ID_LEN,
    MAX_SECTOR_NUMBER,
    SECTOR_CAPACITY,
    SECTOR_INFO_LEN,
};
pub use reader::{DecodedSector, ReaderMessage, SectorEvents, SectorReader};
pub use vote::pick_sector_number;
pub use writer::SectorWriter;

use crate::{
    fec::{ChunkStatus, CHUNK_LEN, CHUNK_PAYLOAD_LEN},
    types::LineCode,
};

pub const CHUNKS_PER_SECTOR: usize = 4;
pub const HEADER_REPEATS: usize = 3;
/// FEC encoded bytes per sector.
pub const SECTOR_RAW_LEN: usize = CHUNK_LEN * CHUNKS_PER_SECTOR;
/// Code words of sector data.
pub const SECTOR_WORDS: usize = SECTOR_RAW_LEN / 2;
/// Payload bytes per sector, including the info block.
pub const SECTOR_DATA_LEN: usize = CHUNK_PAYLOAD_LEN * CHUNKS_PER_SECTOR;

pub const MFM_LEADER: u32 = 0xCCCC_CCCC;
pub const MFM_SECTOR_SYNC: u32 = 0xCCCC_CCC7;
pub const MFM_DATA_SYNC: u32 = 0xCCCC_CCF1;

pub const FM_LEADER: u32 = 0xAAAA_AAAA;
pub const FM_SECTOR_SYNC: u32 = 0xAAA1_A1A1;
pub const FM_DATA_SYNC: u32 = 0xAAA1_A1A7;

/// The fixed patterns of a line code. Neither sync word, nor its complement, appears at any bit
/// offset of a leader run or of the other sync word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SyncWords {
    pub leader: u32,
    pub sector: u32,
    pub data: u32,
}

impl SyncWords {
    pub fn for_code(code: LineCode) -> Self {
        match code {
            LineCode::Fm => SyncWords {
                leader: FM_LEADER,
                sector: FM_SECTOR_SYNC,
                data: FM_DATA_SYNC,
            },
            LineCode::Mfm => SyncWords {
                leader: MFM_LEADER,
                sector: MFM_SECTOR_SYNC,
                data: MFM_DATA_SYNC,
            },
        }
    }
}

/// Match `window` against `sync` in either polarity, returning the mask that restores true polarity.
#[inline]
pub fn match_sync(window: u32, sync: u32) -> Option<u32> {
    if window == sync {
        Some(0)
    }
    else if !window == sync {
        Some(0xFFFF_FFFF)
    }
    else {
        None
    }
}

/// Sector staging buffers. Allocated once and reused for every sector.
#[derive(Clone, Debug)]
pub struct SectorBuffers {
    /// FEC encoded sector bytes, as received from or sent to the line codec.
    pub raw: Vec<u8>,
    /// Decoded chunk payloads: the info block followed by user data.
    pub data: Vec<u8>,
    /// Decode status of each chunk of the last sector read.
    pub chunks: [ChunkStatus; CHUNKS_PER_SECTOR],
}

impl Default for SectorBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorBuffers {
    pub fn new() -> Self {
        Self {
            raw: vec![0; SECTOR_RAW_LEN],
            data: vec![0; SECTOR_DATA_LEN],
            chunks: [ChunkStatus::default(); CHUNKS_PER_SECTOR],
        }
    }
}
