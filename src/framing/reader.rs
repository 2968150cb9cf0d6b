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

    src/framing/reader.rs

    The sector reading state machine, driven one window at a time by the clock recovery loop.

*/

use crate::{
    cdr::{ClockRecovery, LoopExit, WindowHandler},
    channel::BitSource,
    config::ChannelConfig,
    fec::{ChunkCodec, ChunkStatus, CHUNK_LEN, CHUNK_PAYLOAD_LEN},
    framing::{
        layout::{SectorHeader, SectorInfo},
        match_sync,
        pick_sector_number,
        SectorBuffers,
        SyncWords,
        CHUNKS_PER_SECTOR,
        HEADER_REPEATS,
        SECTOR_RAW_LEN,
    },
    line_codec::LineCodec,
    types::{LineCode, ReadState},
};

/// Notifications produced by the sector reader, in the order they occur on tape.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReaderMessage {
    /// A sector header was read. `None` if the repeated header words had no majority.
    SectorFound(Option<u16>),
    /// Every chunk of the sector verified. Holds the number of bytes error correction repaired.
    SectorDone(Option<u16>, u32),
    /// At least one chunk failed. Holds the number of failed chunks.
    SectorError(Option<u16>, u32),
    /// The read loop has exited.
    Terminate,
}

/// A sector as decoded by the reader. Borrows the reader's buffers, so it is only valid for the
/// duration of the [SectorEvents::sector_read] call.
#[derive(Debug)]
pub struct DecodedSector<'a> {
    /// The voted sector header, if the vote succeeded.
    pub header: Option<SectorHeader>,
    /// The info block, if the first chunk verified and the block is well formed.
    pub info: Option<SectorInfo>,
    /// Decoded payload of all chunks: the info block followed by user data.
    pub data: &'a [u8],
    pub chunks: &'a [ChunkStatus; CHUNKS_PER_SECTOR],
    /// Clock rule violations seen in the sector's data words.
    pub clock_violations: u32,
}

impl DecodedSector<'_> {
    pub fn is_ok(&self) -> bool {
        self.chunks.iter().all(|c| c.is_ok())
    }

    /// The sector number. The CRC protected info block takes precedence over the voted header.
    pub fn number(&self) -> Option<u16> {
        match (&self.info, &self.header) {
            (Some(info), _) => Some(info.number),
            (None, Some(header)) => Some(header.number),
            _ => None,
        }
    }

    /// Returns true if this is the last sector of a stream.
    pub fn eof(&self) -> bool {
        match (&self.info, &self.header) {
            (Some(info), _) => info.eof(),
            (None, Some(header)) => header.eof,
            _ => false,
        }
    }

    pub fn corrected_bytes(&self) -> u32 {
        self.chunks.iter().map(|c| c.corrected()).sum()
    }

    pub fn failed_chunks(&self) -> u32 {
        self.chunks.iter().filter(|c| !c.is_ok()).count() as u32
    }

    /// The user data of a verified sector.
    pub fn user_data(&self) -> Option<&[u8]> {
        let info = self.info.as_ref()?;
        if !self.is_ok() {
            return None;
        }
        let start = crate::framing::SECTOR_INFO_LEN;
        Some(&self.data[start..start + info.data_len as usize])
    }

    /// The completion message for this sector.
    pub fn message(&self) -> ReaderMessage {
        if self.is_ok() {
            ReaderMessage::SectorDone(self.number(), self.corrected_bytes())
        }
        else {
            ReaderMessage::SectorError(self.number(), self.failed_chunks())
        }
    }
}

/// Receives the results of a [SectorReader].
pub trait SectorEvents {
    /// A sector header was read and voted on.
    fn sector_found(&mut self, header: Option<SectorHeader>);
    /// A sector finished decoding, successfully or not.
    fn sector_read(&mut self, sector: &DecodedSector<'_>);
    /// The read loop exited.
    fn terminated(&mut self, _exit: LoopExit) {}
}

/// Collects reader messages. Useful for tests and simple synchronous callers.
impl SectorEvents for Vec<ReaderMessage> {
    fn sector_found(&mut self, header: Option<SectorHeader>) {
        self.push(ReaderMessage::SectorFound(header.map(|h| h.number)));
    }

    fn sector_read(&mut self, sector: &DecodedSector<'_>) {
        self.push(sector.message());
    }

    fn terminated(&mut self, _exit: LoopExit) {
        self.push(ReaderMessage::Terminate);
    }
}

/// The sector reading state machine.
///
/// The reader borrows the session's buffers and chunk codec; it owns only the small amount of
/// state needed between windows.
pub struct SectorReader<'a, E: SectorEvents> {
    code: LineCode,
    sync: SyncWords,
    codec: &'a ChunkCodec,
    buffers: &'a mut SectorBuffers,
    events: E,
    /// Xor mask restoring true polarity, set at each sync.
    inverted: u32,
    /// Decoder level, in true polarity.
    level: bool,
    header_words: [u16; HEADER_REPEATS],
    header_index: usize,
    header: Option<SectorHeader>,
    raw_index: usize,
    clock_violations: u32,
    sectors: usize,
}

impl<'a, E: SectorEvents> SectorReader<'a, E> {
    pub fn new(config: &ChannelConfig, codec: &'a ChunkCodec, buffers: &'a mut SectorBuffers, events: E) -> Self {
        Self {
            code: config.line_code,
            sync: SyncWords::for_code(config.line_code),
            codec,
            buffers,
            events,
            inverted: 0,
            level: false,
            header_words: [0; HEADER_REPEATS],
            header_index: 0,
            header: None,
            raw_index: 0,
            clock_violations: 0,
            sectors: 0,
        }
    }

    /// Read sectors from `source` until the end of data sector or until the source ends.
    pub fn run<S: BitSource + ?Sized>(&mut self, cdr: &mut ClockRecovery, source: &mut S) -> LoopExit {
        let exit = cdr.run(source, self, ReadState::ResyncSector);
        log::debug!(
            "SectorReader::run(): exited with {:?} after {} sectors; {:?}",
            exit,
            self.sectors,
            cdr.stats()
        );
        self.events.terminated(exit);
        exit
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn into_events(self) -> E {
        self.events
    }

    /// Number of sectors decoded so far.
    pub fn sectors(&self) -> usize {
        self.sectors
    }

    fn resync(&mut self, window: u32, sync: u32) -> bool {
        match match_sync(window, sync) {
            Some(mask) => {
                self.inverted = mask;
                self.level = sync & 1 != 0;
                true
            }
            None => false,
        }
    }

    fn decode_window(&mut self, window: u32) -> (u8, u8) {
        let word = window ^ self.inverted;
        self.clock_violations += self.code.clock_violations(word, self.level);
        self.code.decode_pair(word, &mut self.level)
    }

    fn read_header(&mut self, window: u32) -> ReadState {
        let (hi, lo) = self.decode_window(window);
        self.header_words[self.header_index] = u16::from_be_bytes([hi, lo]);
        self.header_index += 1;
        if self.header_index < HEADER_REPEATS {
            return ReadState::ReadSectorHeader;
        }

        self.header = pick_sector_number(&self.header_words).and_then(SectorHeader::from_word);
        match self.header {
            Some(header) => log::trace!("read_header(): sector {} eof: {}", header.number, header.eof),
            None => log::warn!("read_header(): no majority in header words {:04X?}", self.header_words),
        }
        self.events.sector_found(self.header);
        ReadState::ResyncData
    }

    fn read_data(&mut self, window: u32) -> ReadState {
        let (b1, b2) = self.decode_window(window);
        self.buffers.raw[self.raw_index] = b1;
        self.buffers.raw[self.raw_index + 1] = b2;
        self.raw_index += 2;
        if self.raw_index < SECTOR_RAW_LEN {
            return ReadState::ReadData;
        }
        self.finish_sector()
    }

    fn finish_sector(&mut self) -> ReadState {
        let buffers = &mut *self.buffers;
        let raw_chunks = buffers.raw.chunks_exact(CHUNK_LEN);
        let payloads = buffers.data.chunks_exact_mut(CHUNK_PAYLOAD_LEN);
        for ((raw, payload), status) in raw_chunks.zip(payloads).zip(buffers.chunks.iter_mut()) {
            *status = self.codec.decode(raw, payload);
        }

        let info = if buffers.chunks[0].is_ok() {
            SectorInfo::read_from(&buffers.data)
        }
        else {
            None
        };

        if let (Some(info), Some(header)) = (&info, &self.header) {
            if info.header() != *header {
                log::warn!(
                    "finish_sector(): header {:?} disagrees with info block {:?}",
                    header,
                    info.header()
                );
            }
        }

        let sector = DecodedSector {
            header: self.header,
            info,
            data: &buffers.data,
            chunks: &buffers.chunks,
            clock_violations: self.clock_violations,
        };

        if sector.is_ok() {
            log::debug!(
                "finish_sector(): sector {:?} ok, {} bytes corrected",
                sector.number(),
                sector.corrected_bytes()
            );
        }
        else {
            log::warn!(
                "finish_sector(): sector {:?} has {} failed chunks: {:?}",
                sector.number(),
                sector.failed_chunks(),
                sector.chunks
            );
        }

        let eof = sector.eof();
        self.events.sector_read(&sector);
        self.sectors += 1;

        if eof {
            log::debug!("finish_sector(): end of data");
            ReadState::Terminate
        }
        else {
            ReadState::ResyncSector
        }
    }
}

impl<E: SectorEvents> WindowHandler for SectorReader<'_, E> {
    fn step(&mut self, state: ReadState, window: u32) -> ReadState {
        match state {
            ReadState::ResyncSector => {
                if self.resync(window, self.sync.sector) {
                    log::trace!("step(): sector sync, inverted: {}", self.inverted != 0);
                    self.header_index = 0;
                    ReadState::ReadSectorHeader
                }
                else {
                    ReadState::ResyncSector
                }
            }
            ReadState::ReadSectorHeader => self.read_header(window),
            ReadState::ResyncData => {
                if self.resync(window, self.sync.data) {
                    log::trace!("step(): data sync, inverted: {}", self.inverted != 0);
                    self.raw_index = 0;
                    self.clock_violations = 0;
                    ReadState::ReadData
                }
                else {
                    ReadState::ResyncData
                }
            }
            ReadState::ReadData => self.read_data(window),
            ReadState::Terminate => ReadState::Terminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        framing::{file_id_from_str, writer::SectorWriter, SECTOR_CAPACITY},
        line_codec::LineState,
    };
    use strum::IntoEnumIterator;

    /// Feed a run of code words to the reader as ideal recovered bits, bypassing clock recovery.
    fn feed_words<E: SectorEvents>(reader: &mut SectorReader<'_, E>, words: &[u32], invert: bool) -> ReadState {
        let mut state = ReadState::ResyncSector;
        let mut window = 0u32;
        let mut bit_count = 0;
        for &word in words {
            let word = if invert { !word } else { word };
            for bit in (0..32).rev() {
                window = (window << 1) | ((word >> bit) & 1);
                bit_count += 1;
                if state.is_resync() || bit_count == 32 {
                    bit_count = 0;
                    state = reader.step(state, window);
                    if state == ReadState::Terminate {
                        return state;
                    }
                }
            }
        }
        state
    }

    fn write_sector(config: &ChannelConfig, codec: &ChunkCodec, number: u16, data: &[u8], eof: bool) -> Vec<u32> {
        let mut staging = vec![0u8; SECTOR_RAW_LEN];
        let mut writer = SectorWriter::new(config, codec, &mut staging);
        let info = SectorInfo::new(number, data.len(), eof, file_id_from_str("test"));
        writer.prepare(&info, data).unwrap();
        let mut words: Vec<u32> = Vec::new();
        writer.emit(&mut words, number == 0).unwrap();
        words
    }

    #[test]
    fn reads_sector_in_both_polarities() {
        let codec = ChunkCodec::new();
        for code in LineCode::iter() {
            let config = ChannelConfig::default().with_line_code(code);
            let words = write_sector(&config, &codec, 0, b"HELLO", false);

            for invert in [false, true] {
                let mut buffers = SectorBuffers::new();
                let mut reader = SectorReader::new(&config, &codec, &mut buffers, Vec::new());
                let state = feed_words(&mut reader, &words, invert);
                assert_eq!(state, ReadState::ResyncSector);
                assert_eq!(
                    reader.events(),
                    &vec![ReaderMessage::SectorFound(Some(0)), ReaderMessage::SectorDone(Some(0), 0)]
                );
                drop(reader);
                assert_eq!(&buffers.data[crate::framing::SECTOR_INFO_LEN..][..5], b"HELLO");
            }
        }
    }

    #[test]
    fn eof_sector_terminates() {
        let codec = ChunkCodec::new();
        let config = ChannelConfig::default();
        let mut words = write_sector(&config, &codec, 0, &[0x11; SECTOR_CAPACITY], false);
        words.extend(write_sector(&config, &codec, 1, b"last", true));
        words.extend(write_sector(&config, &codec, 2, b"never read", false));

        let mut buffers = SectorBuffers::new();
        let mut reader = SectorReader::new(&config, &codec, &mut buffers, Vec::new());
        assert_eq!(feed_words(&mut reader, &words, false), ReadState::Terminate);
        assert_eq!(reader.sectors(), 2);
    }

    #[test]
    fn failed_vote_still_reads_data() {
        let codec = ChunkCodec::new();
        let config = ChannelConfig::default();
        let sync = SyncWords::for_code(config.line_code);

        // Three different header words, then a well formed data region.
        let mut words = vec![sync.leader; 8];
        words.push(sync.sector);
        let mut state = LineState::following(sync.sector);
        for header in [1u16, 2, 3] {
            let [hi, lo] = header.to_be_bytes();
            words.push(config.line_code.encode_pair(hi, lo, &mut state));
        }
        let sector = write_sector(&config, &codec, 5, b"payload", false);
        let data_sync = sector.iter().position(|&w| w == sync.data).unwrap();
        words.extend(vec![sync.leader; 8]);
        words.extend(&sector[data_sync..]);

        let mut buffers = SectorBuffers::new();
        let mut reader = SectorReader::new(&config, &codec, &mut buffers, Vec::new());
        feed_words(&mut reader, &words, false);
        // The info block still identifies the sector.
        assert_eq!(
            reader.events(),
            &vec![ReaderMessage::SectorFound(None), ReaderMessage::SectorDone(Some(5), 0)]
        );
    }
}
