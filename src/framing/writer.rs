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

    src/framing/writer.rs

    The sector writing procedure: leaders, sync words, repeated header and line coded data.

*/

use crate::{
    channel::BitSink,
    config::{ChannelConfig, LeaderConfig},
    fec::{ChunkCodec, CHUNK_LEN, CHUNK_PAYLOAD_LEN},
    framing::{
        layout::{SectorHeader, SectorInfo, MAX_SECTOR_NUMBER, SECTOR_CAPACITY, SECTOR_INFO_LEN},
        SyncWords,
        HEADER_REPEATS,
        SECTOR_DATA_LEN,
        SECTOR_RAW_LEN,
    },
    line_codec::{LineCodec, LineState},
    types::LineCode,
    TapeError,
};

/// Stages one sector at a time into a borrowed buffer and emits it to a [BitSink].
pub struct SectorWriter<'a> {
    code: LineCode,
    sync: SyncWords,
    leaders: LeaderConfig,
    codec: &'a ChunkCodec,
    staging: &'a mut [u8],
    header: SectorHeader,
}

impl<'a> SectorWriter<'a> {
    /// `staging` must be at least [SECTOR_RAW_LEN] bytes long.
    pub fn new(config: &ChannelConfig, codec: &'a ChunkCodec, staging: &'a mut [u8]) -> Self {
        assert!(staging.len() >= SECTOR_RAW_LEN);
        Self {
            code: config.line_code,
            sync: SyncWords::for_code(config.line_code),
            leaders: config.leaders,
            codec,
            staging,
            header: SectorHeader::default(),
        }
    }

    /// FEC encode a sector's info block and user data into the staging buffer.
    pub fn prepare(&mut self, info: &SectorInfo, data: &[u8]) -> Result<(), TapeError> {
        if data.len() > SECTOR_CAPACITY {
            return Err(TapeError::ParameterError(format!(
                "sector data of {} bytes exceeds capacity of {}",
                data.len(),
                SECTOR_CAPACITY
            )));
        }
        if info.data_len as usize != data.len() {
            return Err(TapeError::ParameterError(format!(
                "sector info length {} does not match {} data bytes",
                info.data_len,
                data.len()
            )));
        }
        if info.number > MAX_SECTOR_NUMBER {
            return Err(TapeError::ParameterError(format!(
                "sector number {} out of range",
                info.number
            )));
        }

        let mut area = [0u8; SECTOR_DATA_LEN];
        info.write_to(&mut area);
        area[SECTOR_INFO_LEN..SECTOR_INFO_LEN + data.len()].copy_from_slice(data);

        for (payload, block) in area
            .chunks_exact(CHUNK_PAYLOAD_LEN)
            .zip(self.staging[..SECTOR_RAW_LEN].chunks_exact_mut(CHUNK_LEN))
        {
            let block: &mut [u8; CHUNK_LEN] = block
                .try_into()
                .map_err(|_| TapeError::ParameterError("staging buffer misaligned".to_string()))?;
            self.codec.encode(payload, block);
        }

        self.header = info.header();
        log::trace!(
            "prepare(): staged sector {} with {} bytes, eof: {}",
            info.number,
            data.len(),
            info.eof()
        );
        Ok(())
    }

    /// The FEC encoded bytes of the staged sector, exactly as they will be line coded.
    pub fn staged(&self) -> &[u8] {
        &self.staging[..SECTOR_RAW_LEN]
    }

    /// Mutable access to the staged bytes, for injecting faults ahead of [SectorWriter::emit].
    pub fn staged_mut(&mut self) -> &mut [u8] {
        &mut self.staging[..SECTOR_RAW_LEN]
    }

    /// Emit the staged sector. The beginning of tape leader is written first if `bot` is set.
    /// Returns the number of code words written.
    pub fn emit<K: BitSink + ?Sized>(&self, sink: &mut K, bot: bool) -> Result<usize, TapeError> {
        let mut words = 0;

        if bot {
            words += self.emit_leader(sink, self.leaders.bot_words)?;
        }
        words += self.emit_leader(sink, self.leaders.sector_words)?;

        sink.emit(self.sync.sector)?;
        let mut state = LineState::following(self.sync.sector);
        let [hi, lo] = self.header.to_word().to_be_bytes();
        for _ in 0..HEADER_REPEATS {
            sink.emit(self.code.encode_pair(hi, lo, &mut state))?;
        }
        words += 1 + HEADER_REPEATS;

        words += self.emit_leader(sink, self.leaders.gap_words)?;

        sink.emit(self.sync.data)?;
        let mut state = LineState::following(self.sync.data);
        for pair in self.staged().chunks_exact(2) {
            sink.emit(self.code.encode_pair(pair[0], pair[1], &mut state))?;
        }
        words += 1 + SECTOR_RAW_LEN / 2;

        words += self.emit_leader(sink, self.leaders.trailer_words)?;
        Ok(words)
    }

    fn emit_leader<K: BitSink + ?Sized>(&self, sink: &mut K, count: usize) -> Result<usize, TapeError> {
        for _ in 0..count {
            sink.emit(self.sync.leader)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{file_id_from_str, SECTOR_WORDS};

    #[test]
    fn sector_word_sequence() {
        let config = ChannelConfig::default();
        let codec = ChunkCodec::new();
        let mut staging = vec![0u8; SECTOR_RAW_LEN];
        let mut writer = SectorWriter::new(&config, &codec, &mut staging);
        writer
            .prepare(&SectorInfo::new(0, 5, true, file_id_from_str("hello")), b"HELLO")
            .unwrap();

        let mut words: Vec<u32> = Vec::new();
        let count = writer.emit(&mut words, true).unwrap();
        assert_eq!(count, words.len());

        let l = config.leaders;
        let sync = SyncWords::for_code(config.line_code);
        let sector_sync = l.bot_words + l.sector_words;
        assert!(words[..sector_sync].iter().all(|&w| w == sync.leader));
        assert_eq!(words[sector_sync], sync.sector);

        // All three header repeats encode the same word from a fresh line state.
        let mut state = LineState::following(sync.sector);
        let header = SectorHeader::new(0, true).to_word().to_be_bytes();
        for i in 0..HEADER_REPEATS {
            let expected = config.line_code.encode_pair(header[0], header[1], &mut state);
            assert_eq!(words[sector_sync + 1 + i], expected);
        }

        let data_sync = sector_sync + 1 + HEADER_REPEATS + l.gap_words;
        assert_eq!(words[data_sync], sync.data);
        assert_eq!(words.len(), data_sync + 1 + SECTOR_WORDS + l.trailer_words);
    }

    #[test]
    fn rejects_oversized_sector() {
        let config = ChannelConfig::default();
        let codec = ChunkCodec::new();
        let mut staging = vec![0u8; SECTOR_RAW_LEN];
        let mut writer = SectorWriter::new(&config, &codec, &mut staging);
        let data = vec![0u8; SECTOR_CAPACITY + 1];
        let info = SectorInfo::new(0, data.len(), false, [0; 8]);
        assert!(writer.prepare(&info, &data).is_err());
    }

    #[test]
    fn rejects_mismatched_length() {
        let config = ChannelConfig::default();
        let codec = ChunkCodec::new();
        let mut staging = vec![0u8; SECTOR_RAW_LEN];
        let mut writer = SectorWriter::new(&config, &codec, &mut staging);

        let info = SectorInfo::new(3, 4, false, [0; 8]);
        assert!(matches!(
            writer.prepare(&info, b"HELLO"),
            Err(TapeError::ParameterError(_))
        ));
        let info = SectorInfo::new(3, 6, false, [0; 8]);
        assert!(matches!(
            writer.prepare(&info, b"HELLO"),
            Err(TapeError::ParameterError(_))
        ));
        assert!(writer.prepare(&SectorInfo::new(3, 5, false, [0; 8]), b"HELLO").is_ok());
    }
}
