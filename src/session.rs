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

    src/session.rs

    A channel session: owns the codec and buffers, writes streams of sectors to a bit sink and reads
    them back from a bit source on a dedicated reader thread.

*/

//! A [ChannelSession] is the entry point for most users of the library. It splits a byte stream into
//! numbered sectors on the way out, and on the way back in runs the clock recovery loop and the
//! sector reader, collecting verified sectors into a [ReadReport].
//!
//! [ChannelSession::read_stream] runs the reader on its own thread. Reader messages are delivered to
//! the caller's observer in tape order through a bounded channel, and the read can be abandoned at
//! any time through a [CancelToken].

use std::{sync::Arc, time::Duration};

use crossbeam_channel::RecvTimeoutError;

use crate::{
    cdr::{ClockRecovery, LoopExit, LoopStats},
    channel::{BitSink, BitSource, CancelToken, CancellableSource},
    config::ChannelConfig,
    fec::{ChunkCodec, ChunkStatus},
    framing::{
        file_id_from_str,
        reader::{DecodedSector, ReaderMessage, SectorEvents, SectorReader},
        writer::SectorWriter,
        SectorBuffers,
        SectorHeader,
        SectorInfo,
        CHUNKS_PER_SECTOR,
        FILE_ID_LEN,
        MAX_SECTOR_NUMBER,
        SECTOR_CAPACITY,
        SECTOR_RAW_LEN,
    },
    TapeError,
};

/// Capacity of the reader message channel. The reader thread blocks when the observer falls behind.
pub const MESSAGE_QUEUE_LEN: usize = 16;
/// How often the control side checks for cancellation while waiting on the reader.
pub const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteReport {
    pub sectors: usize,
    /// Code words emitted, including leaders.
    pub words: usize,
    /// User bytes written.
    pub bytes: usize,
}

/// The outcome of reading one sector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorSummary {
    pub number: Option<u16>,
    pub eof: bool,
    /// All chunks verified and the info block is valid.
    pub ok: bool,
    /// User data bytes in the sector, if known.
    pub len: usize,
    pub corrected: u32,
    pub failed_chunks: u32,
    pub chunks: [ChunkStatus; CHUNKS_PER_SECTOR],
    pub clock_violations: u32,
    /// The sector number did not follow the previous verified sector.
    pub out_of_sequence: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadReport {
    /// User data of every verified sector, in tape order.
    pub data: Vec<u8>,
    /// The file id of the first verified sector.
    pub file_id: Option<String>,
    pub sectors: Vec<SectorSummary>,
    /// The read ended on an end of data sector.
    pub terminated: bool,
    /// The read was cancelled.
    pub cancelled: bool,
    pub stats: LoopStats,
}

impl ReadReport {
    /// Returns true if every sector read verified, none were out of sequence, and the stream ended
    /// with an end of data sector.
    pub fn is_complete(&self) -> bool {
        self.terminated && self.sectors.iter().all(|s| s.ok && !s.out_of_sequence)
    }

    pub fn bad_sectors(&self) -> usize {
        self.sectors.iter().filter(|s| !s.ok).count()
    }

    pub fn corrected_bytes(&self) -> u64 {
        self.sectors.iter().map(|s| s.corrected as u64).sum()
    }
}

/// Collects decoded sectors into a stream and forwards reader messages to `notify`.
struct StreamAssembler<F: FnMut(ReaderMessage)> {
    notify: F,
    report: ReadReport,
    next_number: u16,
}

impl<F: FnMut(ReaderMessage)> StreamAssembler<F> {
    fn new(notify: F) -> Self {
        Self {
            notify,
            report: ReadReport::default(),
            next_number: 0,
        }
    }
}

impl<F: FnMut(ReaderMessage)> SectorEvents for StreamAssembler<F> {
    fn sector_found(&mut self, header: Option<SectorHeader>) {
        (self.notify)(ReaderMessage::SectorFound(header.map(|h| h.number)));
    }

    fn sector_read(&mut self, sector: &DecodedSector<'_>) {
        let user_data = sector.user_data();
        let mut summary = SectorSummary {
            number: sector.number(),
            eof: sector.eof(),
            ok: user_data.is_some(),
            len: sector.info.map(|i| i.data_len as usize).unwrap_or(0),
            corrected: sector.corrected_bytes(),
            failed_chunks: sector.failed_chunks(),
            chunks: *sector.chunks,
            clock_violations: sector.clock_violations,
            out_of_sequence: false,
        };

        if let (Some(data), Some(info)) = (user_data, sector.info.as_ref()) {
            if info.number != self.next_number {
                log::warn!(
                    "sector_read(): expected sector {}, read sector {}",
                    self.next_number,
                    info.number
                );
                summary.out_of_sequence = true;
            }
            self.next_number = info.number.wrapping_add(1);

            if self.report.file_id.is_none() {
                self.report.file_id = Some(info.file_name());
            }
            self.report.data.extend_from_slice(data);
        }
        else {
            // An unreadable sector still occupies its slot on tape.
            self.next_number = sector.number().unwrap_or(self.next_number).wrapping_add(1);
        }

        self.report.sectors.push(summary);
        (self.notify)(sector.message());
    }

    fn terminated(&mut self, exit: LoopExit) {
        self.report.terminated = exit == LoopExit::Terminated;
        (self.notify)(ReaderMessage::Terminate);
    }
}

/// A read/write channel over one tape.
pub struct ChannelSession {
    config: ChannelConfig,
    codec: Arc<ChunkCodec>,
    staging: Vec<u8>,
    /// Read buffers. Lent to the reader thread while a read is in progress.
    buffers: Option<SectorBuffers>,
    file_id: [u8; FILE_ID_LEN],
}

impl ChannelSession {
    pub fn new(config: ChannelConfig) -> Result<Self, TapeError> {
        config.validate()?;
        log::debug!("ChannelSession::new(): {:?}", config);
        Ok(Self {
            config,
            codec: Arc::new(ChunkCodec::new()),
            staging: vec![0; SECTOR_RAW_LEN],
            buffers: Some(SectorBuffers::new()),
            file_id: [0; FILE_ID_LEN],
        })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Set the file id written by [ChannelSession::write_sector].
    pub fn set_file_id(&mut self, name: &str) {
        self.file_id = file_id_from_str(name);
    }

    /// Write `data` as a stream of sectors numbered from 0, the last one marked end of data.
    /// An empty stream is written as a single empty end of data sector.
    pub fn write_stream<K: BitSink + ?Sized>(
        &mut self,
        sink: &mut K,
        data: &[u8],
        file_id: &str,
    ) -> Result<WriteReport, TapeError> {
        self.write_stream_with(sink, data, file_id, |_, _| {})
    }

    /// As [ChannelSession::write_stream], calling `tamper` with each sector's number and FEC
    /// encoded bytes just before the sector is line coded.
    pub fn write_stream_with<K, T>(
        &mut self,
        sink: &mut K,
        data: &[u8],
        file_id: &str,
        mut tamper: T,
    ) -> Result<WriteReport, TapeError>
    where
        K: BitSink + ?Sized,
        T: FnMut(u16, &mut [u8]),
    {
        let sector_ct = data.len().div_ceil(SECTOR_CAPACITY).max(1);
        if sector_ct > MAX_SECTOR_NUMBER as usize + 1 {
            return Err(TapeError::StreamTooLong(data.len()));
        }
        self.set_file_id(file_id);

        let mut writer = SectorWriter::new(&self.config, &self.codec, &mut self.staging);
        let mut report = WriteReport::default();

        for i in 0..sector_ct {
            let start = i * SECTOR_CAPACITY;
            let end = (start + SECTOR_CAPACITY).min(data.len());
            let chunk = &data[start..end];
            let number = i as u16;

            let info = SectorInfo::new(number, chunk.len(), i == sector_ct - 1, self.file_id);
            writer.prepare(&info, chunk)?;
            tamper(number, writer.staged_mut());
            report.words += writer.emit(sink, i == 0)?;
            report.bytes += chunk.len();
            report.sectors += 1;
        }

        log::debug!(
            "write_stream(): wrote {} bytes in {} sectors, {} words",
            report.bytes,
            report.sectors,
            report.words
        );
        Ok(report)
    }

    /// Write a single sector, for example to rewrite one in place. The beginning of tape leader is
    /// written first if `bot` is set. Returns the number of code words written.
    pub fn write_sector<K: BitSink + ?Sized>(
        &mut self,
        sink: &mut K,
        number: u16,
        data: &[u8],
        eof: bool,
        bot: bool,
    ) -> Result<usize, TapeError> {
        let mut writer = SectorWriter::new(&self.config, &self.codec, &mut self.staging);
        let info = SectorInfo::new(number, data.len(), eof, self.file_id);
        writer.prepare(&info, data)?;
        writer.emit(sink, bot)
    }

    /// Read sectors from `source` on the calling thread until an end of data sector or the end of
    /// the source.
    pub fn read_sectors<S, O>(&mut self, source: &mut S, mut observer: O) -> ReadReport
    where
        S: BitSource + ?Sized,
        O: FnMut(&ReaderMessage),
    {
        let mut buffers = self.buffers.take().unwrap_or_default();
        let mut cdr = ClockRecovery::new(&self.config);

        let assembler = StreamAssembler::new(|msg| observer(&msg));
        let mut reader = SectorReader::new(&self.config, &self.codec, &mut buffers, assembler);
        reader.run(&mut cdr, source);

        let mut report = reader.into_events().report;
        report.stats = cdr.stats();
        self.buffers = Some(buffers);
        report
    }

    /// Read sectors from `source` on a reader thread. `observer` is called on the calling thread
    /// with every reader message, in order, ending with [ReaderMessage::Terminate].
    ///
    /// Cancelling `cancel` ends the read at the next sample. A sector in progress is abandoned.
    pub fn read_stream<S, O>(&mut self, source: S, cancel: &CancelToken, mut observer: O) -> Result<ReadReport, TapeError>
    where
        S: BitSource + Send + 'static,
        O: FnMut(&ReaderMessage),
    {
        let (sender, receiver) = crossbeam_channel::bounded::<ReaderMessage>(MESSAGE_QUEUE_LEN);
        let mut buffers = self.buffers.take().unwrap_or_default();
        let config = self.config;
        let codec = self.codec.clone();
        let mut source = CancellableSource::new(source, cancel.clone());

        let handle = std::thread::Builder::new()
            .name("tape-reader".to_string())
            .spawn(move || {
                let mut cdr = ClockRecovery::new(&config);
                let assembler = StreamAssembler::new(move |msg| {
                    if sender.send(msg).is_err() {
                        log::warn!("read_stream(): observer channel closed, dropping {:?}", msg);
                    }
                });
                let mut reader = SectorReader::new(&config, &codec, &mut buffers, assembler);
                reader.run(&mut cdr, &mut source);

                let mut report = reader.into_events().report;
                report.stats = cdr.stats();
                (report, buffers)
            })?;

        let mut cancel_seen = false;
        loop {
            match receiver.recv_timeout(CONTROL_POLL_INTERVAL) {
                Ok(msg) => {
                    observer(&msg);
                    if msg == ReaderMessage::Terminate {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() && !cancel_seen {
                        log::debug!("read_stream(): cancellation requested, waiting for reader");
                        cancel_seen = true;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("read_stream(): reader thread hung up without terminating");
                    break;
                }
            }
        }

        match handle.join() {
            Ok((mut report, buffers)) => {
                self.buffers = Some(buffers);
                report.cancelled = cancel.is_cancelled();
                log::debug!(
                    "read_stream(): {} sectors, {} bytes, terminated: {} cancelled: {}",
                    report.sectors.len(),
                    report.data.len(),
                    report.terminated,
                    report.cancelled
                );
                Ok(report)
            }
            Err(_) => {
                log::error!("read_stream(): reader thread panicked");
                Err(TapeError::ReaderThreadError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{TapePlayback, TapeRecorder},
        types::LineCode,
    };

    fn record(session: &mut ChannelSession, data: &[u8]) -> TapePlayback {
        let mut recorder = TapeRecorder::new(session.config());
        session.write_stream(&mut recorder, data, "unit").unwrap();
        TapePlayback::new(recorder.finish())
    }

    #[test]
    fn stream_splits_into_sectors() {
        let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
        let mut words: Vec<u32> = Vec::new();
        let data = vec![0x5A; SECTOR_CAPACITY * 2 + 1];
        let report = session.write_stream(&mut words, &data, "split").unwrap();

        assert_eq!(report.sectors, 3);
        assert_eq!(report.bytes, data.len());
        assert_eq!(report.words, words.len());
        // 1024 word BOT leader, then 8 + 1 + 3 + 8 + 1 + 510 + 8 words per sector
        assert_eq!(words.len(), 1024 + 3 * 539);
    }

    #[test]
    fn empty_stream_is_one_sector() {
        let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
        let mut words: Vec<u32> = Vec::new();
        let report = session.write_stream(&mut words, &[], "empty").unwrap();
        assert_eq!(report.sectors, 1);

        let mut source = record(&mut session, &[]);
        let read = session.read_sectors(&mut source, |_| {});
        assert!(read.is_complete());
        assert!(read.data.is_empty());
        assert_eq!(read.file_id.as_deref(), Some("unit"));
    }

    #[test]
    fn oversized_stream_is_rejected() {
        let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
        let mut words: Vec<u32> = Vec::new();
        let data = vec![0; SECTOR_CAPACITY * 0x4000 + 1];
        assert!(matches!(
            session.write_stream(&mut words, &data, "big"),
            Err(TapeError::StreamTooLong(_))
        ));
        assert!(words.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ChannelSession::new(ChannelConfig::default().with_bit_width(0)).is_err());
    }

    #[test]
    fn synchronous_read_both_codes() {
        for code in [LineCode::Fm, LineCode::Mfm] {
            let mut session = ChannelSession::new(ChannelConfig::default().with_line_code(code)).unwrap();
            let data: Vec<u8> = (0..2000u32).map(|i| (i ^ (i >> 3)) as u8).collect();
            let mut source = record(&mut session, &data);

            let mut messages = Vec::new();
            let report = session.read_sectors(&mut source, |m| messages.push(*m));
            assert_eq!(report.data, data, "{}", code);
            assert!(report.is_complete());
            assert_eq!(
                messages,
                vec![
                    ReaderMessage::SectorFound(Some(0)),
                    ReaderMessage::SectorDone(Some(0), 0),
                    ReaderMessage::SectorFound(Some(1)),
                    ReaderMessage::SectorDone(Some(1), 0),
                    ReaderMessage::SectorFound(Some(2)),
                    ReaderMessage::SectorDone(Some(2), 0),
                    ReaderMessage::Terminate,
                ]
            );
        }
    }

    #[test]
    fn threaded_read() {
        let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
        let source = record(&mut session, b"threaded");
        let mut count = 0;
        let report = session
            .read_stream(source, &CancelToken::new(), |_| count += 1)
            .unwrap();
        assert_eq!(report.data, b"threaded");
        assert!(report.terminated);
        assert!(!report.cancelled);
        assert_eq!(count, 3);
        assert!(report.stats.bits > 0);
    }

    #[test]
    fn cancelled_read() {
        let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
        let source = record(&mut session, b"never read");
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut messages = Vec::new();
        let report = session.read_stream(source, &cancel, |m| messages.push(*m)).unwrap();
        assert!(report.cancelled);
        assert!(!report.terminated);
        assert!(report.data.is_empty());
        assert_eq!(messages, vec![ReaderMessage::Terminate]);
        assert_eq!(report.stats.samples, 0);
    }

    #[test]
    fn rewritten_sector_is_out_of_sequence() {
        let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
        session.set_file_id("rw");
        let mut recorder = TapeRecorder::new(session.config());
        session.write_sector(&mut recorder, 0, b"first", false, true).unwrap();
        session.write_sector(&mut recorder, 2, b"third", true, false).unwrap();

        let mut source = TapePlayback::new(recorder.finish());
        let report = session.read_sectors(&mut source, |_| {});
        assert_eq!(report.data, b"firstthird");
        assert!(report.terminated);
        assert!(!report.sectors[0].out_of_sequence);
        assert!(report.sectors[1].out_of_sequence);
        assert!(!report.is_complete());
    }
}
