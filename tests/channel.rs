mod common;

use std::io::Cursor;

use common::*;
use fluxtape::{framing::SECTOR_CAPACITY, prelude::*, BitSource};

#[test]
fn test_lock_with_jitter_and_speed_error() {
    init();
    let payload = random_payload(SECTOR_CAPACITY + 100, 1);

    for code in [LineCode::Mfm, LineCode::Fm] {
        for speed in [0.98, 1.0, 1.02] {
            for seed in [1, 2] {
                let mut session = ChannelSession::new(ChannelConfig::default().with_line_code(code)).unwrap();
                let impairments = Impairments::default().with_jitter(1.0).with_speed(speed).with_seed(seed);
                let tape = record_stream(&mut session, &payload, impairments);

                let report = session.read_sectors(&mut TapePlayback::new(tape), |_| {});
                assert_eq!(report.sectors.len(), 2, "{} speed {} seed {}", code, speed, seed);
                assert!(report.is_complete(), "{} speed {} seed {}", code, speed, seed);
                assert_eq!(report.corrected_bytes(), 0, "{} speed {} seed {}", code, speed, seed);
                assert_eq!(report.data, payload);
            }
        }
    }
}

#[test]
fn test_dropout_is_corrected() {
    init();
    let payload = random_payload(600, 2);
    let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();

    // 1024 words of leader, then 21 words of sector preamble before the data.
    let data_start_cell = (1024 + 21) * 32;
    let impairments = Impairments::default().with_dropout(data_start_cell + 100 * 32, 160);
    let tape = record_stream(&mut session, &payload, impairments);

    let report = session.read_sectors(&mut TapePlayback::new(tape), |_| {});
    assert!(report.is_complete());
    assert!(report.corrected_bytes() > 0);
    assert!(report.corrected_bytes() <= 16);
    assert_eq!(report.data, payload);
}

#[test]
fn test_tape_image_save_and_load() {
    init();
    let payload = random_payload(1000, 3);
    let mut session = ChannelSession::new(ChannelConfig::default().with_line_code(LineCode::Fm)).unwrap();
    let tape = record_stream(&mut session, &payload, Impairments::default().with_jitter(0.5));

    let mut file = Cursor::new(Vec::new());
    tape.write(&mut file).unwrap();
    file.set_position(0);
    assert!(TapeImage::detect(&mut file));
    file.set_position(0);

    let loaded = TapeImage::read(&mut file).unwrap();
    assert_eq!(loaded, tape);
    assert_eq!(loaded.line_code, LineCode::Fm);

    let report = session.read_sectors(&mut TapePlayback::new(loaded), |_| {});
    assert_eq!(compute_slice_hash(&report.data), compute_slice_hash(&payload));
}

/// Plays a tape and cancels the read after a fixed number of samples.
struct CancelAfter {
    playback: TapePlayback,
    token: CancelToken,
    remaining: usize,
}

impl BitSource for CancelAfter {
    fn next_bit(&mut self) -> Option<bool> {
        match self.remaining.checked_sub(1) {
            Some(r) => self.remaining = r,
            None => self.token.cancel(),
        }
        self.playback.next_bit()
    }
}

#[test]
fn test_threaded_read_with_impairments() {
    init();
    let payload = random_payload(3000, 4);
    let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
    let tape = record_stream(
        &mut session,
        &payload,
        Impairments::default().with_jitter(1.0).with_speed(1.01).with_seed(11),
    );

    let mut messages = Vec::new();
    let report = session
        .read_stream(TapePlayback::new(tape), &CancelToken::new(), |m| messages.push(*m))
        .unwrap();

    assert_eq!(report.data, payload);
    assert!(report.terminated);
    assert_eq!(messages.len(), 4 * 2 + 1);
    assert_eq!(messages.last(), Some(&ReaderMessage::Terminate));
}

#[test]
fn test_cancel_mid_stream() {
    init();
    let payload = random_payload(SECTOR_CAPACITY * 4, 5);
    let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
    let tape = record_stream(&mut session, &payload, Impairments::default());

    // Enough samples for the leader and the first sector, not for the whole stream.
    let cancel = CancelToken::new();
    let source = CancelAfter {
        playback: TapePlayback::new(tape),
        token: cancel.clone(),
        remaining: (1024 + 539 + 100) * 32 * 8,
    };

    let mut messages = Vec::new();
    let report = session.read_stream(source, &cancel, |m| messages.push(*m)).unwrap();

    assert!(report.cancelled);
    assert!(!report.terminated);
    assert_eq!(report.sectors.len(), 1);
    assert_eq!(report.data, &payload[..SECTOR_CAPACITY]);
    assert_eq!(
        messages,
        vec![
            ReaderMessage::SectorFound(Some(0)),
            ReaderMessage::SectorDone(Some(0), 0),
            ReaderMessage::SectorFound(Some(1)),
            ReaderMessage::Terminate,
        ]
    );

    // The session's buffers came back from the reader thread; it can read again.
    let tape = record_stream(&mut session, b"again", Impairments::default());
    let report = session.read_stream(TapePlayback::new(tape), &CancelToken::new(), |_| {}).unwrap();
    assert_eq!(report.data, b"again");
}
