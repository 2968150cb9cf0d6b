mod common;

use common::*;
use fluxtape::{
    fec::CHUNK_LEN,
    framing::{file_id_from_str, SectorWriter, SECTOR_CAPACITY, SECTOR_RAW_LEN},
    prelude::*,
    ChunkCodec,
    ClockRecovery,
    SectorInfo,
    SectorReader,
};

/// Write one sector to a simulated tape, letting `tamper` modify the staged bytes first.
fn record_sector<T: FnOnce(&mut [u8])>(config: &ChannelConfig, info: &SectorInfo, data: &[u8], tamper: T) -> TapeImage {
    let codec = ChunkCodec::new();
    let mut staging = vec![0u8; SECTOR_RAW_LEN];
    let mut recorder = TapeRecorder::new(config);

    let mut writer = SectorWriter::new(config, &codec, &mut staging);
    writer.prepare(info, data).unwrap();
    tamper(writer.staged_mut());
    writer.emit(&mut recorder, true).unwrap();
    recorder.finish()
}

fn read_messages(config: &ChannelConfig, tape: TapeImage) -> Vec<ReaderMessage> {
    let codec = ChunkCodec::new();
    let mut buffers = fluxtape::SectorBuffers::new();
    let mut cdr = ClockRecovery::new(config);
    let mut source = TapePlayback::new(tape);

    let mut reader = SectorReader::new(config, &codec, &mut buffers, Vec::new());
    reader.run(&mut cdr, &mut source);
    reader.into_events()
}

#[test]
fn test_corrected_sector() {
    init();
    let mut rng = seeded_rng(0x48454C4C4F);

    for code in [LineCode::Mfm, LineCode::Fm] {
        let config = ChannelConfig::default().with_line_code(code);
        let info = SectorInfo::new(0, 5, false, file_id_from_str("hello"));
        let tape = record_sector(&config, &info, b"HELLO", |staged| corrupt_chunks(staged, 4, &mut rng));

        let messages = read_messages(&config, tape);
        assert_eq!(
            messages,
            vec![
                ReaderMessage::SectorFound(Some(0)),
                ReaderMessage::SectorDone(Some(0), 16),
                ReaderMessage::Terminate,
            ],
            "{}",
            code
        );
    }
}

#[test]
fn test_corrected_sector_payload() {
    init();
    let mut rng = seeded_rng(5);
    let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
    let mut recorder = TapeRecorder::new(session.config());
    session
        .write_stream_with(&mut recorder, b"HELLO", "hello", |_, staged| {
            corrupt_chunks(staged, 4, &mut rng)
        })
        .unwrap();

    let mut source = TapePlayback::new(recorder.finish());
    let report = session.read_sectors(&mut source, |_| {});
    assert_eq!(report.data, b"HELLO");
    assert_eq!(report.file_id.as_deref(), Some("hello"));
    assert_eq!(report.corrected_bytes(), 16);
    assert!(report.sectors[0]
        .chunks
        .iter()
        .all(|c| *c == ChunkStatus::Corrected(4)));
}

#[test]
fn test_three_sector_stream() {
    init();
    let payload = random_payload(2500, 3);
    let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
    let mut recorder = TapeRecorder::new(session.config());
    session.write_stream(&mut recorder, &payload, "three").unwrap();

    // Anything after the end of data sector must never be read.
    session.write_sector(&mut recorder, 3, b"after eof", false, false).unwrap();

    let mut messages = Vec::new();
    let mut source = TapePlayback::new(recorder.finish());
    let report = session.read_sectors(&mut source, |m| messages.push(*m));

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
    assert!(report.terminated);
    assert!(report.is_complete());
    assert_eq!(compute_slice_hash(&report.data), compute_slice_hash(&payload));
    assert!(source.position() < source.image().len());
}

#[test]
fn test_uncorrectable_chunk() {
    init();
    let mut rng = seeded_rng(17);
    let config = ChannelConfig::default();
    let info = SectorInfo::new(0, 5, true, file_id_from_str("hello"));
    let tape = record_sector(&config, &info, b"HELLO", |staged| {
        corrupt_chunks(&mut staged[CHUNK_LEN..2 * CHUNK_LEN], 20, &mut rng)
    });

    let messages = read_messages(&config, tape);
    assert_eq!(messages[0], ReaderMessage::SectorFound(Some(0)));
    assert_eq!(messages[1], ReaderMessage::SectorError(Some(0), 1));
    assert!(!messages
        .iter()
        .any(|m| matches!(m, ReaderMessage::SectorDone(..))));
}

#[test]
fn test_uncorrectable_sector_is_not_assembled() {
    init();
    let mut rng = seeded_rng(23);
    let payload = random_payload(1800, 9);
    let mut session = ChannelSession::new(ChannelConfig::default()).unwrap();
    let mut recorder = TapeRecorder::new(session.config());
    session
        .write_stream_with(&mut recorder, &payload, "bad", |number, staged| {
            if number == 1 {
                corrupt_chunks(staged, 17, &mut rng);
            }
        })
        .unwrap();

    let mut source = TapePlayback::new(recorder.finish());
    let report = session.read_sectors(&mut source, |_| {});

    assert_eq!(report.sectors.len(), 3);
    assert!(report.sectors[0].ok);
    assert!(!report.sectors[1].ok);
    assert_eq!(report.sectors[1].failed_chunks, 4);
    assert!(report.sectors[2].ok);
    // The unreadable sector still accounts for number 1.
    assert_eq!(report.sectors[1].number, Some(1));
    assert!(!report.sectors[2].out_of_sequence);
    assert!(report.terminated);
    assert_eq!(report.bad_sectors(), 1);

    let mut expected = payload[..SECTOR_CAPACITY].to_vec();
    expected.extend_from_slice(&payload[2 * SECTOR_CAPACITY..]);
    assert_eq!(report.data, expected);
}
