//! Decoder behaviour over realistic table scans

use filedata::chunked::{
    ChunkDecoder, ChunkRecord, ChunkSource, ColumnRecord, Cursor, ReadOutcome, Record, REFS_CF,
};
use filedata::common::SequenceFault;
use filedata::Error;

fn add_ref(data: &mut Vec<Record>, row: &'static str, attr: &str, vis: &str, value: &'static str) {
    data.push(ColumnRecord::new(row, REFS_CF, format!("id\0{}", attr), vis, value).into());
}

fn add_chunk(
    data: &mut Vec<Record>,
    row: &'static str,
    chunk_size: u32,
    sequence: u32,
    vis: &str,
    value: &'static str,
) {
    data.push(ChunkRecord::new(row, chunk_size, sequence, vis, value).into());
}

fn data() -> Vec<Record> {
    let mut data = Vec::new();
    add_ref(&mut data, "a", "ext", "A&B", "ext");
    add_ref(&mut data, "a", "name", "A&B", "name");
    add_chunk(&mut data, "a", 100, 0, "A&B", "asdfjkl;");
    add_chunk(&mut data, "a", 100, 1, "A&B", "");
    add_ref(&mut data, "b", "ext", "A&B", "ext");
    add_ref(&mut data, "b", "name", "A&B", "name");
    add_chunk(&mut data, "b", 100, 0, "A&B", "qwertyuiop");
    add_chunk(&mut data, "b", 100, 0, "B&C", "qwertyuiop");
    add_chunk(&mut data, "b", 100, 1, "A&B", "");
    add_chunk(&mut data, "b", 100, 1, "B&C", "");
    add_chunk(&mut data, "b", 100, 1, "D", "");
    add_chunk(&mut data, "c", 100, 0, "A&B", "asdfjkl;");
    add_chunk(&mut data, "c", 100, 1, "A&B", "asdfjkl;");
    add_chunk(&mut data, "c", 100, 2, "A&B", "");
    add_chunk(&mut data, "d", 100, 0, "A&B", "");
    add_chunk(&mut data, "e", 100, 0, "A&B", "asdfjkl;");
    add_chunk(&mut data, "e", 100, 1, "A&B", "");
    data
}

fn bad_data() -> Vec<Record> {
    let mut data = Vec::new();
    add_chunk(&mut data, "a", 100, 0, "A", "asdfjkl;");
    add_chunk(&mut data, "b", 100, 0, "B", "asdfjkl;");
    add_chunk(&mut data, "b", 100, 2, "C", "");
    add_chunk(&mut data, "c", 100, 0, "D", "asdfjkl;");
    add_chunk(&mut data, "c", 100, 2, "E", "");
    add_chunk(&mut data, "d", 100, 0, "F", "asdfjkl;");
    add_chunk(&mut data, "d", 100, 1, "G", "");
    data.push(ColumnRecord::new("d", "~zzzzz", "colq", "H", "").into());
    add_chunk(&mut data, "e", 100, 0, "I", "asdfjkl;");
    add_chunk(&mut data, "e", 100, 1, "J", "");
    add_chunk(&mut data, "e", 100, 2, "I", "asdfjkl;");
    add_chunk(&mut data, "f", 100, 2, "K", "asdfjkl;");
    add_chunk(&mut data, "g", 100, 0, "L", "");
    data
}

fn multi_data() -> Vec<Record> {
    let mut data = Vec::new();
    add_chunk(&mut data, "a", 100, 0, "A&B", "asdfjkl;");
    add_chunk(&mut data, "a", 100, 1, "A&B", "");
    add_chunk(&mut data, "a", 200, 0, "B&C", "asdfjkl;");
    add_chunk(&mut data, "b", 100, 0, "A&B", "asdfjkl;");
    add_chunk(&mut data, "b", 200, 0, "B&C", "asdfjkl;");
    add_chunk(&mut data, "b", 200, 1, "B&C", "asdfjkl;");
    add_chunk(&mut data, "c", 100, 0, "A&B", "asdfjkl;");
    add_chunk(&mut data, "c", 100, 1, "B&C", "");
    data
}

fn read_str<S: ChunkSource>(decoder: &mut ChunkDecoder<S>, buf: &mut [u8]) -> Option<String> {
    match decoder.read(buf).unwrap() {
        ReadOutcome::Bytes(n) => Some(String::from_utf8(buf[..n].to_vec()).unwrap()),
        ReadOutcome::EndOfStream => None,
    }
}

fn expect_malformed_read<S: ChunkSource>(decoder: &mut ChunkDecoder<S>, buf: &mut [u8]) {
    let err = decoder.read(buf).unwrap_err();
    assert!(
        matches!(err, Error::MalformedChunkSequence { .. }),
        "unexpected error: {err}"
    );
}

fn expect_malformed_close<S: ChunkSource>(decoder: &mut ChunkDecoder<S>) {
    let err = decoder.close().unwrap_err();
    assert!(
        matches!(err, Error::MalformedChunkSequence { .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_attach_twice_without_close() {
    let mut cursor = Cursor::new(data());
    let mut decoder = ChunkDecoder::new(&mut cursor);
    let mut b = [0u8; 5];

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfj"));

    let err = decoder.attach().unwrap_err();
    assert!(matches!(err, Error::AlreadyAttached { ref document } if document == "a"));

    // the open session carries on where it was
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("kl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["A&B"]);
    decoder.close().unwrap();
}

#[test]
fn test_attach_after_end_still_requires_close() {
    let mut decoder = ChunkDecoder::new(Cursor::new(data()));
    let mut b = [0u8; 20];

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfjkl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert!(matches!(
        decoder.attach(),
        Err(Error::AlreadyAttached { .. })
    ));
    decoder.close().unwrap();
    decoder.attach().unwrap();
    assert_eq!(decoder.document_id(), Some(&b"b"[..]));
}

#[test]
fn test_labels_readable_before_drain() {
    let mut decoder = ChunkDecoder::new(Cursor::new(data()));
    let mut b = [0u8; 5];

    decoder.attach().unwrap();
    decoder.close().unwrap();
    decoder.attach().unwrap();
    assert_eq!(decoder.access_labels(), ["A&B"]);

    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("qwert"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("yuiop"));
    assert_eq!(decoder.access_labels(), ["A&B"]);

    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["A&B", "B&C", "D"]);
    decoder.close().unwrap();
    assert_eq!(decoder.access_labels(), ["A&B", "B&C", "D"]);
}

#[test]
fn test_read_into_buffer_smaller_than_chunks() {
    let mut cursor = Cursor::new(data());
    let mut decoder = ChunkDecoder::new(&mut cursor);
    let mut b = [0u8; 5];

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfj"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("kl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("qwert"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("yuiop"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["A&B", "B&C", "D"]);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfj"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("kl;as"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("dfjkl"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some(";"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["A&B"]);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfj"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("kl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();

    drop(decoder);
    assert!(cursor.is_exhausted());
}

#[test]
fn test_read_into_buffer_larger_than_chunks() {
    let mut cursor = Cursor::new(data());
    let mut decoder = ChunkDecoder::new(&mut cursor);
    let mut b = [0u8; 20];

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfjkl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("qwertyuiop"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["A&B", "B&C", "D"]);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(
        read_str(&mut decoder, &mut b).as_deref(),
        Some("asdfjkl;asdfjkl;")
    );
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["A&B"]);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfjkl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();

    drop(decoder);
    assert!(cursor.is_exhausted());
}

#[test]
fn test_buffer_size_independence() {
    let expected = ["asdfjkl;", "qwertyuiop", "asdfjkl;asdfjkl;", "", "asdfjkl;"];

    for size in 1..=24 {
        let mut decoder = ChunkDecoder::new(Cursor::new(data()));
        let mut b = vec![0u8; size];

        for want in expected {
            decoder.attach().unwrap();
            let mut got = String::new();
            while let Some(part) = read_str(&mut decoder, &mut b) {
                assert!(part.len() <= size);
                got.push_str(&part);
            }
            decoder.close().unwrap();
            assert_eq!(got, want, "buffer size {size}");
        }
        assert!(decoder.get_mut().is_exhausted());
    }
}

#[test]
fn test_buffer_size_independence_many_chunks() {
    let content: Vec<u8> = (0..250u32).map(|i| (i * 7 % 251) as u8).collect();
    let chunk_size = 16;

    let mut records = Vec::new();
    let chunks: Vec<&[u8]> = content.chunks(chunk_size).collect();
    for (seq, bytes) in chunks.iter().enumerate() {
        for label in ["private", "public"] {
            records.push(Record::from(ChunkRecord::new(
                "doc",
                chunk_size as u32,
                seq as u32,
                label,
                bytes.to_vec(),
            )));
        }
    }
    for label in ["private", "public", "audit"] {
        records.push(Record::from(ChunkRecord::new(
            "doc",
            chunk_size as u32,
            chunks.len() as u32,
            label,
            "",
        )));
    }

    for size in [1, 3, 15, 16, 17, 64, 249, 250, 251, 4096] {
        let mut decoder = ChunkDecoder::new(Cursor::new(records.clone()));
        decoder.attach().unwrap();

        let mut buf = vec![0u8; size];
        let mut got = Vec::new();
        loop {
            match decoder.read(&mut buf).unwrap() {
                ReadOutcome::Bytes(n) => got.extend_from_slice(&buf[..n]),
                ReadOutcome::EndOfStream => break,
            }
        }
        decoder.close().unwrap();

        assert_eq!(got, content, "buffer size {size}");
        assert_eq!(decoder.access_labels(), ["private", "public", "audit"]);
    }
}

#[test]
fn test_bad_data() {
    let mut cursor = Cursor::new(bad_data());
    let mut decoder = ChunkDecoder::new(&mut cursor);
    let mut b = [0u8; 20];

    // no end marker: the stream just ends, close reports the truncation
    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfjkl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    let err = decoder.close().unwrap_err();
    assert!(matches!(err, Error::IncompleteChunkSequence { ref document } if document == "a"));
    assert_eq!(decoder.access_labels(), ["A"]);

    decoder.attach().unwrap();
    expect_malformed_read(&mut decoder, &mut b);
    expect_malformed_close(&mut decoder);
    // labels survive the fault
    assert_eq!(decoder.access_labels(), ["B", "C"]);

    decoder.attach().unwrap();
    expect_malformed_read(&mut decoder, &mut b);
    expect_malformed_close(&mut decoder);
    assert_eq!(decoder.access_labels(), ["D", "E"]);

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfjkl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["F", "G"]);
    decoder.close().unwrap();

    decoder.attach().unwrap();
    let err = decoder.read(&mut b).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedChunkSequence {
            fault: SequenceFault::ChunkAfterEnd { end: 1, found: 2 },
            ..
        }
    ));
    expect_malformed_close(&mut decoder);
    assert_eq!(decoder.access_labels(), ["I", "J"]);

    let err = decoder.attach().unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedChunkSequence {
            fault: SequenceFault::NonZeroStart { found: 2 },
            ..
        }
    ));
    assert!(matches!(
        decoder.attach(),
        Err(Error::AlreadyAttached { .. })
    ));
    expect_malformed_close(&mut decoder);
    assert_eq!(decoder.access_labels(), ["K"]);

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b), None);
    assert_eq!(decoder.access_labels(), ["L"]);
    decoder.close().unwrap();

    drop(decoder);
    assert!(cursor.is_exhausted());

    let mut decoder = ChunkDecoder::new(Cursor::new(bad_data()));
    decoder.attach().unwrap();
    assert!(matches!(
        decoder.close(),
        Err(Error::IncompleteChunkSequence { .. })
    ));
}

#[test]
fn test_bad_data_closed_without_reading() {
    let mut decoder = ChunkDecoder::new(Cursor::new(bad_data()));
    let mut labels = Vec::new();
    let mut outcomes = Vec::new();

    while !decoder.get_mut().is_exhausted() {
        let attached = decoder.attach();
        let closed = decoder.close();
        outcomes.push(match (attached, closed) {
            (Ok(()), Ok(())) => "ok",
            (_, Err(Error::IncompleteChunkSequence { .. })) => "incomplete",
            (_, Err(Error::MalformedChunkSequence { .. })) => "malformed",
            (_, Err(e)) | (Err(e), Ok(())) => panic!("unexpected error: {e}"),
        });
        labels.push(decoder.access_labels().join(","));
    }

    assert_eq!(
        outcomes,
        ["incomplete", "malformed", "malformed", "ok", "malformed", "malformed", "ok"]
    );
    assert_eq!(labels, ["A", "B,C", "D,E", "F,G", "I,J", "K", "L"]);
}

#[test]
fn test_multiple_chunk_sizes() {
    let mut cursor = Cursor::new(multi_data());
    let mut decoder = ChunkDecoder::new(&mut cursor);
    let mut b = [0u8; 20];

    // a second chunking after the end marker is ignored
    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).map(|s| s.len()), Some(8));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();
    assert_eq!(decoder.access_labels(), ["A&B"]);

    decoder.attach().unwrap();
    let err = decoder.read(&mut b).unwrap_err();
    assert!(matches!(
        err,
        Error::MalformedChunkSequence {
            fault: SequenceFault::ChunkSizeChanged {
                expected: 100,
                found: 200
            },
            ..
        }
    ));
    assert_eq!(decoder.access_labels(), ["A&B"]);
    expect_malformed_close(&mut decoder);

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("asdfjkl;"));
    assert_eq!(read_str(&mut decoder, &mut b), None);
    decoder.close().unwrap();
    assert_eq!(decoder.access_labels(), ["A&B", "B&C"]);

    drop(decoder);
    assert!(cursor.is_exhausted());
}

#[test]
fn test_single_byte_read() {
    let mut decoder = ChunkDecoder::new(Cursor::new(data()));

    decoder.attach().unwrap();
    for expected in b"asdfjkl;" {
        assert_eq!(decoder.read_byte().unwrap(), Some(*expected));
    }
    assert_eq!(decoder.read_byte().unwrap(), None);
    decoder.close().unwrap();
    assert_eq!(decoder.access_labels(), ["A&B"]);
}

#[test]
fn test_missing_chunk_keeps_first_labels() {
    let mut decoder = ChunkDecoder::new(Cursor::from_chunks(vec![
        ChunkRecord::new("x", 4, 0, "A", "abcd"),
        ChunkRecord::new("x", 4, 0, "B", "abcd"),
        ChunkRecord::new("x", 4, 2, "A", ""),
    ]));
    let mut b = [0u8; 2];

    decoder.attach().unwrap();
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("ab"));
    assert_eq!(read_str(&mut decoder, &mut b).as_deref(), Some("cd"));
    expect_malformed_read(&mut decoder, &mut b);
    assert_eq!(decoder.access_labels(), ["A", "B"]);
    expect_malformed_close(&mut decoder);
}

#[test]
fn test_empty_source() {
    let mut decoder = ChunkDecoder::new(Cursor::new(Vec::<Record>::new()));
    let mut b = [0u8; 4];

    decoder.attach().unwrap();
    assert_eq!(decoder.read(&mut b).unwrap(), ReadOutcome::EndOfStream);
    assert!(decoder.access_labels().is_empty());
    decoder.close().unwrap();
}
