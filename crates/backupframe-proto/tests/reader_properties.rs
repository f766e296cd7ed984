//! Property-based tests for record framing and field scanning.
//!
//! Inputs are hostile: every property here must hold for arbitrary bytes,
//! not just for well-formed backups.

use backupframe_proto::{
    DelimitedReader, ProtoError, decode_frame, scan_unknown_fields, unknown,
    varint::{encode_varint, encoded_len},
    write_delimited,
};
use proptest::prelude::*;

proptest! {
    /// The reader never reads past its input and accounts for every byte it
    /// hands out.
    #[test]
    fn reader_offsets_are_consistent(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut reader = DelimitedReader::with_max_record_len(&data, 64);
        let mut consumed = 0usize;

        loop {
            match reader.next_record() {
                Ok(Some(record)) => {
                    prop_assert!(record.len() <= 64);
                    consumed += encoded_len(record.len() as u64) + record.len();
                    prop_assert_eq!(reader.offset(), consumed);
                },
                Ok(None) => {
                    prop_assert_eq!(reader.offset(), data.len());
                    break;
                },
                Err(_) => {
                    prop_assert!(reader.offset() <= data.len());
                    // INVARIANT: exhausted after an error
                    prop_assert_eq!(reader.next_record(), Ok(None));
                    break;
                },
            }
        }
    }

    /// Records written back to back come out unchanged and in order.
    #[test]
    fn written_records_are_read_back(
        records in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..200), 0..16),
    ) {
        let mut buf = Vec::new();
        for record in &records {
            write_delimited(record, &mut buf);
        }

        let read: Vec<&[u8]> =
            DelimitedReader::new(&buf).collect::<Result<_, _>>().expect("well formed");
        prop_assert_eq!(read.len(), records.len());
        for (got, want) in read.iter().zip(&records) {
            prop_assert_eq!(*got, want.as_slice());
        }
    }

    /// Cutting a well-formed stream short is always reported, never silently
    /// accepted as a shorter stream.
    #[test]
    fn truncation_is_detected(
        record in prop::collection::vec(any::<u8>(), 1..200),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut buf = Vec::new();
        write_delimited(&record, &mut buf);
        let cut = cut.index(buf.len() - 1) + 1;
        let truncated = &buf[..buf.len() - cut];

        let result: Result<Vec<&[u8]>, ProtoError> = DelimitedReader::new(truncated).collect();
        prop_assert!(result.is_err());
    }

    /// Scanning arbitrary bytes for unknown fields never panics, and whatever
    /// decodes as a frame also scans.
    #[test]
    fn unknown_field_scan_total(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let scanned = scan_unknown_fields(&data, &unknown::FRAME);
        if decode_frame(&data).is_ok() {
            prop_assert!(scanned.is_ok(), "{:?}", scanned);
        }
    }

    /// An unknown field encoded as a group is a warning, not a decode failure.
    #[test]
    fn unknown_groups_scan_like_they_decode(
        field in 6u32..1000,
        inner in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let mut data = Vec::new();
        encode_varint(u64::from((field << 3) | 3), &mut data);
        // inner field 1, length-delimited
        data.push(0x0a);
        encode_varint(inner.len() as u64, &mut data);
        data.extend_from_slice(&inner);
        encode_varint(u64::from((field << 3) | 4), &mut data);

        prop_assert!(decode_frame(&data).is_ok());
        let scanned = scan_unknown_fields(&data, &unknown::FRAME);
        prop_assert_eq!(scanned.map(|found| found.len()), Ok(1));
    }
}
