//! Fuzzing placeholder for dliscan-core decoders
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_records

pub fn fuzz_records(data: &[u8]) {
    use dliscan_core::framing::RecordReader;
    use std::io::Cursor;

    // Try to reassemble records - should never panic
    if let Ok(reader) = RecordReader::new(Cursor::new(data.to_vec())) {
        for record in reader.take(256) {
            let _ = record;
        }
    }
}

pub fn fuzz_eflr(data: &[u8]) {
    use dliscan_core::eflr::ExplicitlyFormattedLogicalRecord;
    use dliscan_core::logical_data::LogicalData;

    // Try to parse a schema record - should never panic
    let mut ld = LogicalData::from_slice(data);
    let _ = ExplicitlyFormattedLogicalRecord::parse(0, &mut ld);
}

pub fn fuzz_repcode(data: &[u8]) {
    use dliscan_core::logical_data::LogicalData;
    use dliscan_core::repcode;

    // Try every representation code against the same bytes
    for rep_code in 0..=u8::MAX {
        let mut ld = LogicalData::from_slice(data);
        let _ = repcode::decode(rep_code, &mut ld);
    }
}
