//! End-to-end tests over captured RP66V1 record payloads: one CHANNEL EFLR,
//! one FRAME EFLR and eight FDATA IFLRs from an MWD directional survey.

use dliscan_core::constants::{LR_TYPE_CHANNEL, LR_TYPE_FDATA, LR_TYPE_FRAME};
use dliscan_core::eflr::ExplicitlyFormattedLogicalRecord;
use dliscan_core::iflr::IndirectlyFormattedLogicalRecord;
use dliscan_core::logical_data::LogicalData;
use dliscan_core::logpass::LogPass;
use dliscan_core::repcode::{ObjectName, RC_FSINGL};
use dliscan_core::framing::RecordReader;
use std::io::Cursor;

const EFLR_CHANNEL: &[u8] = b"\xf8\x07CHANNEL\x0259<\x09LONG-NAME\x00\x14<\x0aPROPERTIES\x00\x14<\x13REPRESENTATION-CODE\x00\x0e<\x05UNITS\x00\x14<\x09DIMENSION\x00\x0e<\x04AXIS\x00\x17<\x0dELEMENT-LIMIT\x00\x0e<\x06SOURCE\x00\x18<\x09RELOG-NUM\x00\x0ep\x0b\x00\x04DEPT)\x01\x1aMWD Tool Measurement Depth\x00)\x01\x00\x00\x00\x02)\x01\x060.1 in)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x03INC)\x01\x0bInclination\x00)\x01\x00\x00\x00\x02)\x01\x03deg)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x03AZI)\x01\x07Azimuth\x00)\x01\x00\x00\x00\x02)\x01\x03deg)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x05MTTVD)\x01\x18MWD Tool Measurement TVD\x00)\x01\x00\x00\x00\x02)\x01\x01m)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x04SECT)\x01\x07Section\x00)\x01\x00\x00\x00\x02)\x01\x01m)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x03RCN)\x01\x1eRectangular Co-ordinates North\x00)\x01\x00\x00\x00\x02)\x01\x01m)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x03RCE)\x01\x1dRectangular Co-ordinates East\x00)\x01\x00\x00\x00\x02)\x01\x01m)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x05DLSEV)\x01\x10Dog-leg Severity\x00)\x01\x00\x00\x00\x02)\x01\x07deg/30m)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00p\x0b\x00\x04TLTS)\x01\x17Tool Temperature Static\x00)\x01\x00\x00\x00\x02)\x01\x04degC)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x01\x00)\x01\x00\x00\x00\x00";

const EFLR_FRAME: &[u8] = b"\xf8\x05FRAME\x0260<\x0bDESCRIPTION\x00\x14<\x08CHANNELS\x00\x17<\x0aINDEX-TYPE\x00\x14<\x09DIRECTION\x00\x14>\x07SPACING\x00\x02\x060.1 in<\x09ENCRYPTED\x00\x0e>\x09INDEX-MIN\x00\x02\x060.1 in>\x09INDEX-MAX\x00\x02\x060.1 inp\x0b\x00\x020B\x00)\x09\x0b\x00\x04DEPT\x0b\x00\x03INC\x0b\x00\x03AZI\x0b\x00\x05MTTVD\x0b\x00\x04SECT\x0b\x00\x03RCN\x0b\x00\x03RCE\x0b\x00\x05DLSEV\x0b\x00\x04TLTS)\x01\x0eBOREHOLE-DEPTH\x00+\x01\x060.1 in\x00\x00\x00\x00)\x01\x00\x00\x00\x00+\x01\x060.1 in\x00\x00\x00\x00+\x01\x060.1 inILJ\xb0";

const IFLR_FRAMES: [&[u8]; 8] = [
    b"\x0b\x00\x020B\x02G\x92\xde\x80?\x00\x01T\x00\x00\x00\x00C>\xffa?U[6?U[6\x00\x00\x00\x00=\xa1\xee\x7f\xc4y\xd0\x00",
    b"\x0b\x00\x020B\x03H\x17\x19\x00?\x00\x01T\x00\x00\x00\x00C\xc4~\xb4@&)\x0b@&)\x0b\x00\x00\x00\x00\x00\x00\x00\x00\xc4y\xd0\x00",
    b"\x0b\x00\x020B\x04He\x1b\x80?@\x00\x1d\x00\x00\x00\x00D\x14\xf8,@\x99\xe7\xc9@\x99\xe7\xc9\x00\x00\x00\x00=\x1a\xe4!\xc4y\xd0\x00",
    b"\x0b\x00\x020B\x05H\x97\xde\x00?\x00\x01T\x00\x00\x00\x00DE}\xd2@\xdd\xa8\xac@\xdd\xa8\xac\x00\x00\x00\x00=\x1a\xe4!\xc4y\xd0\x00",
    b"\x0b\x00\x020B\x06H\xba\x15\xc0?\x7f\xfe\xe7\x00\x00\x00\x00Dq\xfc\xcfA\x14\x1b\xccA\x14\x1b\xcc\x00\x00\x00\x00=\xac~\x0d\xc4y\xd0\x00",
    b"\x0b\x00\x020B\x07H\xbc\xe2\xe0?xQ\xe8CHp\xa4Du\xa1=A\x14K8A\x14K8\xbd0mP@\x7fp7BI\x93&",
    b"\x0b\x00\x020B\x08H\xd1\x14 ?xQ\xe8CMs3D\x87\xf1k@\xf4<\xb8@\xf4<\xb8\xbf<R\xf8<\xc5\"XBa\xabQ",
    b"\x0b\x00\x020B\x09H\xda\x9d\x00?33/CN.\x14D\x8e$s@\xdfg\xc3@\xdfg\xc3\xbf\x86]}>'6FBi\xb3h",
];

const DEPT_VALUES: [f64; 8] = [
    75197.0, 154724.0, 234606.0, 311024.0, 381102.0, 386839.0, 428193.0, 447720.0,
];

const CHANNEL_NAMES: [&[u8]; 9] = [
    b"DEPT", b"INC", b"AZI", b"MTTVD", b"SECT", b"RCN", b"RCE", b"DLSEV", b"TLTS",
];

fn parse_channel_eflr() -> ExplicitlyFormattedLogicalRecord {
    let mut ld = LogicalData::from_slice(EFLR_CHANNEL);
    ExplicitlyFormattedLogicalRecord::parse(LR_TYPE_CHANNEL, &mut ld).unwrap()
}

fn parse_frame_eflr() -> ExplicitlyFormattedLogicalRecord {
    let mut ld = LogicalData::from_slice(EFLR_FRAME);
    ExplicitlyFormattedLogicalRecord::parse(LR_TYPE_FRAME, &mut ld).unwrap()
}

fn frame_name() -> ObjectName {
    ObjectName::new(11, 0, b"0B")
}

#[test]
fn test_channel_eflr_parses() {
    let eflr = parse_channel_eflr();
    assert_eq!(eflr.set.set_type.as_ref(), b"CHANNEL");
    assert_eq!(eflr.set.name.as_deref(), Some(b"59".as_ref()));
    assert_eq!(eflr.template.len(), 9);
    assert_eq!(eflr.len(), 9);
    for (object, name) in eflr.objects().iter().zip(CHANNEL_NAMES) {
        assert_eq!(object.name.identifier, name);
        assert_eq!(object.name.origin, 11);
    }
    let dept = ObjectName::new(11, 0, b"DEPT");
    let long_name = eflr.attribute(&dept, b"LONG-NAME").unwrap();
    assert_eq!(
        long_name.scalar().unwrap().as_bytes().unwrap().as_ref(),
        b"MWD Tool Measurement Depth"
    );
    let rep_code = eflr.attribute(&dept, b"REPRESENTATION-CODE").unwrap();
    assert_eq!(rep_code.scalar().unwrap().as_u64(), Some(u64::from(RC_FSINGL)));
    // PROPERTIES is marked absent on every channel object.
    assert!(eflr.attribute(&dept, b"PROPERTIES").is_none());
}

#[test]
fn test_frame_eflr_parses() {
    let eflr = parse_frame_eflr();
    assert_eq!(eflr.set.set_type.as_ref(), b"FRAME");
    assert_eq!(eflr.template.len(), 8);
    assert_eq!(eflr.len(), 1);
    let channels = eflr.attribute(&frame_name(), b"CHANNELS").unwrap();
    assert_eq!(channels.count, 9);
    assert_eq!(channels.values.len(), 9);
    let index_type = eflr.attribute(&frame_name(), b"INDEX-TYPE").unwrap();
    assert_eq!(
        index_type.scalar().unwrap().as_bytes().unwrap().as_ref(),
        b"BOREHOLE-DEPTH"
    );
}

#[test]
fn test_log_pass_reads_all_frames() {
    let mut log_pass = LogPass::from_eflrs(&parse_frame_eflr(), &parse_channel_eflr()).unwrap();
    assert_eq!(log_pass.len(), 1);
    log_pass
        .frame_array_mut(&frame_name())
        .unwrap()
        .init_arrays(IFLR_FRAMES.len());
    for (i, payload) in IFLR_FRAMES.iter().enumerate() {
        let mut ld = LogicalData::from_slice(payload);
        let iflr = IndirectlyFormattedLogicalRecord::parse(&mut ld).unwrap();
        assert_eq!(iflr.object_name, frame_name());
        assert_eq!(iflr.frame_number as usize, i + 2);
        log_pass.read_iflr(&iflr, &mut ld).unwrap();
        assert_eq!(ld.remaining(), 0);
    }
    let array = log_pass.frame_array(&frame_name()).unwrap();
    assert_eq!(array.frames_read(), 8);
    let dept = &array.channels()[0];
    assert_eq!(dept.long_name.as_ref(), b"MWD Tool Measurement Depth");
    assert_eq!(dept.units.as_ref(), b"0.1 in");
    assert_eq!(dept.array.as_floats(), Some(&DEPT_VALUES[..]));
    // Static temperature reads as the producer's absent value until the
    // sensor comes online in frame 7.
    let tlts = array.channel(&ObjectName::new(11, 0, b"TLTS")).unwrap();
    assert_eq!(tlts.array.value_f64(0), Some(-999.25));
}

#[test]
fn test_partial_read_populates_only_requested_channels() {
    let mut log_pass = LogPass::from_eflrs(&parse_frame_eflr(), &parse_channel_eflr()).unwrap();
    let array = log_pass.frame_array_mut(&frame_name()).unwrap();
    array.init_arrays(IFLR_FRAMES.len());
    let wanted = vec![ObjectName::new(11, 0, b"INC")];
    for payload in IFLR_FRAMES {
        let mut ld = LogicalData::from_slice(payload);
        IndirectlyFormattedLogicalRecord::parse(&mut ld).unwrap();
        array.read_frame_partial(&mut ld, &wanted).unwrap();
        // Skipped channels still advance the cursor over their bytes.
        assert_eq!(ld.remaining(), 0);
    }
    assert_eq!(array.channels()[0].array.len(), 8); // index always kept
    assert_eq!(array.channels()[1].array.len(), 8); // INC requested
    for channel in &array.channels()[2..] {
        assert!(channel.array.is_empty());
    }
}

#[test]
fn test_whole_file_pipeline() {
    // Wrap the captured payloads in synthetic framing: a Storage Unit Label,
    // then one Visible Record per Logical Record.
    let mut file = Vec::new();
    file.extend_from_slice(b"   1V1.00RECORD 8192");
    file.extend_from_slice(&[b' '; 60]);
    let mut add_record = |attributes: u8, lr_type: u8, payload: &[u8]| {
        file.extend_from_slice(&((payload.len() + 8) as u16).to_be_bytes());
        file.extend_from_slice(&0xff01u16.to_be_bytes());
        file.extend_from_slice(&((payload.len() + 4) as u16).to_be_bytes());
        file.push(attributes);
        file.push(lr_type);
        file.extend_from_slice(payload);
    };
    add_record(0x80, LR_TYPE_CHANNEL, EFLR_CHANNEL);
    add_record(0x80, LR_TYPE_FRAME, EFLR_FRAME);
    for payload in IFLR_FRAMES {
        add_record(0x00, LR_TYPE_FDATA, payload);
    }

    let reader = RecordReader::new(Cursor::new(file)).unwrap();
    assert_eq!(reader.storage_unit_label().sequence_number, 1);

    let mut channel_eflr = None;
    let mut frame_eflr = None;
    let mut iflrs = Vec::new();
    for record in reader {
        let mut record = record.unwrap();
        match (record.is_eflr, record.lr_type) {
            (true, LR_TYPE_CHANNEL) => {
                channel_eflr = Some(
                    ExplicitlyFormattedLogicalRecord::parse(record.lr_type, &mut record.data)
                        .unwrap(),
                );
            }
            (true, LR_TYPE_FRAME) => {
                frame_eflr = Some(
                    ExplicitlyFormattedLogicalRecord::parse(record.lr_type, &mut record.data)
                        .unwrap(),
                );
            }
            (false, LR_TYPE_FDATA) => iflrs.push(record.data),
            other => panic!("unexpected record {other:?}"),
        }
    }
    assert_eq!(iflrs.len(), 8);

    let mut log_pass = LogPass::from_eflrs(&frame_eflr.unwrap(), &channel_eflr.unwrap()).unwrap();
    log_pass
        .frame_array_mut(&frame_name())
        .unwrap()
        .init_arrays(iflrs.len());
    for mut ld in iflrs {
        let iflr = IndirectlyFormattedLogicalRecord::parse(&mut ld).unwrap();
        log_pass.read_iflr(&iflr, &mut ld).unwrap();
    }
    let array = log_pass.frame_array(&frame_name()).unwrap();
    assert_eq!(array.channels()[0].array.as_floats(), Some(&DEPT_VALUES[..]));
}
