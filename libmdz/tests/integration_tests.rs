//! Records through the `.npz` container and back.

use libmdz::{
    encode, encode_npy, encode_stages, version, CodecConfig, CoefficientMatrix, Dtype, Error,
    NpyArray, Precision, Reader, Record, Waveform, Writer,
};
use std::io::Cursor;

fn test_wave(channels: usize) -> Waveform {
    let frames = 6000;
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        for ch in 0..channels {
            samples.push(((i as f64) * 0.01 * (ch + 1) as f64).sin() * 0.5);
        }
    }
    Waveform::new(samples, 44100, channels).unwrap()
}

fn archive(arrays: &[(&str, NpyArray)]) -> Vec<u8> {
    Writer::new()
        .write_arrays(arrays, Cursor::new(Vec::new()))
        .unwrap()
        .into_inner()
}

// ============================================================================
// Version Tests
// ============================================================================

#[test]
fn test_version() {
    assert_eq!(version(), "1.0");
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song4.npz");

    let record = encode(&test_wave(1), &CodecConfig::default()).unwrap();
    Writer::new().save(&record, &path).unwrap();
    let loaded = Reader::new().load(&path).unwrap();

    assert_eq!(loaded.rate, record.rate);
    assert_eq!(loaded.length, record.length);
    assert_eq!(loaded.data.shape(), record.data.shape());
    assert_eq!(loaded.data.precision(), Precision::Half);
    assert_eq!(loaded.data.values(), record.data.values());
}

#[test]
fn test_every_stage_round_trips() {
    let records = encode_stages(&test_wave(2), &CodecConfig::default()).unwrap();
    let writer = Writer::new();
    let reader = Reader::new();

    for record in &records {
        let bytes = writer.to_bytes(record).unwrap();
        let back = reader.read(&bytes).unwrap();
        assert_eq!(&back, record);
    }
}

#[test]
fn test_stored_dtypes() {
    let records = encode_stages(&test_wave(1), &CodecConfig::default()).unwrap();
    let writer = Writer::new();
    let reader = Reader::new();

    let dtype_of = |record: &Record| {
        let bytes = writer.to_bytes(record).unwrap();
        let arrays = reader.read_arrays(Cursor::new(bytes)).unwrap();
        let (_, data) = arrays.into_iter().find(|(name, _)| name == "data").unwrap();
        data.dtype
    };

    assert_eq!(dtype_of(&records[0]), Dtype::F8);
    assert_eq!(dtype_of(&records[4]), Dtype::F2);
}

#[test]
fn test_members_match_numpy_layout() {
    let record = encode(&test_wave(1), &CodecConfig::default()).unwrap();
    let bytes = Writer::new().to_bytes(&record).unwrap();
    let arrays = Reader::new().read_arrays(Cursor::new(bytes)).unwrap();

    let names: Vec<&str> = arrays.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["rate", "data", "length"]);

    let (_, rate) = &arrays[0];
    assert_eq!(rate.dtype, Dtype::I8);
    assert!(rate.shape.is_empty());
    assert_eq!(rate.scalar().unwrap(), 44100.0);

    let (_, data) = &arrays[1];
    assert_eq!(data.shape, vec![256, 25]);
}

#[test]
fn test_record_without_length() {
    let data = CoefficientMatrix::from_vec(2, 2, 1, vec![0.5, 0.0, -0.25, 1.0], Precision::Double)
        .unwrap();
    let record = Record::new(8000, data);

    let bytes = Writer::new().to_bytes(&record).unwrap();
    let back = Reader::new().read(&bytes).unwrap();
    assert_eq!(back.length, None);
    assert_eq!(back, record);
}

#[test]
fn test_uncompressed_archive_reads() {
    let record = encode(&test_wave(1), &CodecConfig::default()).unwrap();
    let stored = Writer::stored().to_bytes(&record).unwrap();
    let deflated = Writer::new().to_bytes(&record).unwrap();

    assert_eq!(Reader::new().read(&stored).unwrap(), record);
    // mostly zeros, deflate should win easily
    assert!(deflated.len() < stored.len());
}

#[test]
fn test_reads_integer_coefficients() {
    let bytes = archive(&[
        ("rate", NpyArray::scalar_i64(16000)),
        (
            "data",
            NpyArray::new(Dtype::I2, vec![2, 3], vec![1.0, 0.0, -2.0, 3.0, 0.0, 0.0]).unwrap(),
        ),
    ]);

    let record = Reader::new().read(&bytes).unwrap();
    assert_eq!(record.rate, 16000);
    assert_eq!(record.data.shape(), vec![2, 3]);
    assert_eq!(record.data.get(1, 0, 0), 3.0);
    assert_eq!(record.data.precision(), Precision::Double);
}

// ============================================================================
// Malformed Records
// ============================================================================

#[test]
fn test_missing_data_field() {
    let bytes = archive(&[("rate", NpyArray::scalar_i64(44100))]);
    assert!(matches!(
        Reader::new().read(&bytes),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn test_missing_rate_field() {
    let data = NpyArray::new(Dtype::F8, vec![2, 2], vec![0.0; 4]).unwrap();
    let bytes = archive(&[("data", data)]);
    assert!(matches!(
        Reader::new().read(&bytes),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn test_wrong_rank() {
    let data = NpyArray::new(Dtype::F8, vec![8], vec![0.0; 8]).unwrap();
    let bytes = archive(&[("rate", NpyArray::scalar_i64(44100)), ("data", data)]);
    assert!(matches!(
        Reader::new().read(&bytes),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn test_bad_rate() {
    let data = NpyArray::new(Dtype::F8, vec![2, 2], vec![0.0; 4]).unwrap();
    for rate in [
        NpyArray::scalar_i64(0),
        NpyArray::new(Dtype::F8, vec![], vec![44100.5]).unwrap(),
        NpyArray::new(Dtype::I8, vec![2], vec![1.0, 2.0]).unwrap(),
    ] {
        let bytes = archive(&[("rate", rate), ("data", data.clone())]);
        assert!(matches!(
            Reader::new().read(&bytes),
            Err(Error::MalformedInput(_))
        ));
    }
}

#[test]
fn test_not_an_archive() {
    let garbage = b"definitely not a zip file".to_vec();
    assert!(matches!(
        Reader::new().read(&garbage),
        Err(Error::Archive(_))
    ));
}

#[test]
fn test_truncated_npy_payload() {
    let array = NpyArray::new(Dtype::F4, vec![4, 4], vec![1.0; 16]).unwrap();
    let mut bytes = encode_npy(&array);
    bytes.truncate(bytes.len() - 3);

    assert!(matches!(
        Reader::new().parse_npy(&bytes),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn test_npy_bad_magic() {
    let mut bytes = encode_npy(&NpyArray::scalar_i64(1));
    bytes[1] = b'X';
    assert!(Reader::new().parse_npy(&bytes).is_err());
}

#[test]
fn test_npy_version_two_header() {
    let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (2,), }\n";
    let mut bytes = vec![0x93, b'N', b'U', b'M', b'P', b'Y', 2, 0];
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&1.5f64.to_le_bytes());
    bytes.extend_from_slice(&(-2.0f64).to_le_bytes());

    let array = Reader::new().parse_npy(&bytes).unwrap();
    assert_eq!(array.shape, vec![2]);
    assert_eq!(array.values, vec![1.5, -2.0]);
}

#[test]
fn test_fortran_order_rejected() {
    let header = "{'descr': '<f8', 'fortran_order': True, 'shape': (1, 2), }\n";
    let mut bytes = vec![0x93, b'N', b'U', b'M', b'P', b'Y', 1, 0];
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&[0u8; 16]);

    assert!(matches!(
        Reader::new().parse_npy(&bytes),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn test_oversized_shape_rejected() {
    let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (4294967296, 4294967296, 2), }\n";
    let mut bytes = vec![0x93, b'N', b'U', b'M', b'P', b'Y', 1, 0];
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());

    assert!(matches!(
        Reader::new().parse_npy(&bytes),
        Err(Error::MalformedInput(_))
    ));
    assert!(matches!(
        NpyArray::new(Dtype::F8, vec![4294967296, 4294967296, 2], Vec::new()),
        Err(Error::MalformedInput(_))
    ));
    assert!(matches!(
        CoefficientMatrix::from_vec(4294967296, 4294967296, 2, Vec::new(), Precision::Double),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn test_empty_dimension_rejected() {
    let data = NpyArray::new(Dtype::F8, vec![usize::MAX / 2 + 1, 0], Vec::new()).unwrap();
    let bytes = archive(&[("rate", NpyArray::scalar_i64(44100)), ("data", data)]);
    assert!(matches!(
        Reader::new().read(&bytes),
        Err(Error::MalformedInput(_))
    ));
}
