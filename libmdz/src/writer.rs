use std::io::{Cursor, Seek, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::{
    Dtype, MdzResult, NpyArray, Record, DATA_FIELD, LENGTH_FIELD, NPY_HEADER_ALIGN, NPY_MAGIC,
    NPY_VERSION, RATE_FIELD,
};

/// writer for `.npz` coefficient records
pub struct Writer {
    compression: CompressionMethod,
}

impl Writer {
    /// new writer, deflate compressed like `savez_compressed`
    pub fn new() -> Self {
        Writer {
            compression: CompressionMethod::Deflated,
        }
    }

    /// members stored without compression, like plain `savez`
    pub fn stored() -> Self {
        Writer {
            compression: CompressionMethod::Stored,
        }
    }

    /// write a record into any seekable sink
    pub fn write_record<W: Write + Seek>(&self, record: &Record, sink: W) -> MdzResult<W> {
        let arrays = self.record_arrays(record)?;
        self.write_arrays(&arrays, sink)
    }

    /// a whole record as `.npz` bytes
    pub fn to_bytes(&self, record: &Record) -> MdzResult<Vec<u8>> {
        let cursor = self.write_record(record, Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// write a record to `path`, replacing anything already there
    pub fn save(&self, record: &Record, path: impl AsRef<Path>) -> MdzResult<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        let mut out = self.write_record(record, std::io::BufWriter::new(file))?;
        out.flush()?;
        log::debug!("wrote record to {}", path.display());
        Ok(())
    }

    /// write named arrays, each as `<name>.npy`
    pub fn write_arrays<W: Write + Seek>(
        &self,
        arrays: &[(&str, NpyArray)],
        sink: W,
    ) -> MdzResult<W> {
        let mut zip = ZipWriter::new(sink);
        let options = FileOptions::default().compression_method(self.compression);

        for (name, array) in arrays {
            zip.start_file(format!("{}.npy", name), options)?;
            zip.write_all(&encode_npy(array))?;
        }

        Ok(zip.finish()?)
    }

    fn record_arrays(&self, record: &Record) -> MdzResult<Vec<(&'static str, NpyArray)>> {
        let matrix = &record.data;
        let data = NpyArray::new(
            Dtype::for_precision(matrix.precision()),
            matrix.shape(),
            matrix.values().to_vec(),
        )?;

        let mut arrays = vec![
            (RATE_FIELD, NpyArray::scalar_i64(record.rate as i64)),
            (DATA_FIELD, data),
        ];
        if let Some(length) = record.length {
            arrays.push((LENGTH_FIELD, NpyArray::scalar_i64(length as i64)));
        }

        Ok(arrays)
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// serialize one array in `.npy` format 1.0
///
/// magic, version, u16 header length, header dict padded with spaces so the
/// payload starts on a 64 byte boundary, then the raw little-endian values.
pub fn encode_npy(array: &NpyArray) -> Vec<u8> {
    let preamble = NPY_MAGIC.len() + 2 + 2;
    let mut header = array.header_dict();

    // +1 for the trailing newline
    let unpadded = preamble + header.len() + 1;
    let padding = (NPY_HEADER_ALIGN - unpadded % NPY_HEADER_ALIGN) % NPY_HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(preamble + header.len() + array.values.len() * 8);
    out.extend_from_slice(&NPY_MAGIC);
    out.extend_from_slice(&NPY_VERSION);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());

    for &value in &array.values {
        array.dtype.encode(value, &mut out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        let array = NpyArray::new(Dtype::F2, vec![256, 3], vec![0.0; 768]).unwrap();
        let bytes = encode_npy(&array);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;

        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(bytes.len(), 10 + header_len + 768 * 2);
    }

    #[test]
    fn test_scalar_rate_layout() {
        let bytes = encode_npy(&NpyArray::scalar_i64(44100));
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();

        assert_eq!(&bytes[6..8], &[1, 0]);
        assert!(header.starts_with("{'descr': '<i8', 'fortran_order': False, 'shape': (), }"));
        assert_eq!(&bytes[10 + header_len..], &44100i64.to_le_bytes());
    }
}
