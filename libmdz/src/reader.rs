use std::io::{Cursor as IoCursor, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::core::{
    element_count, CoefficientMatrix, Dtype, Error, MdzResult, NpyArray, Record, DATA_FIELD,
    LENGTH_FIELD, NPY_MAGIC, RATE_FIELD,
};

/// reader for `.npz` coefficient records
pub struct Reader;

impl Reader {
    /// new reader
    pub fn new() -> Self {
        Reader
    }

    /// parse a record held in memory
    pub fn read(&self, data: &[u8]) -> MdzResult<Record> {
        self.read_record(IoCursor::new(data))
    }

    /// open and parse a record file
    pub fn load(&self, path: impl AsRef<Path>) -> MdzResult<Record> {
        let file = std::fs::File::open(path.as_ref())?;
        self.read_record(std::io::BufReader::new(file))
    }

    /// parse a record from any seekable source
    pub fn read_record<R: Read + Seek>(&self, source: R) -> MdzResult<Record> {
        let mut archive = ZipArchive::new(source)?;

        let rate = self
            .read_member(&mut archive, RATE_FIELD)?
            .ok_or_else(|| missing(RATE_FIELD))?;
        let data = self
            .read_member(&mut archive, DATA_FIELD)?
            .ok_or_else(|| missing(DATA_FIELD))?;
        let length = self.read_member(&mut archive, LENGTH_FIELD)?;

        let rate = positive_integer(&rate, RATE_FIELD)?;
        if rate == 0 || rate > u32::MAX as u64 {
            return Err(Error::MalformedInput(format!(
                "sample rate {} is out of range",
                rate
            )));
        }

        let mut record = Record::new(rate as u32, self.to_matrix(data)?);
        if let Some(length) = length {
            record.length = Some(positive_integer(&length, LENGTH_FIELD)? as usize);
        }

        Ok(record)
    }

    /// every member of an archive, by name without the `.npy` suffix
    pub fn read_arrays<R: Read + Seek>(&self, source: R) -> MdzResult<Vec<(String, NpyArray)>> {
        let mut archive = ZipArchive::new(source)?;
        let mut arrays = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut member = archive.by_index(i)?;
            let name = member.name().trim_end_matches(".npy").to_string();
            let mut bytes = Vec::with_capacity(member.size() as usize);
            member.read_to_end(&mut bytes)?;
            arrays.push((name, self.parse_npy(&bytes)?));
        }

        Ok(arrays)
    }

    fn read_member<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        field: &str,
    ) -> MdzResult<Option<NpyArray>> {
        let mut member = match archive.by_name(&format!("{}.npy", field)) {
            Ok(member) => member,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::with_capacity(member.size() as usize);
        member.read_to_end(&mut bytes)?;
        self.parse_npy(&bytes).map(Some)
    }

    /// decode a single `.npy` member (format versions 1, 2 and 3)
    pub fn parse_npy(&self, bytes: &[u8]) -> MdzResult<NpyArray> {
        let mut cursor = Cursor::new(bytes);

        // magic
        let magic = cursor.read_bytes(NPY_MAGIC.len())?;
        if magic != NPY_MAGIC {
            return Err(Error::MalformedInput("not an npy array: bad magic".into()));
        }

        // version decides the header length width
        let major = cursor.read_u8()?;
        let _minor = cursor.read_u8()?;
        let header_len = match major {
            1 => cursor.read_u16_le()? as usize,
            2 | 3 => cursor.read_u32_le()? as usize,
            v => {
                return Err(Error::MalformedInput(format!(
                    "unsupported npy version {}",
                    v
                )))
            }
        };

        let header_bytes = cursor.read_bytes(header_len)?;
        let header = std::str::from_utf8(header_bytes)
            .map_err(|_| Error::MalformedInput("npy header is not text".into()))?;
        let (dtype, fortran_order, shape) = parse_header(header)?;

        if fortran_order && shape.len() > 1 {
            return Err(Error::MalformedInput(
                "fortran-ordered arrays are not supported".into(),
            ));
        }

        let width = dtype.byte_width();
        let payload = cursor.read_bytes(element_count(&shape)?.checked_mul(width).ok_or_else(
            || Error::MalformedInput(format!("array shape {:?} is too large", shape)),
        )?)?;

        let values = payload.chunks_exact(width).map(|b| dtype.decode(b)).collect();

        NpyArray::new(dtype, shape, values)
    }

    fn to_matrix(&self, array: NpyArray) -> MdzResult<CoefficientMatrix> {
        if array.dtype.is_integer() {
            log::debug!("integer coefficient matrix, widening to double");
        }
        let precision = array.dtype.precision();

        // a record always holds at least one bin and one block
        if array.shape.contains(&0) {
            return Err(Error::MalformedInput(format!(
                "coefficient matrix has an empty dimension, shape {:?}",
                array.shape
            )));
        }

        match array.shape[..] {
            [bins, blocks] => CoefficientMatrix::from_vec(bins, blocks, 1, array.values, precision),
            [bins, blocks, channels] => {
                CoefficientMatrix::from_vec(bins, blocks, channels, array.values, precision)
            }
            _ => Err(Error::MalformedInput(format!(
                "coefficient matrix must have rank 2 or 3, got shape {:?}",
                array.shape
            ))),
        }
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(field: &str) -> Error {
    Error::MalformedInput(format!("record has no '{}' field", field))
}

fn positive_integer(array: &NpyArray, field: &str) -> MdzResult<u64> {
    let value = array.scalar()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(Error::MalformedInput(format!(
            "'{}' must be a non-negative integer, got {}",
            field, value
        )));
    }
    Ok(value as u64)
}

// header parsing

/// pull descr, fortran_order and shape out of the python dict literal
fn parse_header(header: &str) -> MdzResult<(Dtype, bool, Vec<usize>)> {
    let descr = quoted_value(header, "descr")?;
    let dtype = Dtype::from_descr(descr)?;

    let fortran_order = match raw_value(header, "fortran_order")? {
        v if v.starts_with("True") => true,
        v if v.starts_with("False") => false,
        v => {
            return Err(Error::MalformedInput(format!(
                "bad fortran_order value '{}'",
                v
            )))
        }
    };

    let shape_src = raw_value(header, "shape")?;
    let close = shape_src
        .find(')')
        .filter(|_| shape_src.starts_with('('))
        .ok_or_else(|| Error::MalformedInput("npy shape is not a tuple".into()))?;
    let shape = shape_src[1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L').parse::<usize>().map_err(|_| {
                Error::MalformedInput(format!("bad dimension '{}' in npy shape", s))
            })
        })
        .collect::<MdzResult<Vec<_>>>()?;

    Ok((dtype, fortran_order, shape))
}

/// text right after `'key':`, leading whitespace stripped
fn raw_value<'a>(header: &'a str, key: &str) -> MdzResult<&'a str> {
    let pattern = format!("'{}':", key);
    let start = header
        .find(&pattern)
        .ok_or_else(|| Error::MalformedInput(format!("npy header has no '{}'", key)))?;
    Ok(header[start + pattern.len()..].trim_start())
}

fn quoted_value<'a>(header: &'a str, key: &str) -> MdzResult<&'a str> {
    let rest = raw_value(header, key)?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| Error::MalformedInput(format!("npy '{}' is not a string", key)))?;
    let body = &rest[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| Error::MalformedInput(format!("unterminated npy '{}'", key)))?;
    Ok(&body[..end])
}

// cursor helper

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn read_bytes(&mut self, count: usize) -> MdzResult<&'a [u8]> {
        if count > self.data.len() - self.pos {
            return Err(Error::MalformedInput("unexpected end of npy data".into()));
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> MdzResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16_le(&mut self) -> MdzResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_le(&mut self) -> MdzResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
