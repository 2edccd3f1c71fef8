//! NumPy `.npy` array model, the unit an `.npz` record is made of

use super::error::{Error, MdzResult};
use super::types::Precision;

/// element type of an `.npy` member
///
/// | Variant | descr | Rust |
/// |---------|-------|------|
/// | F2      | `<f2` | f16  |
/// | F4      | `<f4` | f32  |
/// | F8      | `<f8` | f64  |
/// | I2      | `<i2` | i16  |
/// | I4      | `<i4` | i32  |
/// | I8      | `<i8` | i64  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    F2,
    F4,
    F8,
    I2,
    I4,
    I8,
}

impl Dtype {
    /// little-endian descr string
    pub fn descr(self) -> &'static str {
        match self {
            Dtype::F2 => "<f2",
            Dtype::F4 => "<f4",
            Dtype::F8 => "<f8",
            Dtype::I2 => "<i2",
            Dtype::I4 => "<i4",
            Dtype::I8 => "<i8",
        }
    }

    /// parse a descr; only little-endian (or native, which we treat as little) is accepted
    pub fn from_descr(descr: &str) -> MdzResult<Self> {
        let kind = descr
            .strip_prefix('<')
            .or_else(|| descr.strip_prefix('='))
            .ok_or_else(|| {
                Error::MalformedInput(format!("unsupported byte order in dtype '{}'", descr))
            })?;
        match kind {
            "f2" => Ok(Dtype::F2),
            "f4" => Ok(Dtype::F4),
            "f8" => Ok(Dtype::F8),
            "i2" => Ok(Dtype::I2),
            "i4" => Ok(Dtype::I4),
            "i8" => Ok(Dtype::I8),
            _ => Err(Error::MalformedInput(format!(
                "unsupported dtype '{}'",
                descr
            ))),
        }
    }

    pub fn byte_width(self) -> usize {
        match self {
            Dtype::F2 | Dtype::I2 => 2,
            Dtype::F4 | Dtype::I4 => 4,
            Dtype::F8 | Dtype::I8 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Dtype::I2 | Dtype::I4 | Dtype::I8)
    }

    /// dtype a coefficient matrix of `precision` is stored as
    pub fn for_precision(precision: Precision) -> Self {
        match precision {
            Precision::Half => Dtype::F2,
            Precision::BFloat16 | Precision::Single => Dtype::F4,
            Precision::Double => Dtype::F8,
        }
    }

    /// precision a matrix read from this dtype carries
    pub fn precision(self) -> Precision {
        match self {
            Dtype::F2 => Precision::Half,
            Dtype::F4 => Precision::Single,
            _ => Precision::Double,
        }
    }

    /// one value, little-endian
    pub fn encode(self, value: f64, out: &mut Vec<u8>) {
        match self {
            Dtype::F2 => out.extend_from_slice(&half::f16::from_f64(value).to_le_bytes()),
            Dtype::F4 => out.extend_from_slice(&(value as f32).to_le_bytes()),
            Dtype::F8 => out.extend_from_slice(&value.to_le_bytes()),
            Dtype::I2 => out.extend_from_slice(&(value as i16).to_le_bytes()),
            Dtype::I4 => out.extend_from_slice(&(value as i32).to_le_bytes()),
            Dtype::I8 => out.extend_from_slice(&(value as i64).to_le_bytes()),
        }
    }

    /// one value from exactly `byte_width` bytes
    pub fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            Dtype::F2 => half::f16::from_le_bytes([bytes[0], bytes[1]]).to_f64(),
            Dtype::F4 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Dtype::F8 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
            Dtype::I2 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Dtype::I4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Dtype::I8 => i64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]) as f64,
        }
    }
}

/// number of elements in `shape`, failing instead of overflowing
pub fn element_count(shape: &[usize]) -> MdzResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::MalformedInput(format!("array shape {:?} is too large", shape)))
}

/// a C-ordered n-dimensional array, values widened to f64
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl NpyArray {
    /// 0-d integer array, how numpy stores a python int
    pub fn scalar_i64(value: i64) -> Self {
        NpyArray {
            dtype: Dtype::I8,
            shape: vec![],
            values: vec![value as f64],
        }
    }

    pub fn new(dtype: Dtype, shape: Vec<usize>, values: Vec<f64>) -> MdzResult<Self> {
        let count = element_count(&shape)?;
        if count != values.len() {
            return Err(Error::MalformedInput(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                count,
                values.len()
            )));
        }
        Ok(NpyArray {
            dtype,
            shape,
            values,
        })
    }

    /// number of elements
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// the single value of a 0-d or one-element array
    pub fn scalar(&self) -> MdzResult<f64> {
        if self.values.len() != 1 || self.shape.len() > 1 {
            return Err(Error::MalformedInput(format!(
                "expected a scalar, got shape {:?}",
                self.shape
            )));
        }
        Ok(self.values[0])
    }

    /// header dict exactly as numpy writes it
    pub fn header_dict(&self) -> String {
        let shape = match self.shape.len() {
            0 => "()".to_string(),
            1 => format!("({},)", self.shape[0]),
            _ => format!(
                "({})",
                self.shape
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            self.dtype.descr(),
            shape
        )
    }
}
