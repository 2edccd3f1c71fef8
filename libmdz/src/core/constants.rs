/// Samples per MDCT block in the reference pipeline
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// First bin zeroed by band truncation (bins 0-149 survive)
pub const DEFAULT_CUTOFF_BIN: usize = 150;

/// Decimal digits kept by the rounding stage
pub const DEFAULT_DECIMALS: i32 = 2;

/// Most decimal digits rounding accepts; f64 holds about 15 significant
pub const MAX_DECIMALS: i32 = 15;

/// Magnitudes below this become exact zeros
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Archive member holding the sample rate
pub const RATE_FIELD: &str = "rate";

/// Archive member holding the coefficient matrix
pub const DATA_FIELD: &str = "data";

/// Archive member holding the original length per channel (optional)
pub const LENGTH_FIELD: &str = "length";

/// Magic prefix of a NumPy `.npy` member
pub const NPY_MAGIC: [u8; 6] = [0x93, b'N', b'U', b'M', b'P', b'Y'];

/// `.npy` format version written, major then minor
pub const NPY_VERSION: [u8; 2] = [1, 0];

/// `.npy` headers are padded so the payload starts on this boundary
pub const NPY_HEADER_ALIGN: usize = 64;

/// library version
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;
