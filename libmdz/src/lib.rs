#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod lossy;

mod reader;
mod writer;

pub use core::{
    CoefficientMatrix, Dtype, Error, MdzResult, NpyArray, Precision, Record, Stage, Waveform,
    DEFAULT_BLOCK_SIZE, DEFAULT_CUTOFF_BIN, DEFAULT_DECIMALS, DEFAULT_THRESHOLD, MAX_DECIMALS,
    VERSION_MAJOR, VERSION_MINOR,
};
pub use lossy::{
    BandRange, CodecConfig, Decoder, Encoder, Mdct, ReductionConfig, ReductionPipeline, Snapshot,
    WindowType,
};
pub use reader::Reader;
pub use writer::{encode_npy, Writer};

// api functions

/// encode a waveform to its final reduced record
///
/// # Arguments
/// * `waveform` - Interleaved samples with rate and channel count
/// * `config` - Block size, window and reduction stages
///
/// # Returns
/// Record holding the rate and the stage 4 coefficient matrix
pub fn encode(waveform: &Waveform, config: &CodecConfig) -> MdzResult<Record> {
    Encoder::new(config.clone())?.encode(waveform)
}

/// encode and keep every intermediate stage, index 0 to 4
pub fn encode_stages(waveform: &Waveform, config: &CodecConfig) -> MdzResult<Vec<Record>> {
    Encoder::new(config.clone())?.encode_stages(waveform)
}

/// decode a record with the default (sine) window
pub fn decode(record: &Record) -> MdzResult<Waveform> {
    Decoder::new().decode(record)
}

/// `a - b` sample by sample, over the shorter of the two
///
/// Both waveforms must share rate and channel count. Used to hear what
/// an encode threw away.
pub fn residual(a: &Waveform, b: &Waveform) -> MdzResult<Waveform> {
    if a.sample_rate != b.sample_rate {
        return Err(Error::MalformedInput(format!(
            "sample rates differ: {} vs {}",
            a.sample_rate, b.sample_rate
        )));
    }
    if a.channels != b.channels {
        return Err(Error::MalformedInput(format!(
            "channel counts differ: {} vs {}",
            a.channels, b.channels
        )));
    }

    let samples = a
        .samples
        .iter()
        .zip(b.samples.iter())
        .map(|(x, y)| x - y)
        .collect();

    Waveform::new(samples, a.sample_rate, a.channels)
}

/// get lib version
pub fn version() -> String {
    format!("{}.{}", VERSION_MAJOR, VERSION_MINOR)
}

// tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "1.0");
    }

    #[test]
    fn test_residual_uses_shorter_input() {
        let a = Waveform::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 8000, 2).unwrap();
        let b = Waveform::new(vec![0.5, 0.5, 1.0, 1.0], 8000, 2).unwrap();

        let r = residual(&a, &b).unwrap();
        assert_eq!(r.samples, vec![0.5, 1.5, 2.0, 3.0]);
        assert_eq!(r.channels, 2);
    }

    #[test]
    fn test_residual_rejects_mismatch() {
        let a = Waveform::mono(vec![0.0; 4], 8000).unwrap();
        let b = Waveform::mono(vec![0.0; 4], 16000).unwrap();
        assert!(matches!(residual(&a, &b), Err(Error::MalformedInput(_))));
    }
}
