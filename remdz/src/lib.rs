//! remdz - audio converter library for mdz records
//!
//! Turns audio files into MDCT coefficient records (`.npz`) and back.
//! It works on native targets and can be compiled to WebAssembly.
//!

pub mod audio;
pub mod config;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod wasm;

use anyhow::{bail, Context, Result};
use libmdz::core::{DATA_FIELD, RATE_FIELD};
use libmdz::{Dtype, NpyArray, Reader, Record, Stage, Waveform, Writer};

/// Re-export libmdz types
pub use libmdz::{CodecConfig, ReductionConfig, WindowType};

/// Information about an mdz record
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordInfo {
    pub version: String,
    pub sample_rate: u32,
    pub channels: usize,
    pub bins: usize,
    pub blocks: usize,
    pub shape: Vec<usize>,
    pub dtype: String,
    /// samples per channel, if the record stores it
    pub length: Option<usize>,
    pub duration_secs: f64,
    pub file_size: usize,
    pub zero_fraction: f64,
}

/// Get information about an mdz record
pub fn get_record_info(data: &[u8]) -> Result<RecordInfo> {
    let record = read_record(data)?;
    let matrix = &record.data;

    // without a stored length, the blocks bound it from above
    let frames = record
        .length
        .unwrap_or_else(|| matrix.blocks().saturating_sub(1) * matrix.bins());

    Ok(RecordInfo {
        version: libmdz::version(),
        sample_rate: record.rate,
        channels: matrix.channels(),
        bins: matrix.bins(),
        blocks: matrix.blocks(),
        shape: matrix.shape(),
        dtype: Dtype::for_precision(matrix.precision()).descr().to_string(),
        length: record.length,
        duration_secs: frames as f64 / record.rate as f64,
        file_size: data.len(),
        zero_fraction: record.sparsity(),
    })
}

/// Options for converting audio to an mdz record
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub codec: CodecConfig,
    /// keep the record of every stage, not just the last
    pub generate_steps: bool,
}

impl EncodeOptions {
    /// the reference pipeline: block 512, sine window, all four stages
    pub fn new() -> Self {
        Self::default()
    }

    /// transform only, decodes back to the input
    pub fn lossless() -> Self {
        Self {
            codec: CodecConfig::lossless(),
            ..Default::default()
        }
    }

    pub fn with_codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_steps(mut self, generate_steps: bool) -> Self {
        self.generate_steps = generate_steps;
        self
    }
}

/// Records produced by one encode
///
/// `records[i]` is the matrix after stage `i`; without `generate_steps`
/// only the final record is kept.
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    pub records: Vec<(Stage, Record)>,
}

impl EncodeOutput {
    /// the fully reduced record
    pub fn final_record(&self) -> Option<&Record> {
        self.records.last().map(|(_, r)| r)
    }

    /// every record as `.npz` bytes, tagged with its stage
    pub fn to_npz(&self) -> Result<Vec<(Stage, Vec<u8>)>> {
        let writer = Writer::new();
        self.records
            .iter()
            .map(|(stage, record)| {
                let bytes = writer
                    .to_bytes(record)
                    .with_context(|| format!("Failed to write stage {} record", stage.index()))?;
                Ok((*stage, bytes))
            })
            .collect()
    }
}

/// Encode audio file bytes to mdz records
///
/// # Arguments
/// * `audio_bytes` - Raw bytes of an audio file (MP3, WAV, FLAC, OGG, etc.)
/// * `options` - Encoding options
/// * `on_stage` - Called once per finished stage
pub fn encode_from_audio<F>(
    audio_bytes: &[u8],
    options: &EncodeOptions,
    on_stage: F,
) -> Result<EncodeOutput>
where
    F: FnMut(Stage),
{
    let waveform =
        audio::read_audio_from_bytes(audio_bytes).context("Failed to read audio file")?;
    encode_from_samples(&waveform, options, on_stage)
}

/// Encode a waveform to mdz records
pub fn encode_from_samples<F>(
    waveform: &Waveform,
    options: &EncodeOptions,
    mut on_stage: F,
) -> Result<EncodeOutput>
where
    F: FnMut(Stage),
{
    let encoder = libmdz::Encoder::new(options.codec.clone()).context("Invalid codec settings")?;

    let mut records = Vec::new();
    let final_record = encoder
        .encode_with(waveform, |snapshot| {
            if options.generate_steps && !snapshot.stage.is_final() {
                records.push((snapshot.stage, snapshot.to_record()));
            }
            on_stage(snapshot.stage);
        })
        .context("Encoding failed")?;
    records.push((Stage::Thresholded, final_record));

    Ok(EncodeOutput { records })
}

/// Parse `.npz` bytes into a record
pub fn read_record(npz_bytes: &[u8]) -> Result<Record> {
    Reader::new().read(npz_bytes).context("Invalid mdz record")
}

/// Decode an mdz record to a waveform
///
/// `window` must match the one used to encode.
pub fn decode_to_samples(npz_bytes: &[u8], window: WindowType) -> Result<Waveform> {
    let record = read_record(npz_bytes)?;
    libmdz::Decoder::new()
        .with_window(window)
        .decode(&record)
        .context("Decoding failed")
}

/// Decode an mdz record to WAV format
///
/// # Returns
/// Raw bytes of a 32-bit float WAV file
pub fn decode_to_wav(npz_bytes: &[u8], window: WindowType) -> Result<Vec<u8>> {
    let waveform = decode_to_samples(npz_bytes, window)?;
    audio::write_wav_to_bytes(&waveform).context("Failed to write WAV data")
}

/// `a - b` for two audio files, as a waveform
pub fn residual_from_audio(a_bytes: &[u8], b_bytes: &[u8]) -> Result<Waveform> {
    let a = audio::read_audio_from_bytes(a_bytes).context("Failed to read first audio file")?;
    let b = audio::read_audio_from_bytes(b_bytes).context("Failed to read second audio file")?;

    if a.frames() != b.frames() {
        log::warn!(
            "inputs differ in length ({} vs {} frames), using the shorter",
            a.frames(),
            b.frames()
        );
    }

    libmdz::residual(&a, &b).context("Cannot subtract these inputs")
}

/// A time-domain waveform as an `.npz` holding `rate` and `data`
///
/// `data` is 1-D for mono, `(frames, channels)` otherwise.
pub fn waveform_to_npz(waveform: &Waveform) -> Result<Vec<u8>> {
    if waveform.is_empty() {
        bail!("Refusing to write an empty waveform");
    }

    let shape = if waveform.channels == 1 {
        vec![waveform.frames()]
    } else {
        vec![waveform.frames(), waveform.channels]
    };
    let data = NpyArray::new(Dtype::F8, shape, waveform.samples.clone())?;
    let arrays = [
        (RATE_FIELD, NpyArray::scalar_i64(waveform.sample_rate as i64)),
        (DATA_FIELD, data),
    ];

    let cursor = Writer::new().write_arrays(&arrays, std::io::Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

/// file name for the record of `stage`: `<base><index>.npz`
pub fn stage_file_name(base: &str, stage: Stage) -> String {
    format!("{}{}.npz", base, stage.index())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_file_name() {
        assert_eq!(stage_file_name("out/song", Stage::Transformed), "out/song0.npz");
        assert_eq!(stage_file_name("song", Stage::Thresholded), "song4.npz");
    }
}
