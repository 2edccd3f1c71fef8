use anyhow::{bail, Context, Result};
use libmdz::Waveform;
use std::io::{Cursor, Write};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Read an audio file into an interleaved waveform
/// Samples are f64 in range [-1.0, 1.0]
pub fn read_audio_file(path: &Path) -> Result<Waveform> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_from_source(mss, path.extension().and_then(|e| e.to_str()))
}

/// Read audio from bytes (for cross-platform/WASM support)
pub fn read_audio_from_bytes(bytes: &[u8]) -> Result<Waveform> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    read_from_source(mss, None)
}

fn read_from_source(mss: MediaSourceStream, extension: Option<&str>) -> Result<Waveform> {
    // Create hint from file extension
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported audio format")?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Unknown sample rate")?;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples: Vec<f64> = Vec::new();
    let mut buffer: Option<SampleBuffer<f64>> = None;

    // Decode all packets
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(e) => return Err(e).context("Error reading packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::warn!("skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e).context("Error decoding packet"),
        };

        let spec = *decoded.spec();
        channels.get_or_insert(spec.channels.count());

        // reallocate when a packet is bigger than anything seen so far
        let needed = decoded.capacity() * spec.channels.count();
        if buffer.as_ref().map_or(true, |b| b.capacity() < needed) {
            buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = buffer.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    let channels = channels.context("Unknown channel count")?;
    if samples.is_empty() {
        bail!("Audio stream contains no samples");
    }

    log::debug!(
        "read {} frames, {} channels at {} Hz",
        samples.len() / channels,
        channels,
        sample_rate
    );

    Waveform::new(samples, sample_rate, channels).context("Decoded audio has an invalid layout")
}

/// Write a waveform to a 32-bit float WAV file
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<()> {
    let bytes = write_wav_to_bytes(waveform)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write WAV file {}", path.display()))
}

/// Write a waveform to WAV format in memory (for cross-platform/WASM support)
pub fn write_wav_to_bytes(waveform: &Waveform) -> Result<Vec<u8>> {
    let channels = waveform.channels;
    let sample_rate = waveform.sample_rate;

    // WAV file format (RIFF)
    let mut buffer = Vec::new();

    let bytes_per_sample = 4; // 32-bit float
    let data_size = waveform.samples.len() * bytes_per_sample;
    let file_size = 36 + data_size; // 44 byte header - 8 + data_size

    if file_size > u32::MAX as usize {
        bail!("Waveform is too long for a WAV file");
    }

    // RIFF header
    buffer.write_all(b"RIFF")?;
    buffer.write_all(&(file_size as u32).to_le_bytes())?;
    buffer.write_all(b"WAVE")?;

    // fmt chunk
    buffer.write_all(b"fmt ")?;
    buffer.write_all(&16u32.to_le_bytes())?; // chunk size
    buffer.write_all(&3u16.to_le_bytes())?; // format = IEEE float
    buffer.write_all(&(channels as u16).to_le_bytes())?;
    buffer.write_all(&sample_rate.to_le_bytes())?;
    let byte_rate = sample_rate * channels as u32 * bytes_per_sample as u32;
    buffer.write_all(&byte_rate.to_le_bytes())?;
    let block_align = channels as u16 * bytes_per_sample as u16;
    buffer.write_all(&block_align.to_le_bytes())?;
    buffer.write_all(&32u16.to_le_bytes())?; // bits per sample

    // data chunk
    buffer.write_all(b"data")?;
    buffer.write_all(&(data_size as u32).to_le_bytes())?;

    for &sample in &waveform.samples {
        buffer.write_all(&(sample as f32).to_le_bytes())?;
    }

    Ok(buffer)
}
