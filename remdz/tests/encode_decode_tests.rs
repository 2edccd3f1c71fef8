#[cfg(test)]
mod tests {
    use libmdz::{Dtype, Reader, Stage};
    use remdz::audio::{read_audio_file, write_wav};
    use remdz::{
        decode_to_samples, decode_to_wav, encode_from_audio, encode_from_samples,
        get_record_info, residual_from_audio, stage_file_name, waveform_to_npz, EncodeOptions,
        WindowType,
    };

    /// 16-bit PCM WAV file held in memory
    fn pcm_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let data_size = (samples.len() * 2) as u32;
        let block_align = channels * 2;

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_size).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_size.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    fn stereo_tone(frames: usize, sample_rate: u32) -> Vec<i16> {
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            let s = (t * 440.0 * 2.0 * std::f64::consts::PI).sin() * 0.5;
            samples.push((s * 32767.0) as i16);
            samples.push((-s * 32767.0) as i16);
        }
        samples
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let sample_rate = 8000;
        let pcm = stereo_tone(4000, sample_rate);
        let wav = pcm_wav(&pcm, sample_rate, 2);

        // Encode
        let output = encode_from_audio(&wav, &EncodeOptions::lossless(), |_| {}).unwrap();
        assert_eq!(output.records.len(), 1);
        let (stage, npz) = output.to_npz().unwrap().pop().unwrap();
        assert_eq!(stage, Stage::Thresholded);

        // Decode
        let decoded = decode_to_samples(&npz, WindowType::Sine).unwrap();

        assert_eq!(decoded.sample_rate, sample_rate);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), pcm.len());

        for (original, decoded) in pcm.iter().zip(decoded.samples.iter()) {
            let original = *original as f64 / 32768.0;
            assert!((original - decoded).abs() < 1e-4);
        }
    }

    #[test]
    fn test_decode_to_wav_header() {
        let wav = pcm_wav(&stereo_tone(2000, 16000), 16000, 2);
        let output = encode_from_audio(&wav, &EncodeOptions::new(), |_| {}).unwrap();
        let (_, npz) = output.to_npz().unwrap().pop().unwrap();

        let out = decode_to_wav(&npz, WindowType::Sine).unwrap();

        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(&out[8..12], b"WAVE");
        assert_eq!(u16::from_le_bytes([out[22], out[23]]), 2);
        assert_eq!(
            u32::from_le_bytes([out[24], out[25], out[26], out[27]]),
            16000
        );
        // 2000 frames of two 32-bit floats after the 44 byte header
        assert_eq!(out.len(), 44 + 2000 * 2 * 4);
    }

    #[test]
    fn test_generate_steps() {
        let wav = pcm_wav(&stereo_tone(3000, 22050), 22050, 2);
        let options = EncodeOptions::new().with_steps(true);

        let mut seen = Vec::new();
        let output = encode_from_audio(&wav, &options, |stage| seen.push(stage)).unwrap();

        assert_eq!(seen, Stage::ALL.to_vec());
        let stages: Vec<Stage> = output.records.iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, Stage::ALL.to_vec());

        let names: Vec<String> = stages.iter().map(|s| stage_file_name("song", *s)).collect();
        assert_eq!(names[0], "song0.npz");
        assert_eq!(names[4], "song4.npz");
    }

    #[test]
    fn test_record_info() {
        let wav = pcm_wav(&stereo_tone(8000, 8000), 8000, 2);
        let output = encode_from_audio(&wav, &EncodeOptions::new(), |_| {}).unwrap();
        let (_, npz) = output.to_npz().unwrap().pop().unwrap();

        let info = get_record_info(&npz).unwrap();
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bins, 256);
        assert_eq!(info.dtype, "<f2");
        assert_eq!(info.length, Some(8000));
        assert!((info.duration_secs - 1.0).abs() < 1e-9);
        assert_eq!(info.file_size, npz.len());
    }

    #[test]
    fn test_residual_of_identical_inputs() {
        let wav = pcm_wav(&stereo_tone(1000, 8000), 8000, 2);
        let residual = residual_from_audio(&wav, &wav).unwrap();

        assert_eq!(residual.channels, 2);
        assert_eq!(residual.frames(), 1000);
        assert!(residual.samples.iter().all(|&s| s == 0.0));

        let npz = waveform_to_npz(&residual).unwrap();
        let arrays = Reader::new()
            .read_arrays(std::io::Cursor::new(npz))
            .unwrap();
        let (_, data) = arrays.iter().find(|(name, _)| name == "data").unwrap();
        assert_eq!(data.dtype, Dtype::F8);
        assert_eq!(data.shape, vec![1000, 2]);
    }

    #[test]
    fn test_rejects_non_audio() {
        let result = encode_from_audio(b"not audio at all", &EncodeOptions::new(), |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        std::fs::write(&input, pcm_wav(&stereo_tone(3000, 11025), 11025, 2)).unwrap();

        // encode every stage to <base><index>.npz
        let waveform = read_audio_file(&input).unwrap();
        let options = EncodeOptions::new().with_steps(true);
        let output = encode_from_samples(&waveform, &options, |_| {}).unwrap();

        let base = dir.path().join("tone").to_string_lossy().into_owned();
        for (stage, bytes) in output.to_npz().unwrap() {
            std::fs::write(stage_file_name(&base, stage), bytes).unwrap();
        }
        for stage in Stage::ALL {
            assert!(std::path::Path::new(&stage_file_name(&base, stage)).exists());
        }

        // decode the final record back to a WAV file
        let record = Reader::new()
            .load(stage_file_name(&base, Stage::Thresholded))
            .unwrap();
        assert_eq!(record.rate, 11025);
        assert_eq!(record.length, Some(3000));

        let decoded = libmdz::decode(&record).unwrap();
        let wav_path = dir.path().join("decoded.wav");
        write_wav(&wav_path, &decoded).unwrap();

        let out = std::fs::read(&wav_path).unwrap();
        assert_eq!(u16::from_le_bytes([out[22], out[23]]), 2);
        assert_eq!(out.len(), 44 + 3000 * 2 * 4);
    }
}
