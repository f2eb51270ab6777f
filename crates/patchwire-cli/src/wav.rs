//! Interleaved WAV output.

use std::path::Path;

use hound::{SampleFormat, WavWriter};

/// Writes interleaved `samples` at `bits_per_sample` (16, 24 or 32-bit float).
pub fn write_interleaved(
    path: &Path,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format: if bits_per_sample == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer = WavWriter::create(path, spec)?;

    if bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sixteen_bit_clips_and_scales() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        write_interleaved(&path, &[0.5, -0.5, 2.0, -2.0], 2, 48000, 16).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![16384, -16384, i16::MAX, i16::MIN]);
    }

    #[test]
    fn float_is_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        write_interleaved(&path, &[0.25, -0.75], 1, 44100, 32).unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0.25, -0.75]);
    }
}
