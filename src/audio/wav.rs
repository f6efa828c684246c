//! WAV export and import for rendered buffers.

use crate::audio::buffer::StereoBuffer;
use crate::error::{MorseError, Result};
use std::io::{Read, Seek, Write};
use std::path::Path;

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Sample count as stored in the WAV header.
fn header_sample_count(samples: usize) -> Result<u32> {
    u32::try_from(samples).map_err(|_| MorseError::Wav {
        message: format!("{} samples do not fit in a WAV file", samples),
    })
}

/// Writes the buffer as 16-bit stereo PCM.
pub fn write_wav<W: Write + Seek>(buffer: &StereoBuffer, writer: W) -> Result<()> {
    let sample_count = header_sample_count(buffer.samples().len())?;
    let mut wav_writer =
        hound::WavWriter::new(writer, wav_spec(buffer.sample_rate())).map_err(|e| {
            MorseError::Wav {
                message: format!("Failed to start WAV stream: {}", e),
            }
        })?;

    let mut samples = wav_writer.get_i16_writer(sample_count);
    for &sample in buffer.samples() {
        samples.write_sample(sample);
    }
    samples.flush().map_err(|e| MorseError::Wav {
        message: format!("Failed to write WAV samples: {}", e),
    })?;

    wav_writer.finalize().map_err(|e| MorseError::Wav {
        message: format!("Failed to finalize WAV file: {}", e),
    })
}

/// Writes the buffer to a file at `path`.
pub fn save_wav(buffer: &StereoBuffer, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_wav(buffer, std::io::BufWriter::new(file))?;
    log::info!(
        "wrote {} frames ({:.2}s) to {}",
        buffer.frames(),
        buffer.duration().as_secs_f64(),
        path.display()
    );
    Ok(())
}

/// Reads 16-bit integer PCM. Mono input is duplicated into both channels.
pub fn read_wav<R: Read>(reader: R) -> Result<StereoBuffer> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| MorseError::Wav {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(MorseError::Wav {
            message: format!(
                "Unsupported WAV format: {:?} {}-bit",
                spec.sample_format, spec.bits_per_sample
            ),
        });
    }

    let samples: Vec<i16> = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MorseError::Wav {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    match spec.channels {
        1 => Ok(StereoBuffer::from_mono(&samples, spec.sample_rate)),
        2 => StereoBuffer::from_interleaved(samples, spec.sample_rate),
        n => Err(MorseError::Wav {
            message: format!("Unsupported channel count: {}", n),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::{ElementTiming, ToneConfig, ToneSynthesizer};
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn write_then_read_keeps_samples() {
        let buffer = ToneSynthesizer::new(ToneConfig::default())
            .render_code("-.-", &ElementTiming::default());
        let mut cursor = Cursor::new(Vec::new());
        write_wav(&buffer, &mut cursor).unwrap();

        let read = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(read, buffer);
    }

    #[test]
    fn written_header_is_stereo_16_bit() {
        let buffer = StereoBuffer::silent(100, 22050);
        let mut cursor = Cursor::new(Vec::new());
        write_wav(&buffer, &mut cursor).unwrap();

        let reader = hound::WavReader::new(Cursor::new(cursor.into_inner())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 100);
    }

    #[test]
    fn mono_input_is_duplicated() {
        let data = make_wav_data(8000, 1, &[10, -20, 30]);
        let buffer = read_wav(Cursor::new(data)).unwrap();
        assert_eq!(buffer.samples(), &[10, 10, -20, -20, 30, 30]);
        assert_eq!(buffer.sample_rate(), 8000);
    }

    #[test]
    fn more_than_two_channels_is_rejected() {
        let data = make_wav_data(8000, 4, &[0; 8]);
        match read_wav(Cursor::new(data)) {
            Err(MorseError::Wav { message }) => assert!(message.contains("channel count")),
            other => panic!("Expected Wav error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_wav_data_returns_error() {
        let result = read_wav(Cursor::new(vec![0u8, 1, 2, 3, 4, 5]));
        match result {
            Err(MorseError::Wav { message }) => {
                assert!(message.contains("Failed to parse WAV file"));
            }
            _ => panic!("Expected Wav error"),
        }
    }

    #[test]
    fn save_wav_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buffer = StereoBuffer::from_mono(&[1, 2, 3, 4], 48000);
        save_wav(&buffer, &path).unwrap();

        let read = read_wav(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(read, buffer);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_sample_count_is_rejected() {
        assert_eq!(header_sample_count(960).unwrap(), 960);
        assert_eq!(header_sample_count(u32::MAX as usize).unwrap(), u32::MAX);
        match header_sample_count(u32::MAX as usize + 1) {
            Err(MorseError::Wav { message }) => assert!(message.contains("do not fit")),
            other => panic!("Expected Wav error, got {other:?}"),
        }
    }

    #[test]
    fn empty_buffer_round_trips() {
        let buffer = StereoBuffer::new(48000);
        let mut cursor = Cursor::new(Vec::new());
        write_wav(&buffer, &mut cursor).unwrap();
        let read = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert!(read.is_empty());
    }
}
