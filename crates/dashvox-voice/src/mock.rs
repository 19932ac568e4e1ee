//! Placeholder audio used when real synthesis is unavailable.
//!
//! Produces one second of a 440 Hz sine tone as a 16-bit mono WAV file at
//! the pipeline sample rate. The output depends only on the constants below,
//! never on the input text.

use crate::error::VoiceError;
use dashvox_types::PcmFormat;
use std::f64::consts::PI;
use std::path::Path;

/// Tone frequency (A4).
pub const MOCK_FREQUENCY_HZ: f64 = 440.0;

/// Length of the generated tone.
pub const MOCK_DURATION_SECS: u32 = 1;

/// Returns the samples of the placeholder tone.
pub fn mock_samples(format: PcmFormat) -> Vec<i16> {
    let rate = f64::from(format.sample_rate);
    let count = (format.sample_rate * MOCK_DURATION_SECS) as usize;
    (0..count)
        .map(|i| {
            let t = i as f64 / rate;
            (32767.0 * (2.0 * PI * MOCK_FREQUENCY_HZ * t).sin()) as i16
        })
        .collect()
}

/// Writes samples as a WAV file. Blocking.
pub(crate) fn write_wav(path: &Path, samples: &[i16], format: PcmFormat) -> Result<(), VoiceError> {
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Writes the placeholder tone to `output`.
///
/// Fails only on local file-system errors.
pub async fn write_mock_wav(output: &Path) -> Result<(), VoiceError> {
    let path = output.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let format = PcmFormat::S16LE_24K_MONO;
        write_wav(&path, &mock_samples(format), format)
    })
    .await
    .map_err(|e| VoiceError::Io(std::io::Error::other(e)))??;

    tracing::info!(path = %output.display(), "wrote mock speech");
    Ok(())
}
