//! Mixer configuration
//!
//! Rates, period divisors and the output sample format. Loaded from JSON or
//! built in code; every field falls back to its default when absent.

use crate::constants::{
    CD_FREQ, CD_PERIODS_PER_SECOND, MUSIC_FREQ, PERIODS_PER_SECOND, SOUND_FREQ, WT_FREQ,
};
use crate::stream::StreamKind;
use crate::{Result, SoundError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sample representation delivered to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Signed 16-bit, clamped
    #[default]
    Int16,
    /// 32-bit float, normalized to [-1.0, 1.0)
    Float,
}

/// Mixer configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Output sample format for all streams and the CD worker
    pub output_format: OutputFormat,
    /// Sound stream rate (Hz)
    pub sound_freq: u32,
    /// Music stream rate (Hz)
    pub music_freq: u32,
    /// Wavetable stream rate (Hz)
    pub wavetable_freq: u32,
    /// CD audio rate (Hz)
    pub cd_freq: u32,
    /// Stream periods per second
    pub period_divisor: u32,
    /// CD blocks per second
    pub cd_period_divisor: u32,
    /// Start the CD worker when drives are present
    pub cd_audio_enabled: bool,
}

impl Default for SoundConfig {
    fn default() -> Self {
        SoundConfig {
            output_format: OutputFormat::Int16,
            sound_freq: SOUND_FREQ,
            music_freq: MUSIC_FREQ,
            wavetable_freq: WT_FREQ,
            cd_freq: CD_FREQ,
            period_divisor: PERIODS_PER_SECOND,
            cd_period_divisor: CD_PERIODS_PER_SECOND,
            cd_audio_enabled: true,
        }
    }
}

impl SoundConfig {
    /// Shorter periods (10ms streams, 50ms CD blocks)
    pub fn low_latency() -> Self {
        SoundConfig {
            period_divisor: 100,
            cd_period_divisor: 20,
            ..Self::default()
        }
    }

    /// Same configuration with a different output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sample rate of a stream
    pub fn freq(&self, stream: StreamKind) -> u32 {
        match stream {
            StreamKind::Sound => self.sound_freq,
            StreamKind::Music => self.music_freq,
            StreamKind::Wavetable => self.wavetable_freq,
        }
    }

    /// Period length of a stream in stereo frames
    pub fn buffer_len(&self, stream: StreamKind) -> usize {
        (self.freq(stream) / self.period_divisor) as usize
    }

    /// CD block length in stereo frames
    pub fn cd_buffer_len(&self) -> usize {
        (self.cd_freq / self.cd_period_divisor) as usize
    }

    /// Sound periods between two CD worker signals
    pub fn cd_signal_interval(&self) -> u32 {
        let sound_periods = self.sound_freq / self.buffer_len(StreamKind::Sound).max(1) as u32;
        let cd_periods = self.cd_freq / self.cd_buffer_len().max(1) as u32;
        (sound_periods / cd_periods.max(1)).max(1)
    }

    /// Check that every rate and period is usable
    pub fn validate(&self) -> Result<()> {
        if self.period_divisor == 0 || self.cd_period_divisor == 0 {
            return Err(SoundError::ConfigError(
                "period divisors must be greater than 0".into(),
            ));
        }
        for stream in StreamKind::ALL {
            if self.buffer_len(stream) == 0 {
                return Err(SoundError::ConfigError(format!(
                    "{stream:?} rate {} Hz yields an empty period",
                    self.freq(stream)
                )));
            }
        }
        if self.cd_buffer_len() == 0 {
            return Err(SoundError::ConfigError(format!(
                "CD rate {} Hz yields an empty block",
                self.cd_freq
            )));
        }
        Ok(())
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SoundConfig = serde_json::from_str(json)
            .map_err(|e| SoundError::ConfigError(format!("malformed sound config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SoundError::ConfigError(format!("cannot serialize sound config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_periods() {
        let config = SoundConfig::default();
        assert_eq!(config.buffer_len(StreamKind::Sound), 960);
        assert_eq!(config.buffer_len(StreamKind::Music), 994);
        assert_eq!(config.buffer_len(StreamKind::Wavetable), 882);
        assert_eq!(config.cd_buffer_len(), 4410);
        assert_eq!(config.cd_signal_interval(), 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SoundConfig::from_json_str(r#"{ "output_format": "float" }"#).unwrap();
        assert_eq!(config.output_format, OutputFormat::Float);
        assert_eq!(config.sound_freq, SOUND_FREQ);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SoundConfig::low_latency().with_format(OutputFormat::Float);
        let json = config.to_json_string().unwrap();
        assert_eq!(SoundConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = SoundConfig {
            music_freq: 0,
            ..SoundConfig::default()
        };
        assert!(matches!(config.validate(), Err(SoundError::ConfigError(_))));

        let config = SoundConfig {
            cd_period_divisor: 0,
            ..SoundConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sound.json");
        std::fs::write(&path, r#"{ "cd_audio_enabled": false }"#).unwrap();
        let config = SoundConfig::load(&path).unwrap();
        assert!(!config.cd_audio_enabled);
    }
}
