//! Shared mixer constants
//!
//! Rates and period lengths used when no [`SoundConfig`](crate::SoundConfig)
//! override is given.

/// Sound (effects) stream sample rate in Hz
pub const SOUND_FREQ: u32 = 48_000;
/// Music stream sample rate in Hz (OPL native rate)
pub const MUSIC_FREQ: u32 = 49_716;
/// Wavetable stream sample rate in Hz
pub const WT_FREQ: u32 = 44_100;
/// CD audio sample rate in Hz
pub const CD_FREQ: u32 = 44_100;

/// Stream periods per second (sound, music, wavetable)
pub const PERIODS_PER_SECOND: u32 = 50;
/// CD worker blocks per second
pub const CD_PERIODS_PER_SECOND: u32 = 10;

/// Sound stream period length in stereo frames
pub const SOUNDBUFLEN: usize = (SOUND_FREQ / PERIODS_PER_SECOND) as usize;
/// Music stream period length in stereo frames
pub const MUSICBUFLEN: usize = (MUSIC_FREQ / PERIODS_PER_SECOND) as usize;
/// Wavetable stream period length in stereo frames
pub const WTBUFLEN: usize = (WT_FREQ / PERIODS_PER_SECOND) as usize;
/// CD block length in stereo frames
pub const CD_BUFLEN: usize = (CD_FREQ / CD_PERIODS_PER_SECOND) as usize;

/// Maximum handlers per stream
pub const MAX_HANDLERS: usize = 8;
/// Number of CD-ROM drive slots
pub const CDROM_NUM: usize = 4;

/// Output channels per frame
pub const CHANNELS: usize = 2;

/// Full-scale divisor between 16-bit integer and normalized float samples
pub const SAMPLE_SCALE: f32 = 32768.0;

/// Master CD volume value meaning unity gain
pub const CD_VOLUME_MAX: u16 = u16::MAX;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_lengths() {
        assert_eq!(SOUNDBUFLEN, 960);
        assert_eq!(MUSICBUFLEN, 994);
        assert_eq!(WTBUFLEN, 882);
        assert_eq!(CD_BUFLEN, 4410);
    }
}
