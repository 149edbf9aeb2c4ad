//! CD audio volume table
//!
//! Drives report volume as 0..=255. The table maps that onto a dB-like
//! curve spanning 48 dB, with the endpoints pinned to silence and unity.

use once_cell::sync::Lazy;

/// Number of table entries
pub const VOLUME_STEPS: usize = 256;

/// Attenuation range covered by the table, in dB
const RANGE_DB: f64 = 48.0;

static CD_VOLUME_LUT: Lazy<[f64; VOLUME_STEPS]> = Lazy::new(build_table);

fn build_table() -> [f64; VOLUME_STEPS] {
    let mut lut = [0.0f64; VOLUME_STEPS];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = match i {
            0 => 0.0,
            255 => 1.0,
            _ => {
                let db = 20.0 * (i as f64 / 256.0).log10();
                ((RANGE_DB + db) / RANGE_DB).clamp(0.0, 1.0)
            }
        };
    }
    lut
}

/// Linear gain for a drive-reported volume
#[inline]
pub fn cd_volume(index: u8) -> f64 {
    CD_VOLUME_LUT[index as usize]
}

/// The whole table
pub fn cd_volume_table() -> &'static [f64; VOLUME_STEPS] {
    &CD_VOLUME_LUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_endpoints() {
        assert_eq!(cd_volume(255), 1.0);
        assert_eq!(cd_volume(0), 0.0);
    }

    #[test]
    fn test_monotonic() {
        let lut = cd_volume_table();
        for pair in lut.windows(2) {
            assert!(pair[1] >= pair[0], "{} < {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_curve_values() {
        // Half scale sits 6 dB down
        assert_relative_eq!(cd_volume(128), (48.0 - 6.0206) / 48.0, epsilon = 1e-4);
        // Bottom of the curve is clamped to silence
        assert_eq!(cd_volume(1), 0.0);
        assert!(cd_volume(254) < 1.0);
    }
}
