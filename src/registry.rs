//! Sound card registry
//!
//! Indexed lookup table of the sound cards a machine configuration can name.
//! Index 0 is always "none" and index 1 "internal" (the card built into the
//! motherboard, if any).

use bitflags::bitflags;
use std::path::PathBuf;

bitflags! {
    /// Sound card capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SoundCardFlags: u16 {
        /// 8/16-bit ISA card
        const ISA = 0x0001;
        /// Micro Channel card
        const MCA = 0x0002;
        /// PCI card
        const PCI = 0x0004;
        /// Has a configuration dialog
        const HAS_CONFIG = 0x0100;
        /// Only valid as the on-board device
        const ON_BOARD = 0x0200;
    }
}

/// One registry row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundCardEntry {
    /// Name used in configuration files
    pub internal_name: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Bus and configuration flags
    pub flags: SoundCardFlags,
    /// ROM image the card needs, relative to the ROM directory
    pub rom: Option<&'static str>,
}

const fn card(
    internal_name: &'static str,
    name: &'static str,
    flags: SoundCardFlags,
    rom: Option<&'static str>,
) -> SoundCardEntry {
    SoundCardEntry {
        internal_name,
        name,
        flags,
        rom,
    }
}

const ISA_CFG: SoundCardFlags = SoundCardFlags::ISA.union(SoundCardFlags::HAS_CONFIG);

static SOUND_CARDS: &[SoundCardEntry] = &[
    card("none", "None", SoundCardFlags::empty(), None),
    card("internal", "Internal", SoundCardFlags::ON_BOARD, None),
    card("adlib", "AdLib", SoundCardFlags::ISA, None),
    card("adlibgold", "AdLib Gold", ISA_CFG, Some("adlibgold/adlib.bin")),
    card("cms", "Creative Music System / Game Blaster", ISA_CFG, None),
    card("gus", "Gravis UltraSound", ISA_CFG, None),
    card("sb", "Sound Blaster 1.0", ISA_CFG, None),
    card("sb2", "Sound Blaster 2.0", ISA_CFG, None),
    card("sbpro", "Sound Blaster Pro", ISA_CFG, None),
    card("sb16", "Sound Blaster 16", ISA_CFG, None),
    card("sbawe32", "Sound Blaster AWE32", ISA_CFG, Some("awe32.raw")),
    card("ssi2001", "Innovation SSI-2001", ISA_CFG, None),
    card("wss", "Windows Sound System", ISA_CFG, None),
    card(
        "sbmcv",
        "Sound Blaster MCV",
        SoundCardFlags::MCA.union(SoundCardFlags::HAS_CONFIG),
        None,
    ),
    card(
        "es1371",
        "Ensoniq AudioPCI (ES1371)",
        SoundCardFlags::PCI.union(SoundCardFlags::HAS_CONFIG),
        None,
    ),
];

/// Lookup front-end over the static sound card table
#[derive(Debug, Clone, Default)]
pub struct SoundCardRegistry {
    rom_dir: Option<PathBuf>,
}

impl SoundCardRegistry {
    /// Registry that treats ROM-dependent cards as unavailable
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that looks for card ROMs under `rom_dir`
    pub fn with_rom_dir<P: Into<PathBuf>>(rom_dir: P) -> Self {
        SoundCardRegistry {
            rom_dir: Some(rom_dir.into()),
        }
    }

    /// Number of entries
    pub fn count(&self) -> usize {
        SOUND_CARDS.len()
    }

    /// Entry at `index`
    pub fn get_device(&self, index: usize) -> Option<&'static SoundCardEntry> {
        SOUND_CARDS.get(index)
    }

    /// Internal name at `index`
    pub fn get_internal_name(&self, index: usize) -> Option<&'static str> {
        self.get_device(index).map(|c| c.internal_name)
    }

    /// Index of the card named `name`
    pub fn get_from_internal_name(&self, name: &str) -> Option<usize> {
        SOUND_CARDS.iter().position(|c| c.internal_name == name)
    }

    /// Whether the card at `index` can be used
    ///
    /// Cards needing a ROM are only available when the image exists.
    pub fn is_available(&self, index: usize) -> bool {
        let Some(card) = self.get_device(index) else {
            return false;
        };
        match card.rom {
            None => true,
            Some(rom) => self
                .rom_dir
                .as_ref()
                .is_some_and(|dir| dir.join(rom).is_file()),
        }
    }

    /// Whether the card at `index` has configurable settings
    pub fn has_config(&self, index: usize) -> bool {
        self.get_device(index)
            .is_some_and(|c| c.flags.contains(SoundCardFlags::HAS_CONFIG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_leading_entries() {
        let reg = SoundCardRegistry::new();
        assert_eq!(reg.get_internal_name(0), Some("none"));
        assert_eq!(reg.get_internal_name(1), Some("internal"));
        assert_eq!(reg.get_internal_name(reg.count()), None);
    }

    #[test]
    fn test_name_lookup_round_trip() {
        let reg = SoundCardRegistry::new();
        for i in 0..reg.count() {
            let name = reg.get_internal_name(i).unwrap();
            assert_eq!(reg.get_from_internal_name(name), Some(i));
        }
        assert_eq!(reg.get_from_internal_name("nonexistent"), None);
    }

    #[test]
    fn test_config_flag() {
        let reg = SoundCardRegistry::new();
        let sb16 = reg.get_from_internal_name("sb16").unwrap();
        let adlib = reg.get_from_internal_name("adlib").unwrap();
        assert!(reg.has_config(sb16));
        assert!(!reg.has_config(adlib));
    }

    #[test]
    fn test_rom_availability() {
        let reg = SoundCardRegistry::new();
        let awe = reg.get_from_internal_name("sbawe32").unwrap();
        assert!(!reg.is_available(awe));
        assert!(reg.is_available(0));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("awe32.raw"), [0u8; 16]).unwrap();
        let reg = SoundCardRegistry::with_rom_dir(dir.path());
        assert!(reg.is_available(awe));
    }
}
