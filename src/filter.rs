//! Filter hooks
//!
//! Sound cards with their own analog mixer install a filter that shapes the
//! CD audio or PC speaker signal. Only one filter per kind may be active: a
//! second install is refused until the first is cleared.

use crate::{Result, SoundError};

/// Signal a filter applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// CD audio, applied inside the CD worker
    CdAudio,
    /// PC speaker, applied by the speaker device
    PcSpeaker,
}

/// Per-sample filter on normalized `f64` samples
pub trait AudioFilter: Send {
    /// Filter one sample of `channel` (0 = left, 1 = right) in place
    fn filter(&mut self, channel: usize, sample: &mut f64);
}

impl<F> AudioFilter for F
where
    F: FnMut(usize, &mut f64) + Send,
{
    fn filter(&mut self, channel: usize, sample: &mut f64) {
        self(channel, sample)
    }
}

/// One install-once filter slot
#[derive(Default)]
pub struct FilterSlot {
    filter: Option<Box<dyn AudioFilter>>,
}

impl FilterSlot {
    /// Install or clear the filter
    ///
    /// `None` always clears. `Some` only succeeds when the slot is empty.
    pub fn set(&mut self, kind: FilterKind, filter: Option<Box<dyn AudioFilter>>) -> Result<()> {
        match filter {
            None => {
                self.clear();
                Ok(())
            }
            Some(_) if self.filter.is_some() => Err(SoundError::FilterInstalled(kind)),
            Some(f) => {
                self.filter = Some(f);
                Ok(())
            }
        }
    }

    /// Drop any installed filter
    pub fn clear(&mut self) {
        self.filter = None;
    }

    /// True when a filter is installed
    pub fn is_installed(&self) -> bool {
        self.filter.is_some()
    }

    /// Run the filter on one sample, if any
    #[inline]
    pub fn apply(&mut self, channel: usize, sample: &mut f64) {
        if let Some(f) = self.filter.as_mut() {
            f.filter(channel, sample);
        }
    }
}

impl std::fmt::Debug for FilterSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSlot")
            .field("installed", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halve() -> Box<dyn AudioFilter> {
        Box::new(|_channel: usize, s: &mut f64| *s *= 0.5)
    }

    #[test]
    fn test_second_install_refused() {
        let mut slot = FilterSlot::default();
        slot.set(FilterKind::CdAudio, Some(halve())).unwrap();
        let err = slot
            .set(FilterKind::CdAudio, Some(Box::new(|_: usize, s: &mut f64| *s = 0.0)))
            .unwrap_err();
        assert!(matches!(err, SoundError::FilterInstalled(FilterKind::CdAudio)));

        // First filter still active
        let mut sample = 1.0;
        slot.apply(0, &mut sample);
        assert_eq!(sample, 0.5);
    }

    #[test]
    fn test_clear_then_install() {
        let mut slot = FilterSlot::default();
        slot.set(FilterKind::PcSpeaker, Some(halve())).unwrap();
        slot.set(FilterKind::PcSpeaker, None).unwrap();
        assert!(!slot.is_installed());
        slot.set(FilterKind::PcSpeaker, Some(halve())).unwrap();
        assert!(slot.is_installed());
    }

    #[test]
    fn test_empty_slot_passes_through() {
        let mut slot = FilterSlot::default();
        let mut sample = 0.75;
        slot.apply(1, &mut sample);
        assert_eq!(sample, 0.75);
    }
}
