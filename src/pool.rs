//! Fixed-Capacity Slot Pools
//!
//! Server contexts and client sessions live in fixed arrays sized by
//! [`crate::constants::MAX_CONNECTIONS`]. A slot is claimed by scanning for a
//! free one and is addressed afterwards by a small [`SlotId`], never by
//! reference, so no slot outlives the table that owns it.

use crate::sdp::SdpError;

/// Index of a claimed slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SlotId(pub u8);

/// Item that can be stored in a [`SlotPool`]
pub trait PoolSlot: Default {
    /// Whether the slot is unclaimed
    fn is_free(&self) -> bool;
}

/// Fixed array of `N` slots with a free/used marker per slot
#[derive(Debug)]
pub struct SlotPool<T, const N: usize> {
    slots: [T; N],
}

impl<T: PoolSlot, const N: usize> SlotPool<T, N> {
    /// Create a pool with every slot free
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| T::default()),
        }
    }

    /// Claim the first free slot and initialize it with `init`.
    ///
    /// # Errors
    /// Returns `SdpError::ResourceExhausted` if every slot is in use
    pub fn acquire(&mut self, init: impl FnOnce(&mut T)) -> Result<SlotId, SdpError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_free())
            .ok_or(SdpError::ResourceExhausted)?;

        init(slot);

        #[allow(clippy::cast_possible_truncation)]
        Ok(SlotId(index as u8))
    }

    /// Reset a slot to its free state
    pub fn release(&mut self, id: SlotId) {
        if let Some(slot) = self.slots.get_mut(usize::from(id.0)) {
            *slot = T::default();
        }
    }

    /// Find the first used slot matching `predicate`
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|slot| !slot.is_free() && predicate(slot))
            .and_then(|index| u8::try_from(index).ok())
            .map(SlotId)
    }

    /// Get a used slot
    #[must_use]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(usize::from(id.0))
            .filter(|slot| !slot.is_free())
    }

    /// Get a mutable reference to a used slot
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(usize::from(id.0))
            .filter(|slot| !slot.is_free())
    }

    /// Number of used slots
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }
}

impl<T: PoolSlot, const N: usize> Default for SlotPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
