use std::fmt::{self, Display};

/// The opaque identifier of a master component.
///
/// It packs the slot index of the component in the low half and the slot's
/// generation in the high half, so a disposed handle never aliases the component
/// later registered in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MasterHandle(u64);

impl MasterHandle {
    pub(super) fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub(super) fn index(self) -> usize {
        (self.0 & u32::MAX as u64) as usize
    }

    pub(super) fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl Display for MasterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
