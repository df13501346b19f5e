use enum_ordinalize::Ordinalize;

/// One traffic approach: one ultrasonic sensor and one signal head.
///
/// The ordinal is the lane's index into every per-lane array on the node.
#[derive(Ordinalize, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LaneId {
    Lane1,
    Lane2,
    Lane3,
    Lane4,
}

pub const NUM_LANES: usize = LaneId::VARIANT_COUNT;

impl LaneId {
    pub const ALL: [LaneId; NUM_LANES] = [
        LaneId::Lane1,
        LaneId::Lane2,
        LaneId::Lane3,
        LaneId::Lane4,
    ];

    pub fn index(self) -> usize {
        self.ordinal() as usize
    }

    pub fn from_index(index: usize) -> Option<LaneId> {
        u8::try_from(index).ok().and_then(LaneId::from_ordinal)
    }

    /// The 1-based number the decision service uses ("lane2" is 2).
    pub fn number(self) -> u8 {
        self.ordinal() + 1
    }

    pub fn from_number(number: u8) -> Option<LaneId> {
        number.checked_sub(1).and_then(LaneId::from_ordinal)
    }
}
