/*
 * Signal heads.
 *
 * The control logic thinks in colours per lane; the board thinks in output
 * pins, some of which are wired active-low. This module keeps the two apart:
 * the phase controller sets a colour per lane, and the I/O layer asks for the
 * resulting pin levels and writes them out. That keeps the control logic
 * testable without any GPIO.
 */

use enum_ordinalize::Ordinalize;

use crate::lane::{LaneId, NUM_LANES};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Red,
    Yellow,
    Green,
}

/// Where lane colours go. Writes are fire-and-forget.
pub trait SignalSink {
    fn set_lane_color(&mut self, lane: LaneId, color: Color);
}

#[derive(Ordinalize, Clone, Copy)]
#[repr(usize)]
pub enum Pins {
    Lane1Red,
    Lane1Yellow,
    Lane1Green,

    Lane2Red,
    Lane2Yellow,
    Lane2Green,

    Lane3Red,
    Lane3Yellow,
    Lane3Green,

    Lane4Red,
    Lane4Yellow,
    Lane4Green,
}

pub const NUM_PINS: usize = Pins::VARIANT_COUNT;

pub fn pin_for(lane: LaneId, color: Color) -> Pins {
    match (lane, color) {
        (LaneId::Lane1, Color::Red) => Pins::Lane1Red,
        (LaneId::Lane1, Color::Yellow) => Pins::Lane1Yellow,
        (LaneId::Lane1, Color::Green) => Pins::Lane1Green,
        (LaneId::Lane2, Color::Red) => Pins::Lane2Red,
        (LaneId::Lane2, Color::Yellow) => Pins::Lane2Yellow,
        (LaneId::Lane2, Color::Green) => Pins::Lane2Green,
        (LaneId::Lane3, Color::Red) => Pins::Lane3Red,
        (LaneId::Lane3, Color::Yellow) => Pins::Lane3Yellow,
        (LaneId::Lane3, Color::Green) => Pins::Lane3Green,
        (LaneId::Lane4, Color::Red) => Pins::Lane4Red,
        (LaneId::Lane4, Color::Yellow) => Pins::Lane4Yellow,
        (LaneId::Lane4, Color::Green) => Pins::Lane4Green,
    }
}

pub struct SignalHeads {
    colors: [Color; NUM_LANES],
    active_lows: [bool; NUM_PINS],
}

impl SignalHeads {
    /// Every head starts out red.
    pub const fn new(active_lows: [bool; NUM_PINS]) -> Self {
        SignalHeads {
            colors: [Color::Red; NUM_LANES],
            active_lows,
        }
    }

    pub fn color(&self, lane: LaneId) -> Color {
        self.colors[lane.index()]
    }

    pub fn colors(&self) -> [Color; NUM_LANES] {
        self.colors
    }

    /// Number of heads currently showing something other than red.
    pub fn non_red(&self) -> usize {
        self.colors.iter().filter(|c| **c != Color::Red).count()
    }

    /// Electrical level for every pin, `true` meaning drive high.
    pub fn pin_levels(&self) -> [bool; NUM_PINS] {
        let mut levels = [false; NUM_PINS];
        for lane in LaneId::ALL {
            levels[pin_for(lane, self.color(lane)).ordinal()] = true;
        }
        for (level, active_low) in levels.iter_mut().zip(self.active_lows.iter()) {
            if *active_low {
                *level = !*level;
            }
        }
        levels
    }
}

impl SignalSink for SignalHeads {
    fn set_lane_color(&mut self, lane: LaneId, color: Color) {
        self.colors[lane.index()] = color;
    }
}
