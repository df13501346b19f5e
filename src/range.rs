/*
 * Ultrasonic range readings.
 *
 * An HC-SR04 style sensor answers a trigger pulse by holding its echo line high
 * for as long as the sound took to travel to the obstacle and back. The I/O
 * layer only measures that pulse. Turning the pulse, or the lack of one, into
 * a distance lives here so that it can be tested without hardware.
 */

use embassy_time::{Duration, Instant};

use crate::lane::LaneId;

/// Readings beyond this are reported as this value.
pub const MAX_RANGE_CM: u16 = 400;

/// Longest echo pulse the I/O layer waits for. A little over the round trip to
/// `MAX_RANGE_CM`, so every in-range echo terminates before it.
pub const MAX_ECHO: Duration = Duration::from_millis(25);

/// How long the I/O layer waits for the echo line to rise after a trigger.
pub const ECHO_RISE_TIMEOUT: Duration = Duration::from_millis(5);

/// What the I/O layer observed on the echo line after one trigger.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Echo {
    /// The line was already high before the trigger, so it cannot be read.
    AlreadyHigh,
    /// The line never rose within `ECHO_RISE_TIMEOUT`.
    NoRise,
    /// The line rose and fell again; the pulse width.
    Pulse(Duration),
    /// The line rose but was still high after `MAX_ECHO`.
    Unterminated,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    Centimeters(u16),
    Timeout,
    Stuck,
}

impl Range {
    // Sound covers 0.034 cm/µs and the pulse spans the round trip.
    pub fn from_echo(echo: Echo) -> Range {
        match echo {
            Echo::AlreadyHigh => Range::Stuck,
            Echo::NoRise | Echo::Unterminated => Range::Timeout,
            Echo::Pulse(width) => {
                let cm = width.as_micros() * 17 / 1000;
                match u16::try_from(cm) {
                    // A zero reading is what a lost echo looks like; treat it as far away.
                    Ok(0) => Range::Centimeters(MAX_RANGE_CM),
                    Ok(cm) if cm <= MAX_RANGE_CM => Range::Centimeters(cm),
                    _ => Range::Centimeters(MAX_RANGE_CM),
                }
            }
        }
    }

    pub fn centimeters(self) -> Option<u16> {
        match self {
            Range::Centimeters(cm) => Some(cm),
            Range::Timeout | Range::Stuck => None,
        }
    }
}

/// One reading per call. Implementations must return within `ECHO_RISE_TIMEOUT`
/// plus `MAX_ECHO`; a sensor that does not answer in time is a `Timeout`.
pub trait DistanceSource {
    fn read_distance(&mut self, lane: LaneId) -> Range;
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct DistanceSample {
    pub lane: LaneId,
    pub range: Range,
    pub captured_at: Instant,
}

/// Running tallies of how reads went. Informational only; nothing in the
/// control path looks at these.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorStats {
    pub good: u32,
    pub timeouts: u32,
    pub stuck: u32,
}

impl SensorStats {
    pub const fn new() -> Self {
        SensorStats {
            good: 0,
            timeouts: 0,
            stuck: 0,
        }
    }

    pub fn record(&mut self, range: Range) {
        let tally = match range {
            Range::Centimeters(_) => &mut self.good,
            Range::Timeout => &mut self.timeouts,
            Range::Stuck => &mut self.stuck,
        };
        *tally = tally.wrapping_add(1);
    }

    pub fn faults(&self) -> u32 {
        self.timeouts.wrapping_add(self.stuck)
    }
}
