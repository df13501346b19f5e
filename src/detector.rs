/*
 * Per-lane vehicle detection.
 *
 * Each lane has one sensor looking across the approach. Something closer than
 * the lane's threshold is a vehicle sitting in front of the sensor. A vehicle
 * is counted when it leaves, so a car that parks in front of the sensor is
 * counted once, when it finally drives off.
 */

use embassy_time::Instant;

use crate::range::{DistanceSample, Range};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Presence {
    Clear,
    Occupied,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaneEvent {
    Entered,
    Exited,
}

#[derive(Debug)]
pub struct LaneDetector {
    threshold_cm: u16,
    presence: Presence,
    vehicle_count: u32,
    first_occupied_at: Option<Instant>,
}

/// What the reporting side gets to see of a detector.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct LaneSnapshot {
    pub presence: Presence,
    pub vehicle_count: u32,
    pub first_occupied_at: Option<Instant>,
}

impl LaneDetector {
    pub const fn new(threshold_cm: u16) -> Self {
        LaneDetector {
            threshold_cm,
            presence: Presence::Clear,
            vehicle_count: 0,
            first_occupied_at: None,
        }
    }

    fn is_close(&self, range: Range) -> bool {
        matches!(range, Range::Centimeters(cm) if cm > 0 && cm <= self.threshold_cm)
    }

    fn is_gone(&self, range: Range) -> bool {
        match range {
            Range::Centimeters(cm) => cm > self.threshold_cm,
            // A dead sensor reads as an empty lane, so a wiring fault can
            // never hold the lane occupied.
            Range::Timeout | Range::Stuck => true,
        }
    }

    pub fn observe(&mut self, sample: &DistanceSample) -> Option<LaneEvent> {
        match self.presence {
            Presence::Clear if self.is_close(sample.range) => {
                self.presence = Presence::Occupied;
                if self.first_occupied_at.is_none() {
                    self.first_occupied_at = Some(sample.captured_at);
                }
                Some(LaneEvent::Entered)
            }
            Presence::Occupied if self.is_gone(sample.range) => {
                self.presence = Presence::Clear;
                self.vehicle_count = self.vehicle_count.saturating_add(1);
                Some(LaneEvent::Exited)
            }
            Presence::Clear | Presence::Occupied => None,
        }
    }

    /*
     * Start a new counting window. Presence is left alone: a vehicle that is
     * in front of the sensor right now is still there, and will be counted
     * into the new window when it leaves.
     */
    pub fn reset(&mut self) {
        self.vehicle_count = 0;
        self.first_occupied_at = None;
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn vehicle_count(&self) -> u32 {
        self.vehicle_count
    }

    pub fn first_occupied_at(&self) -> Option<Instant> {
        self.first_occupied_at
    }

    pub fn snapshot(&self) -> LaneSnapshot {
        LaneSnapshot {
            presence: self.presence,
            vehicle_count: self.vehicle_count,
            first_occupied_at: self.first_occupied_at,
        }
    }
}
