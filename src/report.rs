use embassy_time::Instant;

use crate::ambient::AmbientReading;
use crate::detector::LaneSnapshot;
use crate::lane::{LaneId, NUM_LANES};
use crate::range::Range;

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct LaneReport {
    pub vehicle_count: u32,
    pub first_occupied_at: Option<Instant>,
    /// The most recent reading, if there has been one.
    pub last_range: Option<Range>,
}

impl LaneReport {
    pub fn new(snapshot: LaneSnapshot, last_range: Option<Range>) -> Self {
        LaneReport {
            vehicle_count: snapshot.vehicle_count,
            first_occupied_at: snapshot.first_occupied_at,
            last_range,
        }
    }
}

/// Everything the decision service gets to see, taken in one go so that lanes
/// are never mixed from different moments.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Report {
    pub taken_at: Instant,
    pub lanes: [LaneReport; NUM_LANES],
    pub ambient: Option<AmbientReading>,
}

impl Report {
    pub fn lane(&self, lane: LaneId) -> &LaneReport {
        &self.lanes[lane.index()]
    }

    pub fn total_vehicles(&self) -> u32 {
        self.lanes
            .iter()
            .fold(0u32, |total, lane| total.saturating_add(lane.vehicle_count))
    }
}

/// What the decision service wants done next.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    /// `None` means leave every lane red.
    pub active: Option<LaneId>,
    pub duration_seconds: u32,
    pub reset: Option<LaneId>,
}

/// Hands a report to the decision service. Failures are swallowed by the
/// sink and come back as "no decision"; the next report carries fresh data.
pub trait ReportSink {
    fn report(&mut self, report: &Report) -> Option<Decision>;

    /// A decision that arrived after the last report returned, if the sink
    /// delivers replies asynchronously. Polled on every pass of the loop.
    fn pending_decision(&mut self) -> Option<Decision> {
        None
    }
}
