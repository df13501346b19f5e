/*
 * The control loop.
 *
 * Three jobs share one thread: reading every lane sensor every few
 * milliseconds, moving the signal phase along, and reporting to the decision
 * service every few seconds. None of them sleeps. `run_once` does whatever is
 * due at `now` and returns; the caller decides how often to call it.
 *
 * Sensors go first in every pass so that phase or report work can never push
 * a sample back. The only time spent waiting is inside the distance source,
 * which has a hard upper bound per read.
 */

use embassy_time::Instant;

use crate::ambient::AmbientSource;
use crate::cadence::Cadence;
use crate::config::NodeConfig;
use crate::detector::{LaneDetector, LaneEvent};
use crate::lane::{LaneId, NUM_LANES};
use crate::phase::{PhaseController, Transition};
use crate::range::{DistanceSample, DistanceSource, Range, SensorStats};
use crate::report::{Decision, LaneReport, Report, ReportSink};
use crate::signal::SignalSink;

/// What one pass of the loop did.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Pass {
    pub polled: bool,
    pub transition: Option<Transition>,
    pub reported: bool,
}

pub struct Scheduler<D, A, R, S> {
    detectors: [LaneDetector; NUM_LANES],
    last_ranges: [Option<Range>; NUM_LANES],
    stats: [SensorStats; NUM_LANES],
    phase: PhaseController,
    poll_cadence: Cadence,
    report_cadence: Cadence,
    distance: D,
    ambient: A,
    reports: R,
    signals: S,
}

impl<D, A, R, S> Scheduler<D, A, R, S>
where
    D: DistanceSource,
    A: AmbientSource,
    R: ReportSink,
    S: SignalSink,
{
    pub fn new(config: &NodeConfig, distance: D, ambient: A, reports: R, mut signals: S) -> Self {
        let phase = PhaseController::new(&mut signals);
        Scheduler {
            detectors: config.thresholds_cm.map(LaneDetector::new),
            last_ranges: [None; NUM_LANES],
            stats: [SensorStats::new(); NUM_LANES],
            phase,
            poll_cadence: Cadence::new(config.poll_interval),
            report_cadence: Cadence::new(config.report_interval),
            distance,
            ambient,
            reports,
            signals,
        }
    }

    pub fn run_once(&mut self, now: Instant) -> Pass {
        let polled = self.poll_cadence.due(now);
        if polled {
            self.poll_sensors(now);
        }

        let transition = self.phase.tick(now, &mut self.signals, &mut self.detectors);

        let reported = self.report_cadence.due(now);
        if reported {
            self.report(now);
        } else if let Some(decision) = self.reports.pending_decision() {
            self.apply(decision, now);
        }

        Pass {
            polled,
            transition,
            reported,
        }
    }

    fn poll_sensors(&mut self, now: Instant) {
        for lane in LaneId::ALL {
            let range = self.distance.read_distance(lane);
            let i = lane.index();
            self.stats[i].record(range);
            self.last_ranges[i] = Some(range);

            let sample = DistanceSample {
                lane,
                range,
                captured_at: now,
            };
            match self.detectors[i].observe(&sample) {
                Some(LaneEvent::Entered) => trace!("{} vehicle entered", lane),
                Some(LaneEvent::Exited) => {
                    debug!("{} vehicle {}", lane, self.detectors[i].vehicle_count())
                }
                None => {}
            }
        }
    }

    pub fn snapshot(&mut self, now: Instant) -> Report {
        let lanes = core::array::from_fn(|i| {
            LaneReport::new(self.detectors[i].snapshot(), self.last_ranges[i])
        });
        Report {
            taken_at: now,
            lanes,
            ambient: self.ambient.read_ambient(),
        }
    }

    fn report(&mut self, now: Instant) {
        let report = self.snapshot(now);
        for lane in LaneId::ALL {
            let stats = self.stats[lane.index()];
            if stats.faults() > 0 {
                debug!("{} sensor {}", lane, stats);
            }
        }
        info!("report: {} vehicles waiting", report.total_vehicles());

        match self.reports.report(&report) {
            Some(decision) => self.apply(decision, now),
            None => trace!("no decision"),
        }
    }

    fn apply(&mut self, decision: Decision, now: Instant) {
        let Some(lane) = decision.active else {
            debug!("decision: all lanes stay red");
            return;
        };

        if let Err(err) =
            self.phase
                .request_green(lane, decision.duration_seconds, now, &mut self.signals)
        {
            warn!("decision for {} not applied: {}", lane, err);
            return;
        }

        match decision.reset {
            Some(reset) if reset == lane => self.phase.request_reset(reset),
            Some(reset) => warn!("reset of {} ignored, {} has the green", reset, lane),
            None => {}
        }
    }

    pub fn detector(&self, lane: LaneId) -> &LaneDetector {
        &self.detectors[lane.index()]
    }

    pub fn sensor_stats(&self, lane: LaneId) -> SensorStats {
        self.stats[lane.index()]
    }

    pub fn phase(&self) -> &PhaseController {
        &self.phase
    }

    pub fn signals(&self) -> &S {
        &self.signals
    }

    pub fn distance_source_mut(&mut self) -> &mut D {
        &mut self.distance
    }

    pub fn report_sink_mut(&mut self) -> &mut R {
        &mut self.reports
    }
}
