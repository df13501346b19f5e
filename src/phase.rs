/*
 * The traffic phase sequencer.
 *
 * One lane at a time is given right of way: green for the bulk of the
 * requested time, then yellow for a fixed three seconds, then back to red.
 * Nothing here waits. The scheduler calls `tick` as often as it likes and the
 * sequencer moves on once the wall clock says the current phase is over.
 *
 * Only the active lane is stored, so at most one head can be off red.
 */

use embassy_time::{Duration, Instant};
use thiserror::Error;

use crate::detector::LaneDetector;
use crate::lane::{LaneId, NUM_LANES};
use crate::signal::{Color, SignalSink};

pub const YELLOW_SECONDS: u32 = 3;
pub const YELLOW_DURATION: Duration = Duration::from_secs(YELLOW_SECONDS as u64);

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Phase {
    Idle,
    Green {
        lane: LaneId,
        started_at: Instant,
        green_for: Duration,
    },
    Yellow {
        lane: LaneId,
        started_at: Instant,
    },
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseError {
    #[error("lane {active:?} still has right of way")]
    Busy { active: LaneId },
    #[error("{seconds}s does not leave room for the yellow phase")]
    TooShort { seconds: u32 },
}

/// Reported by `tick` when the phase changes.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    ToYellow(LaneId),
    ToIdle { lane: LaneId, reset: Option<LaneId> },
}

#[derive(Debug)]
pub struct PhaseController {
    phase: Phase,
    pending_reset: Option<LaneId>,
}

impl PhaseController {
    /// Starts idle. All heads are shown red.
    pub fn new(signals: &mut impl SignalSink) -> Self {
        all_red(signals);
        PhaseController {
            phase: Phase::Idle,
            pending_reset: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_lane(&self) -> Option<LaneId> {
        match self.phase {
            Phase::Idle => None,
            Phase::Green { lane, .. } | Phase::Yellow { lane, .. } => Some(lane),
        }
    }

    pub fn pending_reset(&self) -> Option<LaneId> {
        self.pending_reset
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /*
     * Give `lane` right of way for `total_seconds`, yellow included. Requests
     * are not queued; one that arrives mid-cycle is dropped and the caller is
     * expected to ask again next time round.
     */
    pub fn request_green(
        &mut self,
        lane: LaneId,
        total_seconds: u32,
        now: Instant,
        signals: &mut impl SignalSink,
    ) -> Result<(), PhaseError> {
        if let Some(active) = self.active_lane() {
            warn!("green for {} refused: {} is active", lane, active);
            return Err(PhaseError::Busy { active });
        }
        if total_seconds <= YELLOW_SECONDS {
            warn!("green for {} refused: {}s is too short", lane, total_seconds);
            return Err(PhaseError::TooShort {
                seconds: total_seconds,
            });
        }

        all_red(signals);
        signals.set_lane_color(lane, Color::Green);
        self.phase = Phase::Green {
            lane,
            started_at: now,
            green_for: Duration::from_secs(u64::from(total_seconds - YELLOW_SECONDS)),
        };
        info!("{} green for {}s", lane, total_seconds);
        Ok(())
    }

    /// Zero `lane`'s count once the running cycle has finished.
    pub fn request_reset(&mut self, lane: LaneId) {
        self.pending_reset = Some(lane);
    }

    pub fn tick(
        &mut self,
        now: Instant,
        signals: &mut impl SignalSink,
        detectors: &mut [LaneDetector; NUM_LANES],
    ) -> Option<Transition> {
        match self.phase {
            Phase::Idle => None,
            Phase::Green {
                lane,
                started_at,
                green_for,
            } => {
                if now.saturating_duration_since(started_at) < green_for {
                    return None;
                }
                signals.set_lane_color(lane, Color::Yellow);
                self.phase = Phase::Yellow {
                    lane,
                    started_at: now,
                };
                info!("{} yellow", lane);
                Some(Transition::ToYellow(lane))
            }
            Phase::Yellow { lane, started_at } => {
                if now.saturating_duration_since(started_at) < YELLOW_DURATION {
                    return None;
                }
                signals.set_lane_color(lane, Color::Red);
                self.phase = Phase::Idle;
                let reset = self.pending_reset.take();
                if let Some(reset) = reset {
                    detectors[reset.index()].reset();
                    info!("{} count reset", reset);
                }
                info!("{} red, idle", lane);
                Some(Transition::ToIdle { lane, reset })
            }
        }
    }
}

fn all_red(signals: &mut impl SignalSink) {
    for lane in LaneId::ALL {
        signals.set_lane_color(lane, Color::Red);
    }
}
