/*
 * The serial wire format.
 *
 * The node talks newline-delimited JSON to the gateway that fronts the
 * decision service. Lanes are called "lane1" to "lane4" on the wire; that
 * naming stops here and the rest of the crate only sees `LaneId`.
 *
 * Report:   {"uptime":12000,"lane1":{"carCount":3,"firstTriggered":4210,"distance":180},...}
 * Decision: {"decision":{"activeLane":"lane2","duration":10,"resetLane":2}}
 */

use heapless::Vec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ambient::AmbientReading;
use crate::lane::LaneId;
use crate::report::{Decision, LaneReport, Report};

pub const LINE_CAPACITY: usize = 384;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    #[error("report does not fit the line buffer")]
    BufferFull,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecisionError {
    #[error("decision names a lane this node does not have")]
    UnknownLane,
    #[error("decision is not valid JSON of the expected shape")]
    Malformed,
}

fn lane_from_name(name: &str) -> Result<Option<LaneId>, DecisionError> {
    match name {
        "none" => Ok(None),
        "lane1" => Ok(Some(LaneId::Lane1)),
        "lane2" => Ok(Some(LaneId::Lane2)),
        "lane3" => Ok(Some(LaneId::Lane3)),
        "lane4" => Ok(Some(LaneId::Lane4)),
        _ => Err(DecisionError::UnknownLane),
    }
}

#[derive(Serialize)]
struct LaneWire {
    #[serde(rename = "carCount")]
    car_count: u32,
    #[serde(rename = "firstTriggered", skip_serializing_if = "Option::is_none")]
    first_triggered: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<u16>,
}

impl From<&LaneReport> for LaneWire {
    fn from(lane: &LaneReport) -> Self {
        LaneWire {
            car_count: lane.vehicle_count,
            first_triggered: lane.first_occupied_at.map(|at| at.as_millis()),
            distance: lane.last_range.and_then(|range| range.centimeters()),
        }
    }
}

#[derive(Serialize)]
struct ReportWire {
    uptime: u64,
    lane1: LaneWire,
    lane2: LaneWire,
    lane3: LaneWire,
    lane4: LaneWire,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pressure: Option<f32>,
    #[serde(rename = "ambientError", skip_serializing_if = "core::ops::Not::not")]
    ambient_error: bool,
}

impl From<&Report> for ReportWire {
    fn from(report: &Report) -> Self {
        let ambient = match report.ambient {
            Some(AmbientReading::Valid(ambient)) => Some(ambient),
            Some(AmbientReading::Invalid) | None => None,
        };
        ReportWire {
            uptime: report.taken_at.as_millis(),
            lane1: report.lane(LaneId::Lane1).into(),
            lane2: report.lane(LaneId::Lane2).into(),
            lane3: report.lane(LaneId::Lane3).into(),
            lane4: report.lane(LaneId::Lane4).into(),
            temperature: ambient.map(|a| a.temperature_c),
            humidity: ambient.map(|a| a.humidity_pct),
            pressure: ambient.map(|a| a.pressure_hpa),
            ambient_error: report.ambient == Some(AmbientReading::Invalid),
        }
    }
}

/// Writes `report` as one line, newline included. Returns the length.
pub fn encode_report(report: &Report, buf: &mut [u8]) -> Result<usize, WireError> {
    let len = serde_json_core::to_slice(&ReportWire::from(report), buf)
        .map_err(|_| WireError::BufferFull)?;
    let newline = buf.get_mut(len).ok_or(WireError::BufferFull)?;
    *newline = b'\n';
    Ok(len + 1)
}

#[derive(Deserialize)]
struct ReplyWire<'a> {
    #[serde(borrow)]
    decision: DecisionWire<'a>,
}

#[derive(Deserialize)]
struct DecisionWire<'a> {
    #[serde(rename = "activeLane")]
    active_lane: &'a str,
    duration: u32,
    // 1-based, 0 for none.
    #[serde(rename = "resetLane", default)]
    reset_lane: Option<u8>,
}

pub fn decode_decision(line: &[u8]) -> Result<Decision, DecisionError> {
    let line = line.trim_ascii();
    let (reply, _) = serde_json_core::from_slice::<ReplyWire<'_>>(line)
        .map_err(|_| DecisionError::Malformed)?;
    let reply = reply.decision;

    let reset = match reply.reset_lane {
        None | Some(0) => None,
        Some(number) => Some(LaneId::from_number(number).ok_or(DecisionError::UnknownLane)?),
    };
    Ok(Decision {
        active: lane_from_name(reply.active_lane)?,
        duration_seconds: reply.duration,
        reset,
    })
}

pub enum Feed<const N: usize> {
    Pending,
    Line(Vec<u8, N>),
    Overflow,
}

/// Collects received bytes into lines. A line that outgrows the buffer is
/// reported once and then skipped up to its newline.
pub struct LineAssembler<const N: usize> {
    line: Vec<u8, N>,
    discarding: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        LineAssembler {
            line: Vec::new(),
            discarding: false,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Feed<N> {
        match byte {
            b'\n' => {
                let line = core::mem::take(&mut self.line);
                if core::mem::take(&mut self.discarding) || line.is_empty() {
                    Feed::Pending
                } else {
                    Feed::Line(line)
                }
            }
            b'\r' => Feed::Pending,
            _ if self.discarding => Feed::Pending,
            _ => match self.line.push(byte) {
                Ok(()) => Feed::Pending,
                Err(_) => {
                    self.line.clear();
                    self.discarding = true;
                    Feed::Overflow
                }
            },
        }
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}
