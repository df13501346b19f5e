/*
 * Lane signal node: the hardware-independent part.
 *
 * Ultrasonic sensors count vehicles per lane, the counts go to a decision
 * service, and the service's answer is played out as a green, yellow, red
 * sequence on the lane's signal head. Everything in this crate runs on one
 * thread without ever sleeping, so the sensors keep being read while a phase
 * is running.
 *
 * The board-specific code (pins, UART, executor) lives in the firmware binary;
 * it reaches this crate only through the traits in `range`, `ambient`,
 * `report` and `signal`. That keeps all of the logic testable on the host.
 */
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod ambient;
pub mod cadence;
pub mod config;
pub mod detector;
pub mod lane;
pub mod phase;
pub mod range;
pub mod report;
pub mod scheduler;
pub mod signal;
pub mod uplink;
pub mod wire;

pub use config::NodeConfig;
pub use lane::{LaneId, NUM_LANES};
pub use scheduler::Scheduler;
