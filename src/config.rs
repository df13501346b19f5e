use embassy_time::Duration;

use crate::lane::{LaneId, NUM_LANES};

/// Node tuning. There is no file system on the board, so the firmware builds
/// this from constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Closer than this (cm) is a vehicle, per lane.
    pub thresholds_cm: [u16; NUM_LANES],
    pub poll_interval: Duration,
    pub report_interval: Duration,
}

impl NodeConfig {
    pub const DEFAULT: NodeConfig = NodeConfig {
        thresholds_cm: [10; NUM_LANES],
        poll_interval: Duration::from_millis(10),
        report_interval: Duration::from_secs(5),
    };

    pub const fn with_threshold(mut self, lane: LaneId, threshold_cm: u16) -> Self {
        self.thresholds_cm[lane as usize] = threshold_cm;
        self
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig::DEFAULT
    }
}
