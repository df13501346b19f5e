/*
 * The hand-off between the control loop and the task that talks to the
 * decision service.
 *
 * The control loop must never wait on the network, so it does not call the
 * service itself. It drops a copy of the report into a channel and picks up
 * the decision as soon as the uplink task has received it, on whichever pass
 * of the loop comes next. Both sides use `try_` operations on the loop's end,
 * so nothing here can block.
 */

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};

use crate::report::{Decision, Report, ReportSink};

pub struct ChannelUplink<'a, M: RawMutex, const N: usize> {
    reports: Sender<'a, M, Report, N>,
    decisions: Receiver<'a, M, Decision, N>,
}

impl<'a, M: RawMutex, const N: usize> ChannelUplink<'a, M, N> {
    pub fn new(reports: Sender<'a, M, Report, N>, decisions: Receiver<'a, M, Decision, N>) -> Self {
        ChannelUplink { reports, decisions }
    }
}

impl<M: RawMutex, const N: usize> ReportSink for ChannelUplink<'_, M, N> {
    fn report(&mut self, report: &Report) -> Option<Decision> {
        if self.reports.try_send(*report).is_err() {
            // The previous report is still in flight. This one is dropped;
            // the next cadence brings fresher numbers anyway.
            warn!("uplink busy, report dropped");
        }

        self.pending_decision()
    }

    fn pending_decision(&mut self) -> Option<Decision> {
        // Only the newest decision matters.
        let mut latest = None;
        while let Ok(decision) = self.decisions.try_receive() {
            if latest.is_some() {
                debug!("superseded decision discarded");
            }
            latest = Some(decision);
        }
        latest
    }
}
