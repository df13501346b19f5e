/*
 * Periodic deadlines without sleeping.
 *
 * A cadence answers one question: given the time now, is it time to run
 * again? The first run is due immediately. After that it stays on its grid,
 * so a run that happens a little late does not push every later run back.
 * When the loop falls so far behind that a whole period was missed, the
 * missed runs are dropped instead of being caught up in a burst.
 */

use embassy_time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period: Duration,
    next_due: Option<Instant>,
}

impl Cadence {
    pub const fn new(period: Duration) -> Self {
        Cadence {
            period,
            next_due: None,
        }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(next_due) if now < next_due => false,
            Some(next_due) => {
                let next = next_due + self.period;
                self.next_due = Some(if next <= now { now + self.period } else { next });
                true
            }
            None => {
                self.next_due = Some(now + self.period);
                true
            }
        }
    }
}
