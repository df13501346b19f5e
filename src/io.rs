/*
 * The I/O module for the lane signal node.
 *
 * This is the only part of the program that is device-specific. It provides
 * the ultrasonic sensors as a `DistanceSource`, writes signal head pin levels
 * to the GPIO, and runs the uplink task that carries reports to the decision
 * service gateway over the serial port and brings decisions back.
 *
 * The control loop and the uplink task share nothing but two channels.
 */

use defmt::{debug, warn};
use embassy_futures::select::{Either, select};
use embassy_stm32::{
    gpio::{Input, Level, Output},
    mode::Async,
    usart::{UartRx, UartTx},
};
use embassy_sync::{
    blocking_mutex::raw::ThreadModeRawMutex,
    channel::{Receiver, Sender},
};
use embassy_time::{Duration, Instant, Timer, block_for};

use lanesignal::{
    LaneId, NUM_LANES,
    range::{DistanceSource, ECHO_RISE_TIMEOUT, Echo, MAX_ECHO, Range},
    report::{Decision, Report},
    signal::NUM_PINS,
    wire::{Feed, LINE_CAPACITY, LineAssembler, decode_decision, encode_report},
};

pub const UPLINK_DEPTH: usize = 1;

/// A report that gets no answer within this is a failed report.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

const TRIGGER_PULSE: Duration = Duration::from_micros(10);

pub struct Ultrasonic {
    triggers: [Output<'static>; NUM_LANES],
    echoes: [Input<'static>; NUM_LANES],
}

impl Ultrasonic {
    pub fn new(triggers: [Output<'static>; NUM_LANES], echoes: [Input<'static>; NUM_LANES]) -> Self {
        Self { triggers, echoes }
    }

    // Busy-waits, but never longer than ECHO_RISE_TIMEOUT + MAX_ECHO.
    fn ping(&mut self, lane: LaneId) -> Echo {
        let echo = &self.echoes[lane.index()];
        if echo.is_high() {
            return Echo::AlreadyHigh;
        }

        let trigger = &mut self.triggers[lane.index()];
        trigger.set_high();
        block_for(TRIGGER_PULSE);
        trigger.set_low();

        let Some(rose_at) = wait_for_level(echo, true, ECHO_RISE_TIMEOUT) else {
            return Echo::NoRise;
        };
        match wait_for_level(echo, false, MAX_ECHO) {
            Some(fell_at) => Echo::Pulse(fell_at - rose_at),
            None => Echo::Unterminated,
        }
    }
}

fn wait_for_level(pin: &Input, high: bool, limit: Duration) -> Option<Instant> {
    let deadline = Instant::now() + limit;
    loop {
        let now = Instant::now();
        if pin.is_high() == high {
            return Some(now);
        }
        if now >= deadline {
            return None;
        }
    }
}

impl DistanceSource for Ultrasonic {
    fn read_distance(&mut self, lane: LaneId) -> Range {
        Range::from_echo(self.ping(lane))
    }
}

pub fn light(outputs: &mut [Output<'static>; NUM_PINS], levels: [bool; NUM_PINS]) {
    for (output, high) in outputs.iter_mut().zip(levels) {
        output.set_level(if high { Level::High } else { Level::Low });
    }
}

#[embassy_executor::task]
pub async fn uplink_task(
    mut tx: UartTx<'static, Async>,
    mut rx: UartRx<'static, Async>,
    reports: Receiver<'static, ThreadModeRawMutex, Report, UPLINK_DEPTH>,
    decisions: Sender<'static, ThreadModeRawMutex, Decision, UPLINK_DEPTH>,
) -> ! {
    let mut line = [0u8; LINE_CAPACITY];
    let mut assembler = LineAssembler::<LINE_CAPACITY>::new();

    loop {
        let report = reports.receive().await;

        let len = match encode_report(&report, &mut line) {
            Ok(len) => len,
            Err(err) => {
                warn!("report not sent: {}", err);
                continue;
            }
        };
        if tx.write(&line[..len]).await.is_err() {
            warn!("uplink write failed");
            continue;
        }

        match select(read_reply(&mut rx, &mut assembler), Timer::after(REPLY_TIMEOUT)).await {
            Either::First(Some(decision)) => {
                debug!("decision received: {}", decision);
                if decisions.try_send(decision).is_err() {
                    warn!("decision dropped, previous one not yet taken");
                }
            }
            Either::First(None) => {}
            Either::Second(_) => warn!("no reply from the decision service"),
        }
    }
}

async fn read_reply(
    rx: &mut UartRx<'static, Async>,
    assembler: &mut LineAssembler<LINE_CAPACITY>,
) -> Option<Decision> {
    let mut chunk = [0u8; 32];
    loop {
        let received = match rx.read_until_idle(&mut chunk).await {
            Ok(received) => received,
            Err(_) => {
                warn!("uplink read failed");
                return None;
            }
        };
        for byte in &chunk[..received] {
            match assembler.feed(*byte) {
                Feed::Pending => {}
                Feed::Overflow => warn!("reply longer than {} bytes", LINE_CAPACITY),
                Feed::Line(reply) => {
                    return match decode_decision(&reply) {
                        Ok(decision) => Some(decision),
                        Err(err) => {
                            warn!("decision rejected: {}", err);
                            None
                        }
                    };
                }
            }
        }
    }
}
