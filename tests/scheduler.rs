use std::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant};
use lanesignal::ambient::{Ambient, AmbientReading, AmbientSource, NoAmbient};
use lanesignal::detector::Presence;
use lanesignal::phase::{Phase, Transition};
use lanesignal::range::{DistanceSource, Range};
use lanesignal::report::{Decision, Report, ReportSink};
use lanesignal::signal::{Color, NUM_PINS, SignalHeads};
use lanesignal::uplink::ChannelUplink;
use lanesignal::{LaneId, NUM_LANES, NodeConfig, Scheduler};

/// Plays back scripted readings per lane; an empty lane reads far away.
#[derive(Default)]
struct Road {
    readings: [VecDeque<Range>; NUM_LANES],
}

impl Road {
    fn script(&mut self, lane: LaneId, readings: &[Range]) {
        self.readings[lane.index()].extend(readings.iter().copied());
    }

    fn cars(&mut self, lane: LaneId, cars: usize) {
        for _ in 0..cars {
            self.script(lane, &[Range::Centimeters(4), Range::Centimeters(120)]);
        }
    }
}

impl DistanceSource for Road {
    fn read_distance(&mut self, lane: LaneId) -> Range {
        self.readings[lane.index()]
            .pop_front()
            .unwrap_or(Range::Centimeters(400))
    }
}

/// Answers each report with the next scripted decision.
#[derive(Default)]
struct Service {
    replies: VecDeque<Option<Decision>>,
    seen: Vec<Report>,
}

impl ReportSink for Service {
    fn report(&mut self, report: &Report) -> Option<Decision> {
        self.seen.push(*report);
        self.replies.pop_front().flatten()
    }
}

struct Weather(AmbientReading);

impl AmbientSource for Weather {
    fn read_ambient(&mut self) -> Option<AmbientReading> {
        Some(self.0)
    }
}

type Node = Scheduler<Road, NoAmbient, Service, SignalHeads>;

fn node(config: NodeConfig) -> Node {
    Scheduler::new(
        &config,
        Road::default(),
        NoAmbient,
        Service::default(),
        SignalHeads::new([false; NUM_PINS]),
    )
}

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

/// Runs the loop every 10 ms over `[from, to]`.
fn run(node: &mut Node, from: u64, to: u64) {
    for ms in (from..=to).step_by(10) {
        node.run_once(at(ms));
    }
}

fn go(lane: LaneId, seconds: u32) -> Option<Decision> {
    Some(Decision {
        active: Some(lane),
        duration_seconds: seconds,
        reset: Some(lane),
    })
}

#[test]
fn counts_vehicles_from_polled_samples() {
    let mut node = node(NodeConfig::DEFAULT.with_threshold(LaneId::Lane2, 5));
    node.distance_source_mut().script(
        LaneId::Lane2,
        &[6, 6, 3, 3, 3, 7].map(Range::Centimeters),
    );

    run(&mut node, 0, 40);
    assert_eq!(node.detector(LaneId::Lane2).presence(), Presence::Occupied);
    assert_eq!(node.detector(LaneId::Lane2).vehicle_count(), 0);
    assert_eq!(node.detector(LaneId::Lane2).first_occupied_at(), Some(at(20)));

    run(&mut node, 50, 50);
    assert_eq!(node.detector(LaneId::Lane2).presence(), Presence::Clear);
    assert_eq!(node.detector(LaneId::Lane2).vehicle_count(), 1);
}

#[test]
fn every_lane_is_polled_on_every_cadence() {
    let mut node = node(NodeConfig::DEFAULT);
    node.report_sink_mut().replies.push_back(go(LaneId::Lane1, 10));

    // Calling more often than the poll interval does not poll more often.
    for ms in 0..=999 {
        node.run_once(at(ms));
    }
    for lane in LaneId::ALL {
        assert_eq!(node.sensor_stats(lane).good, 100);
    }
    assert_eq!(node.signals().color(LaneId::Lane1), Color::Green);
}

#[test]
fn decision_plays_out_while_sensors_keep_counting() {
    let mut node = node(NodeConfig::DEFAULT);
    node.distance_source_mut().cars(LaneId::Lane3, 3);

    // First report at t=0 has nothing to act on.
    node.report_sink_mut().replies.push_back(None);
    run(&mut node, 0, 4990);
    assert_eq!(node.detector(LaneId::Lane3).vehicle_count(), 3);
    assert!(node.phase().is_idle());

    // Second report: lane 3 gets 10 s. A car arrives while it is green.
    node.report_sink_mut().replies.push_back(go(LaneId::Lane3, 10));
    node.run_once(at(5000));
    assert_eq!(node.phase().active_lane(), Some(LaneId::Lane3));
    assert_eq!(
        node.signals().colors(),
        [Color::Red, Color::Red, Color::Green, Color::Red]
    );
    node.distance_source_mut().cars(LaneId::Lane3, 1);

    // Third report, mid-cycle: another lane is asked for and refused.
    node.report_sink_mut().replies.push_back(go(LaneId::Lane1, 10));
    run(&mut node, 5010, 11990);
    assert_eq!(node.signals().color(LaneId::Lane1), Color::Red);
    assert_eq!(node.signals().color(LaneId::Lane3), Color::Green);
    assert_eq!(node.detector(LaneId::Lane3).vehicle_count(), 4);

    let pass = node.run_once(at(12000));
    assert_eq!(pass.transition, Some(Transition::ToYellow(LaneId::Lane3)));
    assert_eq!(node.signals().color(LaneId::Lane3), Color::Yellow);

    // Count survives until the cycle is over.
    run(&mut node, 12010, 14990);
    assert_eq!(node.detector(LaneId::Lane3).vehicle_count(), 4);

    let pass = node.run_once(at(15000));
    assert_eq!(
        pass.transition,
        Some(Transition::ToIdle {
            lane: LaneId::Lane3,
            reset: Some(LaneId::Lane3)
        })
    );
    assert_eq!(node.signals().colors(), [Color::Red; NUM_LANES]);
    assert_eq!(node.detector(LaneId::Lane3).vehicle_count(), 0);
    assert_eq!(node.detector(LaneId::Lane3).first_occupied_at(), None);

    // Polling never stopped: 1501 passes at 10 ms.
    assert_eq!(node.sensor_stats(LaneId::Lane1).good, 1501);

    let reports = &node.report_sink_mut().seen;
    assert_eq!(reports.len(), 4);
    assert_eq!(reports[1].lane(LaneId::Lane3).vehicle_count, 3);
    assert_eq!(reports[2].lane(LaneId::Lane3).vehicle_count, 4);
}

#[test]
fn unusable_decisions_change_nothing() {
    let mut node = node(NodeConfig::DEFAULT);
    node.distance_source_mut().cars(LaneId::Lane4, 2);
    node.report_sink_mut().replies.extend([
        go(LaneId::Lane4, 3),
        Some(Decision {
            active: None,
            duration_seconds: 0,
            reset: Some(LaneId::Lane4),
        }),
    ]);

    run(&mut node, 0, 9990);
    assert_eq!(node.report_sink_mut().seen.len(), 2);
    assert_eq!(node.phase().phase(), Phase::Idle);
    assert_eq!(node.phase().pending_reset(), None);
    assert_eq!(node.signals().colors(), [Color::Red; NUM_LANES]);
    assert_eq!(node.detector(LaneId::Lane4).vehicle_count(), 2);
}

#[test]
fn reset_for_another_lane_is_ignored() {
    let mut node = node(NodeConfig::DEFAULT);
    node.distance_source_mut().cars(LaneId::Lane2, 1);
    node.report_sink_mut().replies.push_back(None);
    node.report_sink_mut().replies.push_back(Some(Decision {
        active: Some(LaneId::Lane1),
        duration_seconds: 4,
        reset: Some(LaneId::Lane2),
    }));

    run(&mut node, 0, 5000);
    assert_eq!(node.phase().active_lane(), Some(LaneId::Lane1));
    assert_eq!(node.phase().pending_reset(), None);
    run(&mut node, 5010, 14000);
    assert!(node.phase().is_idle());
    assert_eq!(node.detector(LaneId::Lane2).vehicle_count(), 1);
}

#[test]
fn sensor_faults_release_a_lane_and_are_tallied() {
    let mut node = node(NodeConfig::DEFAULT);
    node.distance_source_mut().script(
        LaneId::Lane1,
        &[
            Range::Centimeters(3),
            Range::Stuck,
            Range::Stuck,
            Range::Timeout,
        ],
    );

    run(&mut node, 0, 30);
    assert_eq!(node.detector(LaneId::Lane1).presence(), Presence::Clear);
    assert_eq!(node.detector(LaneId::Lane1).vehicle_count(), 1);

    let stats = node.sensor_stats(LaneId::Lane1);
    assert_eq!((stats.good, stats.stuck, stats.timeouts), (1, 2, 1));
}

#[test]
fn report_carries_snapshot_and_ambient() {
    let mut node = Scheduler::new(
        &NodeConfig::DEFAULT,
        Road::default(),
        Weather(AmbientReading::Valid(Ambient {
            temperature_c: 24.0,
            humidity_pct: 61.0,
            pressure_hpa: 1009.0,
        })),
        Service::default(),
        SignalHeads::new([false; NUM_PINS]),
    );
    node.distance_source_mut()
        .script(LaneId::Lane4, &[Range::Centimeters(2), Range::Timeout]);

    let mut now = at(0);
    while now < at(5000) {
        node.run_once(now);
        now += Duration::from_millis(10);
    }
    node.run_once(now);

    let report = node.report_sink_mut().seen[1];
    assert_eq!(report.taken_at, at(5000));
    assert_eq!(report.lane(LaneId::Lane4).vehicle_count, 1);
    assert_eq!(report.lane(LaneId::Lane4).first_occupied_at, Some(at(0)));
    assert_eq!(
        report.lane(LaneId::Lane1).last_range,
        Some(Range::Centimeters(400))
    );
    assert!(matches!(report.ambient, Some(AmbientReading::Valid(_))));
}

#[test]
fn decision_lands_without_waiting_for_the_next_report() {
    let reports = Channel::<NoopRawMutex, Report, 1>::new();
    let decisions = Channel::<NoopRawMutex, Decision, 1>::new();
    let mut node = Scheduler::new(
        &NodeConfig::DEFAULT,
        Road::default(),
        NoAmbient,
        ChannelUplink::new(reports.sender(), decisions.receiver()),
        SignalHeads::new([false; NUM_PINS]),
    );

    assert!(node.run_once(at(0)).reported);
    assert!(reports.try_receive().is_ok());
    for ms in (10..=1200).step_by(10) {
        node.run_once(at(ms));
    }
    assert!(node.phase().is_idle());

    // The reply comes in well before the next report is due.
    decisions.try_send(go(LaneId::Lane2, 10).unwrap()).unwrap();
    let pass = node.run_once(at(1210));
    assert!(!pass.reported);
    assert_eq!(node.phase().active_lane(), Some(LaneId::Lane2));
    assert_eq!(node.phase().pending_reset(), Some(LaneId::Lane2));
    assert_eq!(node.signals().color(LaneId::Lane2), Color::Green);

    for ms in (1220..=8200).step_by(10) {
        node.run_once(at(ms));
    }
    assert_eq!(node.signals().color(LaneId::Lane2), Color::Green);
    node.run_once(at(8210));
    assert_eq!(node.signals().color(LaneId::Lane2), Color::Yellow);
}
