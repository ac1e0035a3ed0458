//! Concurrent action intake against a ticking session.
//!
//! Producer threads hammer the mailbox through cloned senders while the
//! test thread ticks. Whatever the interleaving, every committed joint
//! action carries at most one action per seat, every submitted action is
//! either accepted or counted as dropped, and no accepted action is
//! committed twice.
//!
//! The long-running variant is marked `#[ignore]`; run it with
//! `cargo test --release -- --ignored`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use huddle_core::{into_agent, LifecycleStatus, ParticipantId};
use huddle_engine::{ManualTime, SessionConfig, SessionController, TimedRounds};
use huddle_test_utils::fixtures::SlowPolicy;
use huddle_test_utils::{CounterWorld, JointLog, Move};
use proptest::prelude::*;

fn session(seats: usize, mailbox: usize) -> (SessionController<CounterWorld>, JointLog) {
    let (world, log) = CounterWorld::new().logged();
    let config = SessionConfig {
        capacity: seats,
        mailbox_capacity: mailbox,
        ..Default::default()
    };
    let mut s = SessionController::with_time_source(
        world,
        Box::new(TimedRounds::new(1, Duration::from_secs(600))),
        config,
        Arc::new(ManualTime::new()),
    )
    .unwrap();
    for seat in 0..seats {
        s.add_participant(format!("p{seat}"), None).unwrap();
    }
    (s, log)
}

/// Run one producer per seat, each submitting `per_producer` `Up` moves,
/// while the caller ticks `ticks` times.
fn race(seats: usize, mailbox: usize, per_producer: usize, ticks: usize) {
    let (mut s, log) = session(seats, mailbox);
    s.activate().unwrap();

    let go = Arc::new(AtomicBool::new(false));
    let handles: Vec<_> = (0..seats)
        .map(|seat| {
            let sender = s.action_sender();
            let go = Arc::clone(&go);
            let id = ParticipantId::new(format!("p{seat}"));
            thread::spawn(move || {
                while !go.load(Ordering::Acquire) {
                    std::hint::spin_loop();
                }
                for _ in 0..per_producer {
                    sender.enqueue(&id, Move::Up);
                }
            })
        })
        .collect();

    go.store(true, Ordering::Release);
    for _ in 0..ticks {
        assert_eq!(s.tick().unwrap(), LifecycleStatus::Active);
    }
    for h in handles {
        h.join().unwrap();
    }
    // Drain whatever is still queued.
    for _ in 0..mailbox {
        s.tick().unwrap();
    }

    let stats = s.intake_stats();
    let submitted = (seats * per_producer) as u64;
    assert_eq!(stats.accepted + stats.dropped(), submitted);
    assert_eq!(stats.dropped_inactive, 0);
    assert_eq!(stats.dropped_unknown, 0);

    let joints = log.entries();
    assert!(joints.iter().all(|j| j.len() == seats));
    let committed_ups = joints
        .iter()
        .flatten()
        .filter(|m| **m == Move::Up)
        .count() as u64;
    assert_eq!(committed_ups, stats.accepted);
    assert_eq!(s.state().value, stats.accepted as i64);
    s.deactivate();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn intake_conserves_actions(
        seats in 1usize..4,
        mailbox in 1usize..4,
        per_producer in 0usize..64,
        ticks in 0usize..32,
    ) {
        race(seats, mailbox, per_producer, ticks);
    }
}

#[test]
fn removing_a_seat_under_load_reroutes_nothing() {
    let (mut s, log) = session(2, 1);
    s.activate().unwrap();
    let sender = s.action_sender();
    let stop = Arc::new(AtomicBool::new(false));
    let producer = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let id = ParticipantId::from("p1");
            let mut sent = 0u64;
            while !stop.load(Ordering::Acquire) {
                sender.enqueue(&id, Move::Up);
                sent += 1;
            }
            sent
        })
    };

    for _ in 0..50 {
        s.tick().unwrap();
    }
    assert!(s.remove_participant(&ParticipantId::from("p1")));
    for _ in 0..50 {
        s.tick().unwrap();
    }
    stop.store(true, Ordering::Release);
    let sent = producer.join().unwrap();

    let stats = s.intake_stats();
    assert_eq!(stats.accepted + stats.dropped(), sent);
    // The vacated seat plays the no-op from the removal on.
    let joints = log.entries();
    assert_eq!(joints.len(), 100);
    assert!(joints[50..].iter().all(|j| j == &[Move::Stay, Move::Stay]));
    s.deactivate();
}

#[test]
fn slow_inference_never_stalls_ticks() {
    let (world, log) = CounterWorld::new().logged();
    let mut s = SessionController::with_time_source(
        world,
        Box::new(TimedRounds::new(1, Duration::from_secs(600))),
        SessionConfig::default(),
        Arc::new(ManualTime::new()),
    )
    .unwrap();
    s.add_participant("p0", None).unwrap();
    let slow = SlowPolicy {
        delay: Duration::from_millis(300),
        action: Move::Down,
    };
    s.add_autonomous("sloth", into_agent(slow), None).unwrap();
    s.activate().unwrap();

    let start = Instant::now();
    for _ in 0..20 {
        s.enqueue_action(&ParticipantId::from("p0"), Move::Up);
        s.tick().unwrap();
    }
    assert!(start.elapsed() < Duration::from_millis(300));
    // The human's input was committed on every tick.
    assert!(log.entries().iter().all(|j| j[0] == Move::Up));

    let report = s.deactivate();
    assert_eq!(report.joined, 1);
}

#[test]
#[ignore] // stress test: run with `cargo test --release -- --ignored`
fn sustained_intake_stress() {
    race(8, 4, 50_000, 5_000);
}
