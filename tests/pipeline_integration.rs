//! Integration tests for the sampling pipeline.
//!
//! These drive the real [`Sampler`] tick by tick over scripted devices and
//! assert on the payloads that reach the broadcast channel — the same
//! strings a subscriber would receive as text frames.  They exercise the
//! full chain: device handle state machine → digital overlay merge →
//! canonical encoding → change detection → release synthesis → FIFO
//! submission.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use keystate_bridge::domain::keys::ActiveKey;
use keystate_bridge::infrastructure::device::mock::{
    MockDigitalSource, ScriptStep, ScriptedAnalogueKeyboard, ScriptedEnumerator,
};
use keystate_bridge::infrastructure::device::{DeviceError, DigitalOverlay, NullDigitalSource};
use keystate_bridge::infrastructure::sampler::Sampler;

type PressedHandle = std::sync::Arc<std::sync::Mutex<Vec<u16>>>;

fn make_sampler(script: Vec<ScriptStep>) -> (Sampler, PressedHandle, UnboundedReceiver<String>) {
    let (digital, pressed) = MockDigitalSource::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let sampler = Sampler::new(
        Box::new(ScriptedEnumerator::with_device(Box::new(
            ScriptedAnalogueKeyboard::new(script),
        ))),
        DigitalOverlay::new(Box::new(digital)),
        tx,
        Duration::from_millis(0),
    );
    (sampler, pressed, rx)
}

fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        out.push(payload);
    }
    out
}

#[test]
fn worked_example_press_then_release() {
    // tick: [(K1, 0.8, digital down)]  → "(1:0.800000:1)"
    // tick: []                         → "(1:0:0)" then "" (release, then
    //                                    the now-empty snapshot)
    let (mut sampler, pressed, mut rx) = make_sampler(vec![
        Ok(vec![ActiveKey::new(1, 0.8)]),
        Ok(vec![]),
    ]);
    pressed.lock().unwrap().push(1);

    sampler.tick(); // discovery
    sampler.tick();
    assert_eq!(drain(&mut rx), ["(1:0.800000:1)"]);

    pressed.lock().unwrap().clear();
    sampler.tick();
    assert_eq!(drain(&mut rx), ["(1:0:0)", ""]);
}

#[test]
fn holding_keys_steady_produces_a_single_broadcast() {
    let steady = vec![ActiveKey::new(4, 0.6), ActiveKey::new(22, 0.9)];
    let (mut sampler, _pressed, mut rx) = make_sampler(vec![
        Ok(steady.clone()),
        Ok(steady.clone()),
        Ok(steady),
    ]);

    sampler.tick(); // discovery
    for _ in 0..3 {
        sampler.tick();
    }

    assert_eq!(drain(&mut rx), ["(4:0.600000:0)(22:0.900000:0)"]);
}

#[test]
fn no_analogue_device_means_no_broadcasts_ever() {
    // The digital keyboard is live and changing, but without an analogue
    // device the pipeline must stay silent.
    let (digital, pressed) = MockDigitalSource::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sampler = Sampler::new(
        Box::new(ScriptedEnumerator::empty()),
        DigitalOverlay::new(Box::new(digital)),
        tx,
        Duration::from_millis(0),
    );

    for key in [4u16, 5, 6] {
        pressed.lock().unwrap().push(key);
        sampler.tick();
    }

    assert!(!sampler.is_connected());
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn rollover_between_bursts_synthesizes_releases() {
    // Burst of {A, S}, then a non-overlapping burst of {K}: the transition
    // must carry explicit releases for A and S before the new snapshot.
    let (mut sampler, _pressed, mut rx) = make_sampler(vec![
        Ok(vec![ActiveKey::new(4, 1.0), ActiveKey::new(22, 1.0)]),
        Ok(vec![ActiveKey::new(14, 1.0)]),
    ]);

    sampler.tick(); // discovery
    sampler.tick();
    drain(&mut rx);

    sampler.tick();
    assert_eq!(drain(&mut rx), ["(4:0:0)(22:0:0)", "(14:1.000000:0)"]);
}

#[test]
fn device_loss_mid_burst_goes_quiet_until_reconnect() {
    let (digital, _pressed) = MockDigitalSource::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut enumerator = ScriptedEnumerator::with_device(Box::new(
        ScriptedAnalogueKeyboard::new([
            Ok(vec![ActiveKey::new(4, 1.0)]),
            Err(DeviceError::Disconnected),
        ]),
    ));
    enumerator.push_batch(vec![Box::new(ScriptedAnalogueKeyboard::new([Ok(vec![
        ActiveKey::new(4, 1.0),
        ActiveKey::new(5, 1.0),
    ])]))]);

    let mut sampler = Sampler::new(
        Box::new(enumerator),
        DigitalOverlay::new(Box::new(digital)),
        tx,
        Duration::from_millis(0),
    );

    sampler.tick(); // discover device #1
    sampler.tick(); // snapshot {4}
    assert_eq!(drain(&mut rx), ["(4:1.000000:0)"]);

    sampler.tick(); // device dies — silent
    assert!(!sampler.is_connected());
    assert_eq!(drain(&mut rx), Vec::<String>::new());

    sampler.tick(); // discover device #2 — still silent
    sampler.tick(); // snapshot {4, 5}; detector state survived the outage
    assert_eq!(drain(&mut rx), ["(4:1.000000:0)(5:1.000000:0)"]);
}

#[test]
fn digital_only_change_rebroadcasts_with_new_flag() {
    // Same analogue reading twice, but the key crosses its digital actuation
    // point between ticks: the canonical string changes, so it rebroadcasts.
    let reading = vec![ActiveKey::new(26, 0.5)];
    let (mut sampler, pressed, mut rx) =
        make_sampler(vec![Ok(reading.clone()), Ok(reading)]);

    sampler.tick(); // discovery
    sampler.tick();
    assert_eq!(drain(&mut rx), ["(26:0.500000:0)"]);

    pressed.lock().unwrap().push(26);
    sampler.tick();
    assert_eq!(drain(&mut rx), ["(26:0.500000:1)"]);
}

#[test]
fn null_digital_source_reports_all_keys_up() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sampler = Sampler::new(
        Box::new(ScriptedEnumerator::with_device(Box::new(
            ScriptedAnalogueKeyboard::new([Ok(vec![ActiveKey::new(40, 1.0)])]),
        ))),
        DigitalOverlay::new(Box::new(NullDigitalSource)),
        tx,
        Duration::from_millis(0),
    );

    sampler.tick();
    sampler.tick();

    assert_eq!(rx.try_recv().unwrap(), "(40:1.000000:0)");
}
