//! Property tests for the sampling pipeline, the policy rules and the
//! ISR event packing.
//!
//! Runs on host (x86_64) only: proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use cosmos::config::ThresholdConfig;
use cosmos::control::actuator::DeviceId;
use cosmos::control::policy::{Decision, Intent, ThresholdBinding, ThresholdProfile};
use cosmos::error::Violation;
use cosmos::events::{Event, EventQueue};
use cosmos::sensors::SensorKind;
use cosmos::sensors::calibration::fallback_millivolts;
use cosmos::sensors::convert::to_physical;
use cosmos::sensors::filter::MovingAverage;
use cosmos::sensors::sampler::discard_average;
use proptest::prelude::*;

// ── Discard multisampling ─────────────────────────────────────

proptest! {
    /// Dropping one min and one max, then averaging the rest.
    #[test]
    fn discard_average_matches_formula(
        samples in proptest::collection::vec(0i32..=4095, 3..=64),
    ) {
        let min = *samples.iter().min().unwrap();
        let max = *samples.iter().max().unwrap();
        let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
        let expected = (sum - i64::from(min) - i64::from(max)) / (samples.len() as i64 - 2);
        prop_assert_eq!(discard_average(&samples), Some(expected as i32));
    }

    /// A single spike never moves the result outside the other samples.
    #[test]
    fn discard_average_ignores_one_spike(
        base in 0i32..=4095,
        n in 3usize..=32,
        spike in prop_oneof![Just(0i32), Just(4095i32)],
    ) {
        let mut samples = vec![base; n];
        samples[n / 2] = spike;
        prop_assert_eq!(discard_average(&samples), Some(base));
    }
}

// ── Moving average ────────────────────────────────────────────

proptest! {
    /// The output always lies between the smallest and largest input
    /// still inside the window.
    #[test]
    fn moving_average_within_window_bounds(
        values in proptest::collection::vec(0i32..=4095, 1..=50),
    ) {
        let mut f = MovingAverage::<10>::new();
        for (i, &v) in values.iter().enumerate() {
            let out = f.update(v);
            let start = (i + 1).saturating_sub(10);
            let window = &values[start..=i];
            prop_assert!(out >= *window.iter().min().unwrap());
            prop_assert!(out <= *window.iter().max().unwrap());
        }
    }

    /// During ramp-up the output is the mean of everything seen so far.
    #[test]
    fn moving_average_ramp_up_is_plain_mean(
        values in proptest::collection::vec(0i32..=4095, 1..=10),
    ) {
        let mut f = MovingAverage::<10>::new();
        let mut last = 0;
        for &v in &values {
            last = f.update(v);
        }
        let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
        prop_assert_eq!(last, (sum / values.len() as i64) as i32);
        prop_assert_eq!(f.len(), values.len());
    }
}

// ── Calibration fallback and conversion ───────────────────────

proptest! {
    #[test]
    fn fallback_is_monotonic_and_in_range(a in 0i32..=4095, b in 0i32..=4095) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(fallback_millivolts(lo) <= fallback_millivolts(hi));
        prop_assert!((0..=3300).contains(&fallback_millivolts(hi)));
    }

    /// Any count a driver could hand back stays on the 0-3300 mV scale.
    #[test]
    fn fallback_never_overflows(raw in any::<i32>()) {
        prop_assert!((0..=3300).contains(&fallback_millivolts(raw)));
    }

    /// Wetter soil means lower sensor voltage.
    #[test]
    fn soil_moisture_decreases_with_voltage(a in 0i32..=3300, b in 0i32..=3300) {
        prop_assume!(a < b);
        prop_assert!(
            to_physical(SensorKind::SoilMoisture, a) > to_physical(SensorKind::SoilMoisture, b)
        );
    }

    #[test]
    fn water_level_increases_with_voltage(a in 0i32..=3300, b in 0i32..=3300) {
        prop_assume!(a < b);
        prop_assert!(
            to_physical(SensorKind::WaterLevel, a) < to_physical(SensorKind::WaterLevel, b)
        );
    }
}

// ── Policy rules ──────────────────────────────────────────────

const WL: &str = "WL";
const SM: &str = "SM";
const TH: &str = "TH";

fn pump_profile() -> ThresholdProfile {
    let limits = ThresholdConfig::default();
    let mut bindings = heapless::Vec::new();
    for (sensor, kind) in [
        (WL, SensorKind::WaterLevel),
        (SM, SensorKind::SoilMoisture),
        (TH, SensorKind::Temperature),
    ] {
        bindings
            .push(ThresholdBinding {
                sensor,
                kind,
                limits: limits.for_kind(kind),
            })
            .unwrap();
    }
    ThresholdProfile {
        device: DeviceId::new("PMP").unwrap(),
        bindings,
    }
}

fn any_intent() -> impl Strategy<Value = Intent> {
    prop_oneof![
        Just(Intent::EngageRequested),
        Just(Intent::AlreadyRunning),
        Just(Intent::Standby),
    ]
}

proptest! {
    /// Any NaN among the bound readings forces a disengage, whatever the
    /// intent and the other values.
    #[test]
    fn nan_reading_always_disengages(
        intent in any_intent(),
        wl in -50f32..150.0,
        sm in -50f32..150.0,
        th in -50f32..60.0,
        which in 0usize..3,
    ) {
        let mut readings = [(WL, wl), (SM, sm), (TH, th)];
        readings[which].1 = f32::NAN;
        let eval = pump_profile().evaluate(intent, &readings[..]);
        prop_assert_eq!(eval.decision, Decision::Disengage);
        prop_assert!(eval.faults & Violation::InvalidReading.mask() != 0);
    }

    /// Without an engage request the profile never engages.
    #[test]
    fn no_engage_without_request(
        intent in prop_oneof![Just(Intent::AlreadyRunning), Just(Intent::Standby)],
        wl in -50f32..150.0,
        sm in -50f32..150.0,
        th in -50f32..60.0,
    ) {
        let readings = [(WL, wl), (SM, sm), (TH, th)];
        let eval = pump_profile().evaluate(intent, &readings[..]);
        prop_assert_ne!(eval.decision, Decision::Engage);
    }

    /// Evaluation is a pure function of its inputs.
    #[test]
    fn evaluation_is_idempotent(
        intent in any_intent(),
        wl in -50f32..150.0,
        sm in -50f32..150.0,
        th in -50f32..60.0,
    ) {
        let profile = pump_profile();
        let readings = [(WL, wl), (SM, sm), (TH, th)];
        let first = profile.evaluate(intent, &readings[..]);
        let second = profile.evaluate(intent, &readings[..]);
        prop_assert_eq!(first.decision, second.decision);
        prop_assert_eq!(first.faults, second.faults);
    }

    /// A reason is reported exactly when faults are present.
    #[test]
    fn reason_iff_faults(
        intent in any_intent(),
        wl in -50f32..150.0,
        sm in -50f32..150.0,
        th in -50f32..60.0,
    ) {
        let readings = [(WL, wl), (SM, sm), (TH, th)];
        let eval = pump_profile().evaluate(intent, &readings[..]);
        prop_assert_eq!(eval.reason.is_some(), eval.faults != 0);
        if let Some(trip) = eval.reason {
            prop_assert!(eval.faults & trip.violation.mask() != 0);
        }
    }
}

// ── Event packing ─────────────────────────────────────────────

fn any_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::PollTick),
        Just(Event::TelemetryTick),
        (any::<u8>(), any::<u16>()).prop_map(|(index, at_ms)| Event::Button { index, at_ms }),
        (any::<u8>(), any::<bool>()).prop_map(|(index, active)| Event::Motion { index, active }),
    ]
}

proptest! {
    #[test]
    fn event_survives_packing(event in any_event()) {
        let raw = event.encode();
        prop_assert_ne!(raw, 0);
        prop_assert_eq!(Event::decode(raw), Some(event));
    }

    /// Whatever decodes re-encodes to the same word.
    #[test]
    fn decode_accepts_only_canonical_words(raw in any::<u32>()) {
        if let Some(event) = Event::decode(raw) {
            prop_assert_eq!(event.encode(), raw);
        }
    }

    /// The queue hands events back in order and drops what does not fit.
    #[test]
    fn queue_preserves_order(events in proptest::collection::vec(any_event(), 0..=64)) {
        let q = EventQueue::new();
        let accepted: Vec<Event> = events.iter().copied().filter(|&e| q.push(e)).collect();
        prop_assert!(accepted.len() <= events.len());
        prop_assert_eq!(&accepted[..], &events[..accepted.len()]);

        let mut drained = Vec::new();
        q.drain(|e| drained.push(e));
        prop_assert_eq!(drained, accepted);
        prop_assert!(q.is_empty());
    }
}
