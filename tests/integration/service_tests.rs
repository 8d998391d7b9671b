//! Integration tests for the ScaleService → Controller → relay pipeline.
//!
//! Weight sequences are played back one sample per poll through the mock
//! sampler; relay calls and emitted events are asserted in full.

use core::time::Duration;

use smartscale::adapters::nvs::NvsRegion;
use smartscale::app::commands::AppCommand;
use smartscale::app::events::{AppEvent, RelayCause};
use smartscale::config::ControllerConfig;
use smartscale::control::TimerPhase;
use smartscale::error::{Error, ValidationError};
use smartscale::store::{Param, ParameterSet};

use crate::mock_hw::{boot_service, make_app, MockScale, RecordingSink, RelayCall};

fn relay_events(sink: &RecordingSink, cause: RelayCause) -> usize {
    sink.count(|e| matches!(e, AppEvent::RelayChanged { cause: c, .. } if *c == cause))
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_on_erased_region_reports_recovery_and_applies_calibration() {
    let (svc, hw, sink) = make_app(&[]);

    assert!(matches!(sink.events[0], AppEvent::IntegrityRecovered(_)));
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::Started(ParameterSet::DEFAULT))
    );
    assert_eq!(hw.calibration_factor, svc.get_calibration_factor());
    assert!(!svc.get_relay_state());
    assert_eq!(svc.timer_phase(), TimerPhase::Idle);
}

// ── Relay latch ───────────────────────────────────────────────

#[test]
fn relay_latches_at_setpoint_and_holds() {
    let (mut svc, mut hw, mut sink) = make_app(&[10.0, 15.0, 19.0, 12.0]);

    let mut latched_at = None;
    for (i, t) in [0u64, 10, 20, 30].into_iter().enumerate() {
        let out = svc.poll(t, &mut hw, &mut sink);
        if out.relay_latched {
            latched_at = Some(i);
        }
    }

    assert_eq!(latched_at, Some(2), "latch on the 19 kg sample");
    assert!(svc.get_relay_state(), "12 kg must not release the latch");
    assert!(hw.energized);
    assert_eq!(hw.relay_calls, vec![RelayCall::Energize]);
    assert_eq!(relay_events(&sink, RelayCause::Latched), 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SetpointExceeded { .. })),
        1
    );
}

#[test]
fn reset_while_overweight_relatches_on_next_poll() {
    let (mut svc, mut hw, mut sink) = make_app(&[20.0, 20.0]);

    svc.poll(0, &mut hw, &mut sink);
    assert!(svc.get_relay_state());

    svc.reset_relay(&mut hw, &mut sink);
    assert!(!svc.get_relay_state());
    assert!(!hw.energized);
    assert_eq!(relay_events(&sink, RelayCause::Reset), 1);

    svc.poll(10, &mut hw, &mut sink);
    assert!(svc.get_relay_state());
    assert_eq!(hw.energize_count(), 2);
}

#[test]
fn reset_when_off_emits_nothing() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);
    sink.clear();

    svc.reset_relay(&mut hw, &mut sink);
    assert!(sink.events.is_empty());
    assert_eq!(hw.relay_calls, vec![RelayCall::DeEnergize]);
}

#[test]
fn toggle_overrides_relay_both_ways() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    assert!(svc.toggle_relay(&mut hw, &mut sink));
    assert!(hw.energized);
    assert!(!svc.toggle_relay(&mut hw, &mut sink));
    assert!(!hw.energized);
    assert_eq!(relay_events(&sink, RelayCause::Toggled), 2);
}

#[test]
fn relay_disabled_build_never_energizes() {
    let config = ControllerConfig {
        relay_enabled: false,
        ..ControllerConfig::default()
    };
    let mut hw = MockScale::with_weights(&[25.0, 25.0]);
    let mut sink = RecordingSink::new();
    let mut svc = boot_service(NvsRegion::new(), &config, &mut hw, &mut sink);

    svc.poll(0, &mut hw, &mut sink);
    svc.poll(10, &mut hw, &mut sink);

    assert!(!svc.get_relay_state());
    assert!(hw.relay_calls.is_empty());
    // timer still runs
    assert_eq!(svc.timer_phase(), TimerPhase::Running);
}

// ── Timer ─────────────────────────────────────────────────────

#[test]
fn timer_runs_through_full_cycle() {
    let (mut svc, mut hw, mut sink) = make_app(&[0.0, 6.0, 19.0, 3.0]);

    svc.poll(0, &mut hw, &mut sink);
    assert_eq!(svc.timer_phase(), TimerPhase::Idle);

    svc.poll(100, &mut hw, &mut sink);
    assert_eq!(svc.timer_phase(), TimerPhase::Running);

    svc.poll(250, &mut hw, &mut sink);
    assert_eq!(svc.timer_phase(), TimerPhase::Stopped);
    assert_eq!(svc.get_elapsed_time(), Duration::from_millis(150));

    svc.poll(400, &mut hw, &mut sink);
    assert_eq!(svc.timer_phase(), TimerPhase::Idle);
    assert_eq!(svc.get_elapsed_time(), Duration::ZERO);

    let transitions: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::TimerChanged { from, to, elapsed } => Some((*from, *to, *elapsed)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (TimerPhase::Idle, TimerPhase::Running, Duration::ZERO),
            (
                TimerPhase::Running,
                TimerPhase::Stopped,
                Duration::from_millis(150)
            ),
            (TimerPhase::Stopped, TimerPhase::Idle, Duration::ZERO),
        ]
    );
}

#[test]
fn elapsed_is_reported_as_of_last_poll() {
    let (mut svc, mut hw, mut sink) = make_app(&[6.0, 7.0]);

    svc.poll(1_000, &mut hw, &mut sink);
    assert_eq!(svc.get_elapsed_time(), Duration::ZERO);

    svc.poll(1_080, &mut hw, &mut sink);
    assert_eq!(svc.get_elapsed_time(), Duration::from_millis(80));
    assert_eq!(svc.status().elapsed_ms, 80);
}

#[test]
fn one_transition_per_poll() {
    // A jump straight past the setpoint only starts the timer.
    let (mut svc, mut hw, mut sink) = make_app(&[25.0]);
    let out = svc.poll(0, &mut hw, &mut sink);
    assert_eq!(out.timer, Some((TimerPhase::Idle, TimerPhase::Running)));
    assert_eq!(svc.timer_phase(), TimerPhase::Running);
}

// ── Diagnostics ───────────────────────────────────────────────

#[test]
fn exceeded_notification_is_rate_limited() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);
    hw.push_weights(&[20.0; 250]);

    for i in 0..250u64 {
        svc.poll(i * 10, &mut hw, &mut sink);
    }
    // t = 0, 1000, 2000
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SetpointExceeded { .. })),
        3
    );
}

#[test]
fn weight_report_toggles() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);
    for t in (0..=2_000u64).step_by(100) {
        svc.poll(t, &mut hw, &mut sink);
    }
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::WeightReport { .. })),
        3
    );

    svc.handle_command(AppCommand::ToggleWeightReport, &mut hw, &mut sink)
        .unwrap();
    assert!(!svc.report_enabled());
    sink.clear();
    for t in (2_100..=5_000u64).step_by(100) {
        svc.poll(t, &mut hw, &mut sink);
    }
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::WeightReport { .. })),
        0
    );
}

// ── Parameters ────────────────────────────────────────────────

#[test]
fn setpoint_update_is_persisted_and_announced() {
    let (mut svc, _hw, mut sink) = make_app(&[]);
    sink.clear();

    svc.set_setpoint(22.5, &mut sink).unwrap();
    assert_eq!(svc.get_setpoint(), 22.5);
    assert_eq!(
        sink.events,
        vec![AppEvent::ParameterChanged {
            param: Param::WeightSetpoint,
            value: 22.5
        }]
    );

    // Same value again: no event, no write.
    let writes = svc.store().durable_writes();
    svc.set_setpoint(22.5, &mut sink).unwrap();
    assert_eq!(sink.events.len(), 1);
    assert_eq!(svc.store().durable_writes(), writes);
}

#[test]
fn out_of_range_setpoint_is_rejected_unchanged() {
    let (mut svc, _hw, mut sink) = make_app(&[]);

    let err = svc.set_setpoint(31.0, &mut sink).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::OutOfRange {
            param: Param::WeightSetpoint,
            ..
        })
    ));
    assert!(svc.set_setpoint(4.99, &mut sink).is_err());
    assert_eq!(svc.get_setpoint(), ParameterSet::DEFAULT.weight_setpoint);
}

#[test]
fn threshold_cannot_exceed_setpoint() {
    let (mut svc, _hw, mut sink) = make_app(&[]);

    let err = svc.set_timer_threshold(20.0, &mut sink).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::ThresholdAboveSetpoint { .. })
    ));

    svc.set_timer_threshold(10.0, &mut sink).unwrap();
    // Lowering the setpoint below the threshold is refused too.
    assert!(svc.set_setpoint(9.0, &mut sink).is_err());
    assert_eq!(svc.get_timer_threshold(), 10.0);
}

#[test]
fn calibration_factor_is_applied_to_sampler() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    svc.set_calibration_factor(-420.0, &mut hw, &mut sink).unwrap();
    assert_eq!(svc.get_calibration_factor(), -420.0);
    assert_eq!(hw.calibration_factor, -420.0);

    assert!(svc.set_calibration_factor(0.0, &mut hw, &mut sink).is_err());
    assert_eq!(hw.calibration_factor, -420.0);
}

#[test]
fn parameters_survive_reboot() {
    let (mut svc, _hw, mut sink) = make_app(&[]);
    svc.set_setpoint(22.0, &mut sink).unwrap();
    svc.set_timer_threshold(8.0, &mut sink).unwrap();

    let region = svc.store().region().reboot();
    let mut hw = MockScale::new();
    let mut sink = RecordingSink::new();
    let svc = boot_service(region, &ControllerConfig::default(), &mut hw, &mut sink);

    assert_eq!(svc.get_setpoint(), 22.0);
    assert_eq!(svc.get_timer_threshold(), 8.0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::IntegrityRecovered(_))),
        0
    );
    // Control state is transient.
    assert!(!svc.get_relay_state());
    assert_eq!(svc.timer_phase(), TimerPhase::Idle);
}
