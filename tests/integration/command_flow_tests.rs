//! End-to-end command flows: HTTP route / console line → AppCommand →
//! ScaleService → mock hardware.

use smartscale::adapters::console::{self, ConsoleCommand};
use smartscale::adapters::http::{self, HttpAction};
use smartscale::app::commands::AppCommand;
use smartscale::app::events::AppEvent;
use smartscale::diagnostics::hex_dump;
use smartscale::error::{Error, ValidationError};
use smartscale::store::layout;

use crate::mock_hw::{make_app, MockScale, RecordingSink, TestService};

/// What the binary's HTTP handler does: dispatch against the latest
/// snapshot, then forward any queued command to the poll loop.
fn http_get(
    svc: &mut TestService,
    hw: &mut MockScale,
    sink: &mut RecordingSink,
    uri: &str,
) -> http::HttpReply {
    let (path, query) = http::split_uri(uri);
    let action = http::dispatch(path, query, &svc.status());
    if let HttpAction::Enqueue(cmd, _) = &action {
        svc.handle_command(*cmd, hw, sink).unwrap();
    }
    action.reply().clone()
}

// ── HTTP ──────────────────────────────────────────────────────

#[test]
fn http_weight_reflects_last_poll() {
    let (mut svc, mut hw, mut sink) = make_app(&[7.25]);
    svc.poll(0, &mut hw, &mut sink);

    let r = http_get(&mut svc, &mut hw, &mut sink, "/weight");
    assert_eq!(r.status, 200);
    assert_eq!(r.body, "7.25");
}

#[test]
fn http_setpoint_round_trip() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    let r = http_get(&mut svc, &mut hw, &mut sink, "/set_weight_setpoint?value=24.5");
    assert_eq!(r.status, 200);
    assert_eq!(svc.get_setpoint(), 24.5);

    let r = http_get(&mut svc, &mut hw, &mut sink, "/setpoint");
    assert_eq!(r.body, "24.50");
}

#[test]
fn http_rejects_invalid_values_without_touching_store() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);
    let writes = svc.store().durable_writes();

    for uri in [
        "/set_weight_setpoint?value=45",
        "/set_weight_setpoint?value=nan",
        "/set_timer_threshold?value=19",
        "/set_calibration_factor?value=0",
        "/set_calibration_factor",
    ] {
        let r = http_get(&mut svc, &mut hw, &mut sink, uri);
        assert_eq!(r.status, 400, "{uri}");
    }
    assert_eq!(svc.store().durable_writes(), writes);
}

#[test]
fn http_relay_routes_drive_relay() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    http_get(&mut svc, &mut hw, &mut sink, "/toggle_relay");
    assert!(hw.energized);
    assert!(svc.status().relay_energized);

    http_get(&mut svc, &mut hw, &mut sink, "/reset_relay");
    assert!(!hw.energized);
    assert!(!svc.get_relay_state());
}

#[test]
fn http_tare_reports_progress_until_done() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    let r = http_get(&mut svc, &mut hw, &mut sink, "/tare");
    assert_eq!(r.body, "Taring...");
    assert_eq!(hw.tare_requests, 1);
    assert_eq!(
        http_get(&mut svc, &mut hw, &mut sink, "/tare_status").body,
        "Taring..."
    );

    // mock tare needs three refreshes
    for t in 0..3u64 {
        svc.poll(t * 10, &mut hw, &mut sink);
    }
    assert_eq!(
        http_get(&mut svc, &mut hw, &mut sink, "/tare_status").body,
        "Done"
    );
    assert_eq!(sink.count(|e| *e == AppEvent::TareStarted), 1);
    assert_eq!(sink.count(|e| *e == AppEvent::TareComplete), 1);
}

#[test]
fn http_status_is_json_of_service_state() {
    let (mut svc, mut hw, mut sink) = make_app(&[6.0, 9.0]);
    svc.poll(0, &mut hw, &mut sink);
    svc.poll(500, &mut hw, &mut sink);

    let r = http_get(&mut svc, &mut hw, &mut sink, "/status");
    let v: serde_json::Value = serde_json::from_str(&r.body).unwrap();
    assert_eq!(v["timer_phase"], "Running");
    assert_eq!(v["elapsed_ms"], 500);
    assert_eq!(v["sample_seq"], 2);
    assert_eq!(v["relay_energized"], false);
}

// ── Console ───────────────────────────────────────────────────

fn console_line(
    svc: &mut TestService,
    hw: &mut MockScale,
    sink: &mut RecordingSink,
    line: &str,
) -> Result<(), Error> {
    match console::parse(line) {
        Ok(ConsoleCommand::App(cmd)) => svc.handle_command(cmd, hw, sink),
        other => panic!("not an app command: {line:?} → {other:?}"),
    }
}

#[test]
fn console_sets_parameters() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    console_line(&mut svc, &mut hw, &mut sink, "w 20").unwrap();
    console_line(&mut svc, &mut hw, &mut sink, "s 12.5").unwrap();
    console_line(&mut svc, &mut hw, &mut sink, "c 701.5").unwrap();

    assert_eq!(svc.get_setpoint(), 20.0);
    assert_eq!(svc.get_timer_threshold(), 12.5);
    assert_eq!(svc.get_calibration_factor(), 701.5);
    assert_eq!(hw.calibration_factor, 701.5);
}

#[test]
fn console_known_mass_calibration() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    // Mock reads 2.0 at the default factor; a 4 kg reference halves it.
    console_line(&mut svc, &mut hw, &mut sink, "r 4").unwrap();
    assert_eq!(svc.get_calibration_factor(), 348.0);
    assert_eq!(hw.calibration_factor, 348.0);

    let err = console_line(&mut svc, &mut hw, &mut sink, "r 0").unwrap_err();
    assert_eq!(
        err,
        Error::Validation(ValidationError::InvalidReferenceMass(0.0))
    );
    assert_eq!(svc.get_calibration_factor(), 348.0);
}

#[test]
fn console_dump_shows_sealed_region() {
    let (svc, _hw, _sink) = make_app(&[]);
    assert_eq!(console::parse("d"), Ok(ConsoleCommand::Dump));

    let image = svc.dump_region().unwrap();
    assert_eq!(
        layout::stored_checksum(&image),
        layout::compute_checksum(&image)
    );
    let lines: Vec<_> = hex_dump(&image).collect();
    assert_eq!(lines.len(), 32);
    assert!(lines[0].starts_with("000: "));
    assert!(lines[31].starts_with("1F0: "));
}

#[test]
fn console_toggles_commands() {
    let (mut svc, mut hw, mut sink) = make_app(&[]);

    console_line(&mut svc, &mut hw, &mut sink, "g").unwrap();
    assert!(svc.get_relay_state());
    console_line(&mut svc, &mut hw, &mut sink, "x").unwrap();
    assert!(!svc.get_relay_state());

    assert!(svc.report_enabled());
    console_line(&mut svc, &mut hw, &mut sink, "p").unwrap();
    assert!(!svc.report_enabled());
    assert_eq!(
        console::parse("p"),
        Ok(ConsoleCommand::App(AppCommand::ToggleWeightReport))
    );
}
