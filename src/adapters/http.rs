//! HTTP route table.
//!
//! Pure request → action mapping, so every route is testable on the host.
//! The binary wires [`dispatch`] into the ESP-IDF HTTP server: reads are
//! answered from the latest [`StatusSnapshot`], mutations are validated
//! against it and queued as [`AppCommand`]s for the poll loop.
//!
//! | Route                              | Reply                          |
//! |------------------------------------|--------------------------------|
//! | `/weight`                          | weight, 2 decimals             |
//! | `/tare`                            | `Taring...` (queued)           |
//! | `/tare_status`                     | `Done` / `Taring...`           |
//! | `/reset_relay`, `/toggle_relay`    | empty (queued)                 |
//! | `/set_weight_setpoint?value=`      | empty (queued) or 400          |
//! | `/set_calibration_factor?value=`   | empty (queued) or 400          |
//! | `/set_timer_threshold?value=`      | empty (queued) or 400          |
//! | `/setpoint`, `/calibration_factor` | value                          |
//! | `/elapsed`                         | elapsed milliseconds           |
//! | `/status`                          | JSON snapshot                  |

use crate::app::commands::AppCommand;
use crate::app::service::StatusSnapshot;
use crate::store::Param;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpReply {
    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.into(),
        }
    }

    fn ok(body: impl Into<String>) -> Self {
        Self::text(200, body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpAction {
    /// Answer immediately.
    Reply(HttpReply),
    /// Queue the command, then answer.
    Enqueue(AppCommand, HttpReply),
}

impl HttpAction {
    pub fn reply(&self) -> &HttpReply {
        match self {
            Self::Reply(r) | Self::Enqueue(_, r) => r,
        }
    }
}

/// Split `/path?query` into its parts.
pub fn split_uri(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    }
}

/// First value of `key` in a `a=1&b=2` query string.
pub fn query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

/// Route one GET request.
pub fn dispatch(path: &str, query: Option<&str>, status: &StatusSnapshot) -> HttpAction {
    use HttpAction::{Enqueue, Reply};

    match path {
        "/" => Reply(HttpReply::ok("SmartScale")),
        "/weight" => Reply(HttpReply::ok(format!("{:.2}", status.weight))),
        "/tare" => Enqueue(AppCommand::Tare, HttpReply::ok("Taring...")),
        "/tare_status" => Reply(HttpReply::ok(if status.tare_in_progress {
            "Taring..."
        } else {
            "Done"
        })),
        "/reset_relay" => Enqueue(AppCommand::ResetRelay, HttpReply::ok("")),
        "/toggle_relay" => Enqueue(AppCommand::ToggleRelay, HttpReply::ok("")),
        "/setpoint" => Reply(HttpReply::ok(format!(
            "{:.2}",
            status.params.weight_setpoint
        ))),
        "/calibration_factor" => Reply(HttpReply::ok(format!(
            "{}",
            status.params.calibration_factor
        ))),
        "/elapsed" => Reply(HttpReply::ok(status.elapsed_ms.to_string())),
        "/set_weight_setpoint" => set_param(
            Param::WeightSetpoint,
            query,
            status,
            AppCommand::SetSetpoint,
        ),
        "/set_calibration_factor" => set_param(
            Param::CalibrationFactor,
            query,
            status,
            AppCommand::SetCalibrationFactor,
        ),
        "/set_timer_threshold" => set_param(
            Param::TimerThreshold,
            query,
            status,
            AppCommand::SetTimerThreshold,
        ),
        "/status" => match serde_json::to_string(status) {
            Ok(json) => Reply(HttpReply {
                status: 200,
                content_type: APPLICATION_JSON,
                body: json,
            }),
            Err(_) => Reply(HttpReply::text(500, "serialisation failed")),
        },
        _ => Reply(HttpReply::text(404, "Not found")),
    }
}

fn set_param(
    param: Param,
    query: Option<&str>,
    status: &StatusSnapshot,
    make: fn(f32) -> AppCommand,
) -> HttpAction {
    let Some(raw) = query_param(query, "value") else {
        return HttpAction::Reply(HttpReply::text(400, "missing value"));
    };
    let Ok(value) = raw.trim().parse::<f32>() else {
        return HttpAction::Reply(HttpReply::text(400, "value is not a number"));
    };
    match status.params.validate(param, value) {
        Ok(()) => HttpAction::Enqueue(make(value), HttpReply::ok("")),
        Err(e) => HttpAction::Reply(HttpReply::text(400, e.to_string())),
    }
}
