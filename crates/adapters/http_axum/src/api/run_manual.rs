//! `POST /run_manual` — validated run/set-mode dispatch.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use grainhub_app::ports::{AuditSink, CommandChannel, DeviceRegistry, TimerRepository};
use grainhub_app::services::dispatcher::{RunCommandKind, RunRequest};
use grainhub_domain::command::{DEFAULT_AUTO_INTERVAL_SECS, RunMode};
use grainhub_domain::device::DeviceCode;
use grainhub_domain::error::{HubError, ValidationError};
use grainhub_domain::time;

use crate::state::AppState;

/// A numeric field that callers may send as a JSON number or a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn to_f64(&self) -> Result<f64, ValidationError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ValidationError::NotANumber(s.clone())),
        }
    }
}

/// Request body for `POST /run_manual`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManualRequest {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<NumberOrText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<NumberOrText>,
    #[serde(
        rename = "deviceCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub device_code: Option<String>,
}

/// Response body shared by every outcome of this endpoint.
#[derive(Debug, Serialize)]
pub struct RunManualBody {
    pub ok: bool,
    pub mode: String,
    pub message: String,
    pub echo: Value,
}

/// Possible responses from the run/set-mode endpoint.
pub enum RunManualResponse {
    Ok(Json<RunManualBody>),
    Invalid(Json<RunManualBody>),
    Failed(Json<RunManualBody>),
}

impl IntoResponse for RunManualResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Invalid(json) => (StatusCode::BAD_REQUEST, json).into_response(),
            Self::Failed(json) => (StatusCode::INTERNAL_SERVER_ERROR, json).into_response(),
        }
    }
}

fn to_run_request(req: &RunManualRequest) -> Result<RunRequest, ValidationError> {
    let device = req
        .device_code
        .as_ref()
        .map(|code| DeviceCode::new(code.clone()))
        .transpose()?;

    let kind = match req.command.as_str() {
        "run_manual" => {
            let moisture = req
                .moisture
                .as_ref()
                .ok_or_else(|| ValidationError::NotANumber("missing".to_string()))?
                .to_f64()?;
            let correction = req
                .correction
                .as_ref()
                .ok_or_else(|| ValidationError::NotANumber("missing".to_string()))?
                .to_f64()?;
            RunCommandKind::RunManual {
                moisture,
                correction,
            }
        }
        "set_mode" => {
            let mode = match req.mode.as_deref() {
                None => RunMode::Auto,
                Some(s) => s.parse()?,
            };
            let interval_secs = match mode {
                RunMode::Auto => Some(DEFAULT_AUTO_INTERVAL_SECS),
                RunMode::Manual => None,
            };
            RunCommandKind::SetMode {
                mode,
                interval_secs,
            }
        }
        other => return Err(ValidationError::UnknownCommand(other.to_string())),
    };

    Ok(RunRequest { kind, device })
}

/// `POST /run_manual`
pub async fn handle<TR, DR, CC, AS>(
    State(state): State<AppState<TR, DR, CC, AS>>,
    headers: HeaderMap,
    Json(req): Json<RunManualRequest>,
) -> RunManualResponse
where
    TR: TimerRepository + Send + Sync + 'static,
    DR: DeviceRegistry + Send + Sync + 'static,
    CC: CommandChannel + Send + Sync + 'static,
    AS: AuditSink + Send + Sync + 'static,
{
    let actor = state.verifier.actor_from_header(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    );
    let echo = serde_json::to_value(&req).unwrap_or(Value::Null);

    let run_request = match to_run_request(&req) {
        Ok(run_request) => run_request,
        Err(err) => {
            return RunManualResponse::Invalid(Json(RunManualBody {
                ok: false,
                mode: "error".to_string(),
                message: err.to_string(),
                echo,
            }));
        }
    };

    match state
        .dispatcher
        .run_request(run_request, &actor, time::now())
        .await
    {
        Ok(receipt) => RunManualResponse::Ok(Json(RunManualBody {
            ok: true,
            mode: receipt.mode.to_string(),
            message: format!("command published to {}", receipt.topic),
            echo,
        })),
        Err(HubError::Validation(err)) => RunManualResponse::Invalid(Json(RunManualBody {
            ok: false,
            mode: "error".to_string(),
            message: err.to_string(),
            echo,
        })),
        Err(err) => {
            tracing::error!(error = %err, "run_manual dispatch failed");
            RunManualResponse::Failed(Json(RunManualBody {
                ok: false,
                mode: "error".to_string(),
                message: "internal server error".to_string(),
                echo,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str) -> RunManualRequest {
        RunManualRequest {
            command: command.to_string(),
            mode: None,
            moisture: Some(NumberOrText::Number(14.5)),
            correction: Some(NumberOrText::Number(0.0)),
            device_code: None,
        }
    }

    #[test]
    fn should_reject_unknown_command_before_dispatch() {
        let result = to_run_request(&request("reboot"));
        assert_eq!(
            result,
            Err(ValidationError::UnknownCommand("reboot".to_string()))
        );
    }

    #[test]
    fn should_parse_numeric_strings() {
        let mut req = request("run_manual");
        req.moisture = Some(NumberOrText::Text("42.5".to_string()));
        req.correction = Some(NumberOrText::Text(" -3 ".to_string()));

        let run_request = to_run_request(&req).unwrap();
        assert_eq!(
            run_request.kind,
            RunCommandKind::RunManual {
                moisture: 42.5,
                correction: -3.0
            }
        );
    }

    #[test]
    fn should_reject_non_numeric_strings() {
        let mut req = request("run_manual");
        req.moisture = Some(NumberOrText::Text("wet".to_string()));

        assert_eq!(
            to_run_request(&req),
            Err(ValidationError::NotANumber("wet".to_string()))
        );
    }

    #[test]
    fn should_reject_missing_parameters_for_run_manual() {
        let mut req = request("run_manual");
        req.moisture = None;

        assert!(matches!(
            to_run_request(&req),
            Err(ValidationError::NotANumber(_))
        ));
    }

    #[test]
    fn should_default_set_mode_to_auto_with_interval() {
        let mut req = request("set_mode");
        req.moisture = None;
        req.correction = None;

        let run_request = to_run_request(&req).unwrap();
        assert_eq!(
            run_request.kind,
            RunCommandKind::SetMode {
                mode: RunMode::Auto,
                interval_secs: Some(300)
            }
        );
    }

    #[test]
    fn should_send_no_interval_for_manual_set_mode() {
        let mut req = request("set_mode");
        req.mode = Some("manual".to_string());

        let run_request = to_run_request(&req).unwrap();
        assert_eq!(
            run_request.kind,
            RunCommandKind::SetMode {
                mode: RunMode::Manual,
                interval_secs: None
            }
        );
    }

    #[test]
    fn should_reject_empty_device_code() {
        let mut req = request("run_manual");
        req.device_code = Some(String::new());

        assert_eq!(
            to_run_request(&req),
            Err(ValidationError::EmptyDeviceCode)
        );
    }
}
