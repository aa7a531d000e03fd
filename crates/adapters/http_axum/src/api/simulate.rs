//! `POST /simulate_sensor` — inject a fabricated sensor reading.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use grainhub_app::ports::{AuditSink, CommandChannel, DeviceRegistry, TimerRepository};
use grainhub_domain::device::DeviceCode;
use grainhub_domain::error::{HubError, ValidationError};
use grainhub_domain::telemetry::SampleKind;
use grainhub_domain::time;

use crate::state::AppState;

/// Request body for `POST /simulate_sensor`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateRequest {
    #[serde(rename = "deviceCode", default)]
    pub device_code: Option<String>,
    #[serde(rename = "type", default)]
    pub sample_type: Option<String>,
}

/// Success body: the published synthetic reading.
#[derive(Debug, Serialize)]
pub struct SimulateBody {
    pub ok: bool,
    pub message: String,
    pub data: Value,
}

/// Failure body.
#[derive(Debug, Serialize)]
pub struct SimulateErrorBody {
    pub ok: bool,
    pub message: String,
}

/// Possible responses from the simulate endpoint.
pub enum SimulateResponse {
    Ok(Json<SimulateBody>),
    Invalid(Json<SimulateErrorBody>),
    Failed(Json<SimulateErrorBody>),
}

impl IntoResponse for SimulateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Invalid(json) => (StatusCode::BAD_REQUEST, json).into_response(),
            Self::Failed(json) => (StatusCode::INTERNAL_SERVER_ERROR, json).into_response(),
        }
    }
}

fn invalid(err: &ValidationError) -> SimulateResponse {
    SimulateResponse::Invalid(Json(SimulateErrorBody {
        ok: false,
        message: err.to_string(),
    }))
}

/// `POST /simulate_sensor`
pub async fn handle<TR, DR, CC, AS>(
    State(state): State<AppState<TR, DR, CC, AS>>,
    Json(req): Json<SimulateRequest>,
) -> SimulateResponse
where
    TR: TimerRepository + Send + Sync + 'static,
    DR: DeviceRegistry + Send + Sync + 'static,
    CC: CommandChannel + Send + Sync + 'static,
    AS: AuditSink + Send + Sync + 'static,
{
    let device = match req.device_code.as_ref() {
        None => return invalid(&ValidationError::MissingDeviceCode),
        Some(code) => match DeviceCode::new(code.clone()) {
            Ok(device) => device,
            Err(err) => return invalid(&err),
        },
    };
    let sample = match req
        .sample_type
        .as_deref()
        .map_or(Err(ValidationError::UnknownSampleType(String::new())), SampleKind::parse)
    {
        Ok(sample) => sample,
        Err(err) => return invalid(&err),
    };

    match state.dispatcher.simulate(device, sample, time::now()).await {
        Ok(receipt) => SimulateResponse::Ok(Json(SimulateBody {
            ok: true,
            message: format!("test reading published to {}", receipt.topic),
            data: receipt.payload,
        })),
        Err(HubError::Validation(err)) => invalid(&err),
        Err(err) => {
            tracing::error!(error = %err, "simulated reading publish failed");
            SimulateResponse::Failed(Json(SimulateErrorBody {
                ok: false,
                message: "failed to publish test reading".to_string(),
            }))
        }
    }
}
