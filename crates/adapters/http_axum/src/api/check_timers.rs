//! `POST /check_timers` — external trigger for one reconciliation cycle.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use grainhub_app::ports::{AuditSink, CommandChannel, DeviceRegistry, TimerRepository};
use grainhub_domain::time;

use crate::state::AppState;

/// Response body for `POST /check_timers`.
#[derive(Debug, Serialize)]
pub struct CheckTimersBody {
    pub success: bool,
    pub stopped_devices: Vec<String>,
    pub expired_cleared: u64,
}

/// Possible responses from the scheduler trigger.
pub enum CheckTimersResponse {
    Ok(Json<CheckTimersBody>),
    Failed(Json<CheckTimersBody>),
}

impl IntoResponse for CheckTimersResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::Failed(json) => (StatusCode::INTERNAL_SERVER_ERROR, json).into_response(),
        }
    }
}

/// `POST /check_timers`
pub async fn handle<TR, DR, CC, AS>(
    State(state): State<AppState<TR, DR, CC, AS>>,
) -> CheckTimersResponse
where
    TR: TimerRepository + Send + Sync + 'static,
    DR: DeviceRegistry + Send + Sync + 'static,
    CC: CommandChannel + Send + Sync + 'static,
    AS: AuditSink + Send + Sync + 'static,
{
    match state.reconciler.run_cycle(time::now()).await {
        Ok(outcome) => CheckTimersResponse::Ok(Json(CheckTimersBody {
            success: true,
            stopped_devices: outcome
                .stopped_devices
                .iter()
                .map(ToString::to_string)
                .collect(),
            expired_cleared: outcome.expired_cleared,
        })),
        Err(err) => {
            tracing::error!(error = %err, "reconciliation cycle failed");
            CheckTimersResponse::Failed(Json(CheckTimersBody {
                success: false,
                stopped_devices: Vec::new(),
                expired_cleared: 0,
            }))
        }
    }
}
