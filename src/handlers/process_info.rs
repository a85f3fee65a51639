//! Query file endpoint.
//!
//! `GET /process_info` reads the report for the current selection.
//! `PUT` or `POST /process_info` writes a PID into the selection slot.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use herakles_process_info::{WriteError, WriteErrorKind, MAX_PID_INPUT_LEN};
use http_body_util::LengthLimitError;
use std::io;
use tokio::task::JoinError;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Bodies are buffered up to one byte past the PID limit, enough for the
/// service to see that the payload is too long.
const WRITE_BODY_LIMIT: usize = MAX_PID_INPUT_LEN + 1;

/// A rejected PID write.
#[derive(Debug)]
pub struct WriteRejection(pub WriteError);

impl IntoResponse for WriteRejection {
    fn into_response(self) -> Response {
        let errno = match self.0.kind() {
            WriteErrorKind::InvalidInput => "EINVAL",
            WriteErrorKind::AccessFault => "EFAULT",
        };
        (
            StatusCode::BAD_REQUEST,
            [("Content-Type", "text/plain; charset=utf-8")],
            format!("{}: {}\n", errno, self.0),
        )
            .into_response()
    }
}

/// Handler for `GET /process_info`.
#[instrument(skip(state))]
pub async fn read_handler(State(state): State<SharedState>) -> Response {
    debug!("Processing /process_info read");
    let service = state.service.clone();

    // Procfs access is blocking I/O.
    report_response(tokio::task::spawn_blocking(move || service.read()).await)
}

fn report_response(report: Result<String, JoinError>) -> Response {
    match report {
        Ok(report) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; charset=utf-8")],
            report,
        )
            .into_response(),
        Err(e) => {
            error!("process_info read task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                "Failed to render process report\n",
            )
                .into_response()
        }
    }
}

/// Handler for `PUT /process_info` and `POST /process_info`.
#[instrument(skip(state, headers, body))]
pub async fn write_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Body,
) -> Result<String, WriteRejection> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(len) = declared.filter(|len| *len > MAX_PID_INPUT_LEN) {
        // Rejected before any of the body is copied.
        return Err(reject_too_long(&state, len));
    }

    let payload = match to_bytes(body, WRITE_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let source = e.into_inner();
            if source.is::<LengthLimitError>() {
                debug!("undeclared body exceeded {} bytes", WRITE_BODY_LIMIT);
                return Err(reject_too_long(&state, WRITE_BODY_LIMIT));
            }
            return Err(WriteRejection(
                state.service.access_fault(io::Error::other(source)),
            ));
        }
    };

    let consumed = state.service.write(&payload).map_err(WriteRejection)?;
    debug!("Accepted {} byte PID write", consumed);
    Ok(format!("{}\n", consumed))
}

/// Records an oversized write with the service without copying any of it.
fn reject_too_long(state: &SharedState, len: usize) -> WriteRejection {
    WriteRejection(
        state
            .service
            .write_from(io::empty(), len)
            .err()
            .unwrap_or(WriteError::TooLong(len)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_state;
    use herakles_process_info::ProcessRecord;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_read_without_selection() {
        let state = test_state(vec![]);
        let response = read_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "No valid PID provided\n");
    }

    #[tokio::test]
    async fn test_failed_read_task_is_server_error() {
        let failed = tokio::task::spawn_blocking(|| -> String { panic!("render failed") }).await;
        let response = report_response(failed);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Failed to render process report\n");
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let state = test_state(vec![ProcessRecord::new(7, 1000, None)]);

        let consumed = write_handler(State(state.clone()), HeaderMap::new(), Body::from("7\n"))
            .await
            .unwrap();
        assert_eq!(consumed, "2\n");

        let response = read_handler(State(state)).await;
        assert_eq!(
            body_text(response).await,
            "PID: 7\nUID: 1000\nExecutable: Unknown\nCommand line: [no command line data]\n"
        );
    }

    #[tokio::test]
    async fn test_invalid_write_is_bad_request() {
        let state = test_state(vec![]);
        state.service.write(b"5").unwrap();

        let rejection = write_handler(State(state.clone()), HeaderMap::new(), Body::from("abc"))
            .await
            .unwrap_err();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.starts_with("EINVAL"));
        assert_eq!(state.service.session().current_selection(), 5);
    }

    #[tokio::test]
    async fn test_declared_oversized_write() {
        let state = test_state(vec![]);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "100".parse().unwrap());

        let rejection = write_handler(State(state.clone()), headers, Body::from(vec![b'1'; 100]))
            .await
            .unwrap_err();
        assert!(matches!(rejection.0, WriteError::TooLong(100)));
        assert_eq!(state.service.stats().snapshot().writes_rejected, 1);
    }

    #[tokio::test]
    async fn test_undeclared_oversized_write() {
        let state = test_state(vec![]);
        let rejection = write_handler(State(state), HeaderMap::new(), Body::from(vec![b'1'; 40]))
            .await
            .unwrap_err();
        assert!(matches!(rejection.0, WriteError::TooLong(_)));
    }

    #[tokio::test]
    async fn test_large_unsized_body_is_too_long_not_fault() {
        let state = test_state(vec![]);
        state.service.write(b"9").unwrap();

        let rejection = write_handler(
            State(state.clone()),
            HeaderMap::new(),
            Body::from(vec![b'1'; 70_000]),
        )
        .await
        .unwrap_err();
        assert_eq!(rejection.0.kind(), WriteErrorKind::InvalidInput);
        assert!(matches!(rejection.0, WriteError::TooLong(_)));

        let stats = state.service.stats().snapshot();
        assert_eq!(stats.writes_rejected, 1);
        assert_eq!(stats.access_faults, 0);
        assert_eq!(state.service.session().current_selection(), 9);

        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.starts_with("EINVAL"));
    }
}
