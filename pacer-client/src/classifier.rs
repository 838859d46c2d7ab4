//! Mapping of responses and transport failures onto [`Status`].

use crate::error::{ClientError, ClientResult};
use crate::outcome::Outcome;
use crate::request::{NotFoundPolicy, RequestSpec};
use crate::response::RawResponse;
use crate::status::Status;
use crate::transport::TransportError;
use http::{HeaderMap, StatusCode};
use std::fmt;

/// Header a service sets to flag a request as failing validation.
pub const VALIDATION_EXCEPTION_HEADER: &str = "validation-exception";

/// Result of classifying a transport failure.
#[derive(Debug, Clone)]
pub enum Classified<E> {
    /// The failure has a status
    Outcome(Outcome<E>),
    /// The failure is transient and must be retried, not reported
    Transient(TransportError),
}

/// Status for an HTTP response. First match wins:
///
/// | response                                   | status      |
/// |--------------------------------------------|-------------|
/// | 200, 202                                   | `SUCCESS`   |
/// | 400                                        | `INVALID`   |
/// | 404                                        | `NOTFOUND`  |
/// | 403                                        | `DENIED`    |
/// | 503                                        | `ERROR`     |
/// | header `validation-exception: true`        | `INVALID`   |
/// | anything else                              | `ERROR`     |
pub fn classify_status(status: StatusCode, headers: &HeaderMap) -> Status {
    match status.as_u16() {
        200 | 202 => Status::Success,
        400 => Status::Invalid,
        404 => Status::NotFound,
        403 => Status::Denied,
        503 => Status::Error,
        _ if has_validation_exception(headers) => Status::Invalid,
        _ => Status::Error,
    }
}

fn has_validation_exception(headers: &HeaderMap) -> bool {
    headers
        .get(VALIDATION_EXCEPTION_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Classify a response, decoding the body on success.
///
/// A body that fails to decode is a local defect and comes back as
/// [`ClientError::Decode`] rather than as an outcome.
pub fn classify_response<E, D, DE>(
    response: &RawResponse,
    request: &RequestSpec,
    decode: D,
) -> ClientResult<Outcome<E>>
where
    D: FnOnce(&RawResponse) -> Result<E, DE>,
    DE: fmt::Display,
{
    let status = classify_status(response.status(), response.headers());
    match status {
        Status::Success => decode(response)
            .map(Outcome::success)
            .map_err(|e| ClientError::Decode {
                description: request.description(),
                message: e.to_string(),
            }),
        Status::Error => Ok(Outcome::failed(status, error_report(response, request))),
        Status::Invalid if response.status() != StatusCode::BAD_REQUEST => Ok(Outcome::failed(
            status,
            format!("{}: {} {}", request.description(), response.status(), response.text()),
        )),
        _ => Ok(Outcome::failed(status, short_report(response, request))),
    }
}

/// Classify a failure raised by the transport while executing `request`.
///
/// Messages read `"<description>: <STATUS> <transport message>"`. A raised
/// not-found follows the request's [`NotFoundPolicy`].
pub fn classify_transport_error<E>(error: &TransportError, request: &RequestSpec) -> Classified<E> {
    let report = |status: Status, message: &str| {
        format!("{}: {} {}", request.description(), status, message)
    };
    let outcome = match error {
        TransportError::Aborted(message) => {
            Outcome::failed(Status::Aborted, report(Status::Aborted, message))
        }
        TransportError::NotFound(message) => match request.options().not_found {
            NotFoundPolicy::Absent => Outcome::absent(),
            NotFoundPolicy::Report => {
                Outcome::failed(Status::NotFound, report(Status::NotFound, message))
            }
        },
        TransportError::Io { message, source } => {
            Outcome::failed(Status::Error, report(Status::Error, message)).with_cause(source.clone())
        }
        TransportError::Request { message, source } => {
            Outcome::fatal(report(Status::FatalError, message), source.clone())
        }
        TransportError::ServiceUnavailable(_)
        | TransportError::InternalServerError(_)
        | TransportError::ConnectionReset(_) => return Classified::Transient(error.clone()),
    };
    Classified::Outcome(outcome)
}

/// Full diagnostic text for an `ERROR` response.
fn error_report(response: &RawResponse, request: &RequestSpec) -> String {
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{}: {} {} returned {} [{}] {}",
        request.description(),
        request.method(),
        request.url(),
        response.status(),
        headers,
        response.text()
    )
}

fn short_report(response: &RawResponse, request: &RequestSpec) -> String {
    let body = response.text();
    if body.is_empty() {
        format!("{}: {}", request.description(), response.status())
    } else {
        format!("{}: {} {}", request.description(), response.status(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn status_of(code: u16) -> Status {
        classify_status(StatusCode::from_u16(code).unwrap(), &HeaderMap::new())
    }

    fn validation_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(VALIDATION_EXCEPTION_HEADER, value.parse().unwrap());
        headers
    }

    fn text(response: &RawResponse) -> Result<String, String> {
        Ok(response.text())
    }

    #[test]
    fn test_status_table() {
        assert_eq!(status_of(200), Status::Success);
        assert_eq!(status_of(202), Status::Success);
        assert_eq!(status_of(400), Status::Invalid);
        assert_eq!(status_of(404), Status::NotFound);
        assert_eq!(status_of(403), Status::Denied);
        assert_eq!(status_of(503), Status::Error);
        assert_eq!(status_of(500), Status::Error);
        assert_eq!(status_of(201), Status::Error);
        assert_eq!(status_of(204), Status::Error);
        assert_eq!(status_of(429), Status::Error);
    }

    #[test]
    fn test_validation_header() {
        let code = StatusCode::UNPROCESSABLE_ENTITY;
        assert_eq!(classify_status(code, &validation_headers("true")), Status::Invalid);
        assert_eq!(classify_status(code, &validation_headers("TRUE")), Status::Invalid);
        assert_eq!(classify_status(code, &validation_headers("false")), Status::Error);
    }

    #[test]
    fn test_table_rows_beat_validation_header() {
        let headers = validation_headers("true");
        assert_eq!(classify_status(StatusCode::OK, &headers), Status::Success);
        assert_eq!(classify_status(StatusCode::NOT_FOUND, &headers), Status::NotFound);
        assert_eq!(classify_status(StatusCode::FORBIDDEN, &headers), Status::Denied);
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, &headers),
            Status::Error
        );
    }

    #[test]
    fn test_classification_is_total() {
        for code in 100..=599 {
            let status = status_of(code);
            assert!(status.is_ok() || status.needs_retry() || status.is_permanent());
        }
    }

    #[test]
    fn test_success_decodes_body() {
        let request = RequestSpec::get("/users/1");
        let response = RawResponse::with_status(200, "ada");

        let outcome = classify_response(&response, &request, text).unwrap();
        assert_eq!(outcome.status(), Status::Success);
        assert_eq!(outcome.into_entity().as_deref(), Some("ada"));
    }

    #[test]
    fn test_decode_failure_is_an_error() {
        let request = RequestSpec::get("/users/1").describe("user 1");
        let response = RawResponse::with_status(200, "not json");

        let err = classify_response(&response, &request, |r| {
            serde_json::from_slice::<serde_json::Value>(r.bytes())
        })
        .unwrap_err();

        match err {
            ClientError::Decode { description, .. } => assert_eq!(description, "user 1"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_decoder_not_called_on_failure() {
        let request = RequestSpec::get("/users/1");
        let response = RawResponse::with_status(403, "");

        let outcome = classify_response::<String, _, String>(&response, &request, |_| {
            panic!("decoder must not run")
        })
        .unwrap();
        assert_eq!(outcome.status(), Status::Denied);
        assert_eq!(outcome.errors(), Some("GET /users/1: 403 Forbidden"));
    }

    #[test]
    fn test_error_message_is_diagnostic() {
        let request = RequestSpec::post("/orders").describe("create order");
        let response = RawResponse::with_status(500, "boom").header("x-request-id", "r-1");

        let outcome = classify_response(&response, &request, text).unwrap();
        let message = outcome.errors().unwrap();
        assert_eq!(outcome.status(), Status::Error);
        assert!(message.contains("create order"));
        assert!(message.contains("POST /orders"));
        assert!(message.contains("500"));
        assert!(message.contains("x-request-id: r-1"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_validation_message_names_target() {
        let request = RequestSpec::put("/users/1");
        let response =
            RawResponse::with_status(422, "name is required").header(VALIDATION_EXCEPTION_HEADER, "true");

        let outcome = classify_response(&response, &request, text).unwrap();
        assert_eq!(outcome.status(), Status::Invalid);
        assert_eq!(
            outcome.errors(),
            Some("PUT /users/1: 422 Unprocessable Entity name is required")
        );
    }

    #[test]
    fn test_transport_error_mapping() {
        let absent = RequestSpec::get("/media/M1").describe("load media M1");
        let report = absent.clone().not_found(NotFoundPolicy::Report);
        let outcome = |err: TransportError, request: &RequestSpec| {
            match classify_transport_error::<()>(&err, request) {
                Classified::Outcome(outcome) => Some(outcome),
                Classified::Transient(_) => None,
            }
        };

        let aborted = outcome(TransportError::Aborted("eof".into()), &absent).unwrap();
        assert_eq!(aborted.status(), Status::Aborted);
        assert_eq!(aborted.errors(), Some("load media M1: ABORTED eof"));

        let gone = outcome(TransportError::NotFound("gone".into()), &absent).unwrap();
        assert_eq!(gone.status(), Status::Success);
        assert!(gone.entity().is_none());

        let reported = outcome(TransportError::NotFound("gone".into()), &report).unwrap();
        assert_eq!(reported.status(), Status::NotFound);
        assert_eq!(reported.errors(), Some("load media M1: NOTFOUND gone"));

        let io = outcome(TransportError::io(std::io::Error::other("timed out")), &absent).unwrap();
        assert_eq!(io.status(), Status::Error);
        assert!(io.errors().unwrap().starts_with("load media M1: ERROR"));
        assert!(io.cause().is_some());

        let fatal = outcome(
            TransportError::Request {
                message: "bad url".into(),
                source: Arc::new(std::io::Error::other("bad url")),
            },
            &absent,
        )
        .unwrap();
        assert_eq!(fatal.status(), Status::FatalError);
        assert_eq!(fatal.errors(), Some("load media M1: FATAL_ERROR bad url"));
        assert!(fatal.cause().is_some());

        for transient in [
            TransportError::ServiceUnavailable("503".into()),
            TransportError::InternalServerError("500".into()),
            TransportError::ConnectionReset("reset".into()),
        ] {
            assert!(outcome(transient, &report).is_none());
        }
    }
}
