//! Scripted transport for tests.

use crate::request::RequestSpec;
use crate::response::RawResponse;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    Respond {
        response: RawResponse,
        delay: Option<Duration>,
    },
    Fail(TransportError),
}

/// Transport that replays a script of responses and failures.
///
/// Steps are consumed in order; once the script runs out the last step
/// repeats. An empty script answers `200` with an empty body.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl MockTransport {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response. Panics on an invalid status code.
    pub fn respond(self, status: u16, body: &'static str) -> Self {
        self.respond_with(RawResponse::with_status(status, body))
    }

    /// Append a prepared response.
    pub fn respond_with(self, response: RawResponse) -> Self {
        self.push(Step::Respond {
            response,
            delay: None,
        })
    }

    /// Append a response delivered after `delay`. Panics on an invalid
    /// status code.
    pub fn respond_after(self, delay: Duration, status: u16, body: &'static str) -> Self {
        self.push(Step::Respond {
            response: RawResponse::with_status(status, body),
            delay: Some(delay),
        })
    }

    /// Append a transport failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Step::Fail(error))
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().push_back(step);
        self
    }

    /// Number of exchanges performed.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().clone()
    }

    fn next_step(&self) -> Option<Step> {
        let mut last = self.last.lock();
        if let Some(step) = self.script.lock().pop_front() {
            *last = Some(step);
        }
        last.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
        match self.next_step() {
            Some(Step::Respond { response, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(Step::Fail(error)) => Err(error),
            None => Ok(RawResponse::with_status(200, "")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_repeat_last() {
        let transport = MockTransport::new()
            .respond(503, "")
            .fail(TransportError::Aborted("eof".into()));
        let request = RequestSpec::get("/x");

        assert_eq!(transport.execute(&request).await.unwrap().status(), 503);
        assert!(transport.execute(&request).await.is_err());
        assert!(transport.execute(&request).await.is_err());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_script() {
        let transport = MockTransport::new();
        let response = transport.execute(&RequestSpec::get("/x")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(transport.requests()[0].url(), "/x");
    }
}
