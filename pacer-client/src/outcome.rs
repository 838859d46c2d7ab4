//! Classified result of a remote call.

use crate::error::{ClientError, ClientResult};
use crate::status::Status;
use pacer_cache::Lookup;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Shared underlying error kept for diagnostics.
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// Outcome of one remote call: a [`Status`], the decoded entity on success,
/// and error text otherwise.
///
/// An entity is only ever present with `SUCCESS`; every other status carries
/// an error message. Permanent failures arrive here, never as an `Err`.
#[derive(Debug, Clone)]
pub struct Outcome<E> {
    status: Status,
    entity: Option<E>,
    errors: Option<String>,
    cause: Option<Cause>,
}

impl<E> Outcome<E> {
    /// `SUCCESS` carrying `entity`.
    pub fn success(entity: E) -> Self {
        Self {
            status: Status::Success,
            entity: Some(entity),
            errors: None,
            cause: None,
        }
    }

    /// `SUCCESS` with nothing to return.
    pub fn absent() -> Self {
        Self {
            status: Status::Success,
            entity: None,
            errors: None,
            cause: None,
        }
    }

    /// `NOTNEEDED` with an explanation.
    pub fn not_needed(message: impl Into<String>) -> Self {
        Self::failed(Status::NotNeeded, message)
    }

    /// A non-success outcome.
    ///
    /// Returns [`ClientError::Config`] for the ok statuses, which have their
    /// own constructors.
    pub fn failure(status: Status, message: impl Into<String>) -> ClientResult<Self> {
        if status.is_ok() {
            return Err(ClientError::Config(format!(
                "{status} is not a failure status"
            )));
        }
        Ok(Self::failed(status, message))
    }

    /// `FATAL_ERROR` with its cause.
    pub fn fatal(message: impl Into<String>, cause: Cause) -> Self {
        Self::failed(Status::FatalError, message).with_cause(cause)
    }

    /// Attach the underlying error.
    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub(crate) fn failed(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            entity: None,
            errors: Some(message.into()),
            cause: None,
        }
    }

    /// Status of the call.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Decoded entity, present only on `SUCCESS`.
    pub fn entity(&self) -> Option<&E> {
        self.entity.as_ref()
    }

    /// Take the entity.
    pub fn into_entity(self) -> Option<E> {
        self.entity
    }

    /// Error text, present on every non-success status.
    pub fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }

    /// Underlying error, if one was kept.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// See [`Status::is_ok`].
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// See [`Status::needs_retry`].
    pub fn needs_retry(&self) -> bool {
        self.status.needs_retry()
    }

    /// See [`Status::is_permanent`].
    pub fn is_permanent(&self) -> bool {
        self.status.is_permanent()
    }

    /// Transform the entity, keeping status and diagnostics.
    pub fn map<U>(self, f: impl FnOnce(E) -> U) -> Outcome<U> {
        Outcome {
            status: self.status,
            entity: self.entity.map(f),
            errors: self.errors,
            cause: self.cause,
        }
    }

    /// Drop the entity type; for callers that only need the status.
    pub fn discard(self) -> Outcome<()> {
        self.map(|_| ())
    }

    /// Convert into the tagged lookup shape.
    ///
    /// `SUCCESS` with an entity is `Found`. `SUCCESS` without one, `NOTNEEDED`
    /// and `NOTFOUND` are `NotFound`. Everything else is an `Error`.
    pub fn into_lookup(self) -> Lookup<E, Failure> {
        match (self.status, self.entity) {
            (Status::Success, Some(entity)) => Lookup::Found(entity),
            (Status::Success | Status::NotNeeded | Status::NotFound, _) => Lookup::NotFound,
            (status, _) => Lookup::Error(Failure {
                status,
                message: self.errors.unwrap_or_default(),
            }),
        }
    }
}

/// Cloneable payload of a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct Failure {
    /// Status that made the lookup fail
    pub status: Status,
    /// Error text of the outcome
    pub message: String,
}

impl Failure {
    /// Whether the same lookup may succeed later.
    pub fn is_retryable(&self) -> bool {
        self.status.needs_retry()
    }
}
