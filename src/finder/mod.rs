//! Resource finders
//!
//! Looks up remote resources by ARN and normalizes "does not exist" into a
//! single [`FindError::NotFound`] signal, whatever API produced it.
//!
//! # Module Structure
//!
//! - [`kind`] - Resource kinds and ARN parsing
//! - [`devicefarm`] - Typed Device Farm finders built on [`find`]
//!
//! # Example
//!
//! ```ignore
//! use tdfarm::finder::{self, devicefarm};
//!
//! async fn exists(conn: &aws_sdk_devicefarm::Client, arn: &str) -> anyhow::Result<bool> {
//!     let project = finder::not_found_as_none(devicefarm::find_project_by_arn(conn, arn).await)?;
//!     Ok(project.is_some())
//! }
//! ```

pub mod devicefarm;
pub mod kind;

pub use kind::ResourceKind;

use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Error code Device Farm returns for a resource that does not exist
pub const NOT_FOUND_EXCEPTION: &str = "NotFoundException";

/// The request a finder issued, kept so callers can tell what was asked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupRequest {
    /// Remote operation name (e.g. "GetDevicePool")
    pub operation: &'static str,
    /// Identifier the lookup was keyed by
    pub arn: String,
}

impl LookupRequest {
    pub fn new(operation: &'static str, arn: impl Into<String>) -> Self {
        Self {
            operation,
            arn: arn.into(),
        }
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (arn: {})", self.operation, self.arn)
    }
}

/// Why a lookup did not produce a descriptor
///
/// `E` is the remote client's own error type. It is carried as-is so a
/// caller can always recover the original failure.
#[derive(Debug, Error)]
pub enum FindError<E> {
    /// The remote system confirmed the resource does not exist
    #[error("couldn't find resource: {request}")]
    NotFound {
        #[source]
        last_error: E,
        request: LookupRequest,
    },

    /// The call succeeded but the expected payload was missing
    #[error("empty result: {request}")]
    EmptyResult { request: LookupRequest },

    /// Any other remote failure, untouched
    #[error(transparent)]
    Remote(E),
}

impl<E> FindError<E> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }

    /// The request behind a classified failure
    ///
    /// `Remote` failures carry no request; the remote error speaks for itself.
    pub fn request(&self) -> Option<&LookupRequest> {
        match self {
            Self::NotFound { request, .. } | Self::EmptyResult { request } => Some(request),
            Self::Remote(_) => None,
        }
    }

    /// The remote error, if one was involved
    pub fn remote(&self) -> Option<&E> {
        match self {
            Self::NotFound { last_error, .. } => Some(last_error),
            Self::Remote(err) => Some(err),
            Self::EmptyResult { .. } => None,
        }
    }

    pub fn into_remote(self) -> Option<E> {
        match self {
            Self::NotFound { last_error, .. } => Some(last_error),
            Self::Remote(err) => Some(err),
            Self::EmptyResult { .. } => None,
        }
    }

    /// Convert the remote error type, keeping the classification
    pub fn map_remote<F>(self, f: impl FnOnce(E) -> F) -> FindError<F> {
        match self {
            Self::NotFound {
                last_error,
                request,
            } => FindError::NotFound {
                last_error: f(last_error),
                request,
            },
            Self::EmptyResult { request } => FindError::EmptyResult { request },
            Self::Remote(err) => FindError::Remote(f(err)),
        }
    }
}

/// Look up one resource and classify the outcome
///
/// `call` performs the remote call for the request's ARN, `extract` pulls the
/// descriptor out of a successful response and `is_not_found` recognizes the
/// remote's "does not exist" sentinel. Classification order: sentinel, other
/// failure, empty payload, success.
pub async fn find<O, T, E, C, Fut, X, P>(
    request: LookupRequest,
    call: C,
    extract: X,
    is_not_found: P,
) -> Result<T, FindError<E>>
where
    C: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<O, E>>,
    X: FnOnce(O) -> Option<T>,
    P: Fn(&E) -> bool,
{
    let output = match call(request.arn.clone()).await {
        Ok(output) => output,
        Err(err) if is_not_found(&err) => {
            return Err(FindError::NotFound {
                last_error: err,
                request,
            })
        }
        Err(err) => return Err(FindError::Remote(err)),
    };

    extract(output).ok_or(FindError::EmptyResult { request })
}

/// Treat a confirmed absence as `None`
///
/// Used by deletion-confirmation flows where "gone" is the expected answer.
/// Empty results and remote failures still surface as errors.
pub fn not_found_as_none<T, E>(result: Result<T, FindError<E>>) -> Result<Option<T>, FindError<E>> {
    match result {
        Ok(found) => Ok(Some(found)),
        Err(FindError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct FakeError(&'static str);

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "remote error: {}", self.0)
        }
    }

    impl std::error::Error for FakeError {}

    fn sentinel(err: &FakeError) -> bool {
        err.0 == NOT_FOUND_EXCEPTION
    }

    #[tokio::test]
    async fn test_sentinel_becomes_not_found() {
        let request = LookupRequest::new("GetDevicePool", "arn:example:device-pool/123");

        let result: Result<String, _> = find(
            request.clone(),
            |_| async { Err::<Option<String>, _>(FakeError(NOT_FOUND_EXCEPTION)) },
            |output| output,
            sentinel,
        )
        .await;

        match result {
            Err(FindError::NotFound {
                last_error,
                request: got,
            }) => {
                assert_eq!(last_error, FakeError(NOT_FOUND_EXCEPTION));
                assert_eq!(got, request);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_payload_is_not_not_found() {
        let result: Result<String, FindError<FakeError>> = find(
            LookupRequest::new("GetProject", "arn:example:project/456"),
            |_| async { Ok::<Option<String>, FakeError>(None) },
            |output| output,
            sentinel,
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_empty_result());
        assert!(!err.is_not_found());
        assert_eq!(err.request().unwrap().arn, "arn:example:project/456");
    }

    #[tokio::test]
    async fn test_other_failures_pass_through() {
        let result: Result<String, _> = find(
            LookupRequest::new("GetUpload", "arn:example:upload/1"),
            |_| async { Err::<Option<String>, _>(FakeError("ThrottlingException")) },
            |output| output,
            sentinel,
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.request().is_none());
        assert_eq!(err.into_remote(), Some(FakeError("ThrottlingException")));
    }

    #[tokio::test]
    async fn test_call_receives_arn() {
        let found = find(
            LookupRequest::new("GetProject", "arn:example:project/789"),
            |arn| async move { Ok::<_, FakeError>(Some(arn)) },
            |output| output,
            sentinel,
        )
        .await
        .unwrap();

        assert_eq!(found, "arn:example:project/789");
    }

    #[test]
    fn test_not_found_as_none() {
        let absent: Result<u8, FindError<FakeError>> = Err(FindError::NotFound {
            last_error: FakeError(NOT_FOUND_EXCEPTION),
            request: LookupRequest::new("GetProject", "arn"),
        });
        assert_eq!(not_found_as_none(absent).unwrap(), None);

        let present: Result<u8, FindError<FakeError>> = Ok(7);
        assert_eq!(not_found_as_none(present).unwrap(), Some(7));

        let empty: Result<u8, FindError<FakeError>> = Err(FindError::EmptyResult {
            request: LookupRequest::new("GetProject", "arn"),
        });
        assert!(not_found_as_none(empty).unwrap_err().is_empty_result());
    }

    #[test]
    fn test_error_messages_name_the_request() {
        let err: FindError<FakeError> = FindError::NotFound {
            last_error: FakeError(NOT_FOUND_EXCEPTION),
            request: LookupRequest::new("GetDevicePool", "arn:example:device-pool/123"),
        };
        assert_eq!(
            err.to_string(),
            "couldn't find resource: GetDevicePool (arn: arn:example:device-pool/123)"
        );

        let err: FindError<FakeError> = FindError::Remote(FakeError("AccessDeniedException"));
        assert_eq!(err.to_string(), "remote error: AccessDeniedException");
    }

    #[test]
    fn test_map_remote_keeps_classification() {
        let err: FindError<FakeError> = FindError::NotFound {
            last_error: FakeError(NOT_FOUND_EXCEPTION),
            request: LookupRequest::new("GetProject", "arn"),
        };
        let mapped = err.map_remote(|e| e.0.to_string());
        assert!(mapped.is_not_found());
        assert_eq!(mapped.remote().map(String::as_str), Some(NOT_FOUND_EXCEPTION));
    }
}
