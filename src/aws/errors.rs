//! Remote error classification
//!
//! Device Farm reports failures as an error code plus a free-form message.
//! These helpers turn that pair into user-facing text and decide which
//! failures mean "this region or account can't be swept" rather than a real
//! problem.

use std::error::Error;

/// Maximum length of an error message to log or show
const MAX_MESSAGE_LENGTH: usize = 200;

/// Error codes that mean the caller lacks permission
const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "UnauthorizedException",
];

/// Error codes that mean the request was never authenticated
const AUTH_FAILURE_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "InvalidSignatureException",
    "ExpiredToken",
    "ExpiredTokenException",
];

/// Error codes that mean the caller is being throttled
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "LimitExceededException",
    "ServiceAccountException",
];

/// Error codes that mean the service is not offered where we asked
const UNSUPPORTED_CODES: &[&str] = &[
    "InvalidAction",
    "UnknownOperationException",
    "UnsupportedOperation",
    "NotSupportedException",
];

/// Message fragments that mean the endpoint doesn't exist for this region
const UNREACHABLE_FRAGMENTS: &[&str] = &[
    "not supported in this region",
    "is not available in this region",
    "no such host",
    "dns error",
    "failed to lookup address",
];

/// Full error chain rendered on one line, truncated for logs
pub fn error_chain<E: Error>(err: &E) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    truncate(&message)
}

fn truncate(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    if cleaned.chars().count() > MAX_MESSAGE_LENGTH {
        let cut: String = cleaned.chars().take(MAX_MESSAGE_LENGTH).collect();
        format!("{}... [truncated]", cut)
    } else {
        cleaned
    }
}

/// Whether a failure means the sweep should be skipped for this region
///
/// Regions without Device Farm, accounts without access and unreachable
/// endpoints are all reasons to move on, not to fail a sweep.
pub fn skip_sweep_error(code: Option<&str>, message: &str) -> bool {
    if let Some(code) = code {
        if ACCESS_DENIED_CODES.contains(&code)
            || AUTH_FAILURE_CODES.contains(&code)
            || UNSUPPORTED_CODES.contains(&code)
        {
            return true;
        }
    }

    let message = message.to_lowercase();
    UNREACHABLE_FRAGMENTS
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Whether a failure is the service asking us to slow down
pub fn is_throttling(code: Option<&str>) -> bool {
    code.is_some_and(|c| THROTTLING_CODES.contains(&c))
}

/// Format a Device Farm error for display
/// Maps well-known codes to short guidance instead of echoing raw API text
pub fn format_aws_error(code: Option<&str>, message: &str) -> String {
    if let Some(code) = code {
        if ACCESS_DENIED_CODES.contains(&code) {
            return "Permission denied. Check your IAM permissions for Device Farm.".to_string();
        }
        if AUTH_FAILURE_CODES.contains(&code) {
            return "Authentication failed. Check your AWS credentials or run 'aws sso login'."
                .to_string();
        }
        if code == crate::finder::NOT_FOUND_EXCEPTION {
            return "Resource not found.".to_string();
        }
        if THROTTLING_CODES.contains(&code) {
            return "Rate limit exceeded. Please try again later.".to_string();
        }
        if code == "ArgumentException" || code == "ValidationException" {
            return "Invalid request. Check the ARN and parameters.".to_string();
        }
        if code == "IdempotencyException" {
            return "Request conflict. The resource may be in use.".to_string();
        }
        if code == "InternalFailure" || code == "ServiceUnavailable" {
            return "Device Farm temporarily unavailable. Please try again.".to_string();
        }
    }

    let lower = message.to_lowercase();
    if UNREACHABLE_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        return "Device Farm endpoint unreachable. Check the region and your network.".to_string();
    }

    let printable: String = message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();

    if printable.chars().count() > 80 {
        let cut: String = printable.chars().take(80).collect();
        format!("{}...", cut)
    } else {
        printable
    }
}
