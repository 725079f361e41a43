//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses or any other protocol-specific envelope. Every variant is a
//! request rejection: engines either complete with their stated postcondition
//! or fail with exactly one of these codes and no partial writes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails input validation.
    ValidationError,
    /// Caller already belongs to a team.
    AlreadyOnTeam,
    /// Caller has no team to leave.
    NotOnTeam,
    /// The operation requires the caller to have a team.
    NoTeam,
    /// The team needs a second member before this operation.
    IncompleteTeam,
    /// The team already has its maximum of two members.
    TeamFull,
    /// An identical pending invite already exists.
    DuplicateInvite,
    /// No invite matches the given team and user.
    InviteNotFound,
    /// No registered user matches the given identity.
    UserNotFound,
    /// A team member cannot invite themselves.
    SelfInvite,
    /// The lobby roster is at capacity.
    LobbyFull,
    /// The lobby's registration cutoff has passed.
    LobbyClosed,
    /// The identity provider denied the exchange.
    AuthError,
    /// The image host rejected or failed the upload.
    UploadError,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// A backing service could not be reached.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use tourney_backend::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::TeamFull, "team already has two players");
/// assert_eq!(err.code(), ErrorCode::TeamFull);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    #[schema(example = "team_full")]
    code: ErrorCode,
    #[schema(example = "team already has two players")]
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValidationError {
    /// The message was empty once trimmed.
    EmptyMessage,
}

impl std::fmt::Display for ErrorValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "error message must not be empty"),
        }
    }
}

impl std::error::Error for ErrorValidationError {}

impl Error {
    /// Create a new error, panicking if validation fails.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use tourney_backend::domain::{Error, ErrorCode};
    ///
    /// let err = Error::validation("bad title").with_details(json!({ "field": "title" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::ValidationError`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Convenience constructor for [`ErrorCode::AuthError`].
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthError, message)
    }

    /// Convenience constructor for [`ErrorCode::UploadError`].
    pub fn upload(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UploadError, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::UserNotFound`].
    pub fn user_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UserNotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::InviteNotFound`].
    pub fn invite_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InviteNotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Error::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::TeamFull, "team_full")]
    #[case(ErrorCode::DuplicateInvite, "duplicate_invite")]
    #[case(ErrorCode::LobbyClosed, "lobby_closed")]
    #[case(ErrorCode::AuthError, "auth_error")]
    fn error_codes_serialise_to_snake_case(#[case] code: ErrorCode, #[case] expected: &str) {
        let value = serde_json::to_value(code).expect("code serialises");
        assert_eq!(value, serde_json::Value::String(expected.to_owned()));
    }

    #[test]
    fn try_new_rejects_blank_messages() {
        let err = Error::try_new(ErrorCode::ValidationError, "   ")
            .expect_err("blank message must fail");
        assert_eq!(err, ErrorValidationError::EmptyMessage);
    }

    #[test]
    fn round_trips_through_serde() {
        let err = Error::validation("title too long")
            .with_details(serde_json::json!({ "field": "title" }));
        let json = serde_json::to_string(&err).expect("serialises");
        let back: Error = serde_json::from_str(&json).expect("deserialises");
        assert_eq!(back, err);
    }
}
