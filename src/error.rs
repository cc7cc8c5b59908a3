//! Error types shared by every layer of the client
//!
//! Callers are expected to branch on [`RegistryError`] variants (or the
//! `is_*` predicates) instead of inspecting raw status codes.

use std::fmt;

use thiserror::Error;

/// Boxed error used for network-level failures of a single attempt
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A malformed or missing input field. Never touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error for field '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub value: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

/// All violations found while validating a composite input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiError {
    errors: Vec<ValidationError>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Collapse into a result: no violations is `Ok`, exactly one surfaces as
    /// a plain validation error, more than one stays aggregated.
    pub fn into_result(mut self) -> Result<(), RegistryError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(RegistryError::Validation(self.errors.remove(0))),
            _ => Err(RegistryError::Multi(self)),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return write!(f, "{}", only);
        }
        write!(
            f,
            "multiple validation errors occurred ({} errors)",
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Multi(#[from] MultiError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<RegistryError>,
    },

    #[error("network error: {0}")]
    Network(#[source] BoxError),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(error: reqwest::Error) -> Self {
        RegistryError::Network(Box::new(error))
    }
}

impl RegistryError {
    /// Map a non-success HTTP status to its typed error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => RegistryError::Unauthorized(message),
            403 => RegistryError::Forbidden(message),
            404 => RegistryError::NotFound(message),
            429 => RegistryError::RateLimited(message),
            500.. => RegistryError::Server { status, message },
            _ => RegistryError::Api { status, message },
        }
    }

    /// The innermost classified error, looking through exhausted retries
    pub fn root(&self) -> &RegistryError {
        match self {
            RegistryError::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), RegistryError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), RegistryError::Unauthorized(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self.root(), RegistryError::Forbidden(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.root(), RegistryError::RateLimited(_))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.root(), RegistryError::Server { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self.root(), RegistryError::Network(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            RegistryError::Validation(_) | RegistryError::Multi(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RegistryError::Cancelled)
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, RegistryError::RetriesExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn multi_error_without_violations_is_ok() {
        assert!(MultiError::new().into_result().is_ok());
    }

    #[test]
    fn multi_error_with_one_violation_collapses_to_it() {
        let mut errors = MultiError::new();
        errors.add(ValidationError::new("namespace", "", "namespace cannot be empty"));

        let err = errors.into_result().unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Validation(ValidationError { ref field, .. }) if field == "namespace"
        ));
    }

    #[test]
    fn multi_error_with_several_violations_stays_aggregated() {
        let mut errors = MultiError::new();
        errors.add(ValidationError::new("namespace", "", "namespace cannot be empty"));
        errors.add(ValidationError::new("name", "", "name cannot be empty"));

        let err = errors.into_result().unwrap_err();

        let RegistryError::Multi(multi) = &err else {
            panic!("expected aggregated error, got {err:?}");
        };
        assert_eq!(multi.len(), 2);
        assert!(err.to_string().starts_with("multiple validation errors occurred (2 errors)"));
        assert!(err.is_validation());
    }

    #[rstest]
    #[case(401, "unauthorized")]
    #[case(403, "forbidden")]
    #[case(404, "not_found")]
    #[case(429, "rate_limited")]
    #[case(500, "server")]
    #[case(503, "server")]
    #[case(400, "api")]
    #[case(422, "api")]
    fn from_status_maps_to_taxonomy(#[case] status: u16, #[case] expected: &str) {
        let err = RegistryError::from_status(status, "boom");
        let kind = match err {
            RegistryError::Unauthorized(_) => "unauthorized",
            RegistryError::Forbidden(_) => "forbidden",
            RegistryError::NotFound(_) => "not_found",
            RegistryError::RateLimited(_) => "rate_limited",
            RegistryError::Server { .. } => "server",
            RegistryError::Api { .. } => "api",
            _ => "other",
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn predicates_look_through_exhausted_retries() {
        let err = RegistryError::RetriesExhausted {
            attempts: 3,
            source: Box::new(RegistryError::from_status(502, "bad gateway")),
        };

        assert!(err.is_retries_exhausted());
        assert!(err.is_server_error());
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "giving up after 3 attempts: server error (status 502): bad gateway"
        );
    }
}
