//! Store error types.
//!
//! Every store reports failures as a [`DynamoDBError`] whose code is one of
//! the DynamoDB exception names the schema layer distinguishes. Codes coming
//! back from a remote endpoint are resolved with
//! [`DynamoDBErrorCode::from_wire`].

use std::fmt;

/// Well-known store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table already exists.
    ResourceInUseException,
    /// Table not found.
    ResourceNotFoundException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Validation error.
    #[default]
    ValidationException,
    /// Internal server error, or a service error code not listed here.
    InternalServerError,
    /// The request never produced a service response.
    TransportError,
}

impl DynamoDBErrorCode {
    /// Codes a remote endpoint may report.
    const WIRE_CODES: [Self; 5] = [
        Self::ResourceInUseException,
        Self::ResourceNotFoundException,
        Self::ProvisionedThroughputExceededException,
        Self::ValidationException,
        Self::InternalServerError,
    ];

    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::ValidationException => "ValidationException",
            Self::InternalServerError => "InternalServerError",
            Self::TransportError => "TransportError",
        }
    }

    /// Resolve a service error code (qualified or short) into a code.
    ///
    /// Unknown codes map to `InternalServerError`.
    #[must_use]
    pub fn from_wire(type_name: &str) -> Self {
        let short = type_name.rsplit('#').next().unwrap_or(type_name);
        Self::WIRE_CODES
            .into_iter()
            .find(|code| code.as_str() == short)
            .unwrap_or(Self::InternalServerError)
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InternalServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::TransportError => http::StatusCode::BAD_GATEWAY,
            _ => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store error.
#[derive(Debug)]
pub struct DynamoDBError {
    /// The error code.
    pub code: DynamoDBErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DynamoDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamoDBError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for DynamoDBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl DynamoDBError {
    /// Create a new `DynamoDBError` with a custom message.
    #[must_use]
    pub fn with_message(code: DynamoDBErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Override the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status_code: http::StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    // -- Convenience constructors --

    /// Table already exists.
    #[must_use]
    pub fn resource_in_use(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceInUseException, message)
    }

    /// Table or resource not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceNotFoundException, message)
    }

    /// Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ValidationException, message)
    }

    /// The endpoint could not be reached or the response could not be read.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::TransportError, message)
    }

    /// Returns `true` if this error reports a missing table.
    #[must_use]
    pub fn is_resource_not_found(&self) -> bool {
        self.code == DynamoDBErrorCode::ResourceNotFoundException
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_decode_qualified_wire_type() {
        let code = DynamoDBErrorCode::from_wire(
            "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
        );
        assert_eq!(code, DynamoDBErrorCode::ResourceNotFoundException);
    }

    #[test]
    fn test_should_decode_validation_type_from_coral_namespace() {
        let code = DynamoDBErrorCode::from_wire("com.amazon.coral.validate#ValidationException");
        assert_eq!(code, DynamoDBErrorCode::ValidationException);
    }

    #[test]
    fn test_should_map_unknown_wire_type_to_internal_error() {
        assert_eq!(
            DynamoDBErrorCode::from_wire("SomethingElse"),
            DynamoDBErrorCode::InternalServerError
        );
    }

    #[test]
    fn test_should_decode_short_wire_code() {
        assert_eq!(
            DynamoDBErrorCode::from_wire("ResourceInUseException"),
            DynamoDBErrorCode::ResourceInUseException
        );
    }

    #[test]
    fn test_should_never_decode_transport_error_from_the_wire() {
        assert_eq!(
            DynamoDBErrorCode::from_wire("TransportError"),
            DynamoDBErrorCode::InternalServerError
        );
    }

    #[test]
    fn test_should_fold_unlisted_service_codes_into_internal_error() {
        for code in ["ConditionalCheckFailedException", "AccessDeniedException"] {
            let err = DynamoDBError::with_message(DynamoDBErrorCode::from_wire(code), "denied");
            assert_eq!(err.code, DynamoDBErrorCode::InternalServerError);
            assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_should_build_transport_error_with_gateway_status() {
        let err = DynamoDBError::transport("connection refused");
        assert_eq!(err.code, DynamoDBErrorCode::TransportError);
        assert_eq!(err.status_code, http::StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "DynamoDBError(TransportError): connection refused");
    }
}
