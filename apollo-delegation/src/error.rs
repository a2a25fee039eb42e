//! Delegation errors.

use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use serde_json_bytes::Value;
use thiserror::Error;
use tower::BoxError;

use crate::graphql;
use crate::graphql::Location;
use crate::json_ext::Path;
use crate::request::OperationKind;

/// Error types for delegation.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum DelegationError {
    /// invalid delegation: {0}
    Configuration(#[from] ConfigurationError),

    /// {0}
    Hoist(#[from] HoistError),

    /// the delegated operation is invalid against the target schema: {0}
    Validation(#[from] ValidationErrors),

    /// {0}
    Execution(#[from] LocatedError),

    /// transform failed: {0}
    Transform(BoxError),
}

impl DelegationError {
    /// Converts this failure into the GraphQL errors a gateway should report.
    pub fn to_graphql_errors(&self) -> Vec<graphql::Error> {
        match self {
            DelegationError::Validation(errors) => errors.errors.clone(),
            DelegationError::Execution(error) => vec![error.to_graphql_error()],
            DelegationError::Configuration(_)
            | DelegationError::Hoist(_)
            | DelegationError::Transform(_) => vec![
                graphql::Error::builder()
                    .message(self.to_string())
                    .extension_code("DELEGATION_FAILED")
                    .build(),
            ],
        }
    }
}

/// Invalid shape of a delegation call.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// the target field path is empty
    EmptyFieldPath,

    /// '{name}' is not a valid field name
    InvalidFieldName {
        /// The rejected name.
        name: String,
    },

    /// invalid operation: {operation}
    UnsupportedOperation {
        /// The rejected operation kind.
        operation: String,
    },

    /// no operation named '{name}' in the caller document
    OperationNotFound {
        /// The requested operation name, `(anonymous)` if none was given.
        name: String,
    },

    /// no root field with response key '{response_key}' in the caller operation
    FieldNotSelected {
        /// The response key that was looked up.
        response_key: String,
    },
}

/// Failure while hoisting resolver arguments into variables.
#[derive(Error, Display, Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum HoistError {
    /// the target schema has no {operation} root type
    MissingRootType {
        /// The operation kind whose root type is missing.
        operation: OperationKind,
    },

    /// Cannot find field {field} in type: {type_name}.
    FieldNotFound {
        /// The selected root field.
        field: String,
        /// The root type it was looked up on.
        type_name: String,
    },

    /// generated variable name '{name}' is invalid
    InvalidVariableName {
        /// The generated name.
        name: String,
    },
}

/// Collection of validation errors for a delegated operation.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub struct ValidationErrors {
    /// Every violation found, in document order.
    pub errors: Vec<graphql::Error>,
}

impl From<DiagnosticList> for ValidationErrors {
    fn from(errors: DiagnosticList) -> Self {
        Self {
            errors: errors
                .iter()
                .map(|diagnostic| {
                    let mut error = graphql::Error::from(diagnostic.to_json());
                    error
                        .extensions
                        .entry("code")
                        .or_insert_with(|| Value::from("GRAPHQL_VALIDATION_FAILED"));
                    error
                })
                .collect(),
        }
    }
}

impl<T> From<WithErrors<T>> for ValidationErrors {
    fn from(WithErrors { errors, .. }: WithErrors<T>) -> Self {
        errors.into()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            if let Some(location) = error.locations.first() {
                write!(
                    f,
                    "[{}:{}] {}",
                    location.line, location.column, error.message
                )?;
            } else {
                write!(f, "{}", error.message)?;
            }
        }
        Ok(())
    }
}

/// What a [`LocatedError`] was raised from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ErrorCause {
    /// A single error of the target, kept as is.
    Upstream(graphql::Error),

    /// Every error of the target, summarized by one message.
    Combined(Vec<graphql::Error>),
}

/// An error of the target schema, attributed to a field of the caller.
///
/// Carries the source locations of the caller's field nodes and the caller's
/// response path, so that it can be reported where the caller selected the
/// field.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("{message}")]
pub struct LocatedError {
    /// The error message.
    pub message: String,

    /// Locations of the caller's field nodes.
    pub locations: Vec<Location>,

    /// Response path of the caller's field.
    pub path: Path,

    /// The original error(s).
    pub cause: ErrorCause,
}

impl LocatedError {
    /// The original errors of the target, in order.
    pub fn original_errors(&self) -> &[graphql::Error] {
        match &self.cause {
            ErrorCause::Upstream(error) => std::slice::from_ref(error),
            ErrorCause::Combined(errors) => errors,
        }
    }

    /// Convert to a GraphQL error at the caller's field.
    ///
    /// An upstream error keeps its extensions; a combined error carries its
    /// original errors under the `errors` extension.
    pub fn to_graphql_error(&self) -> graphql::Error {
        let builder = graphql::Error::builder()
            .message(self.message.clone())
            .locations(self.locations.clone())
            .path(self.path.clone());
        match &self.cause {
            ErrorCause::Upstream(error) => builder.extensions(error.extensions.clone()).build(),
            ErrorCause::Combined(errors) => builder
                .extension(
                    "errors",
                    serde_json_bytes::to_value(errors).unwrap_or_default(),
                )
                .extension_code("SUBSCHEMA_ERRORS")
                .build(),
        }
    }
}
