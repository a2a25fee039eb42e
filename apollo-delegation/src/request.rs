use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use apollo_compiler::Name;
use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigurationError;
use crate::json_ext::Object;
use crate::json_ext::PathElement;

/// GraphQL operation type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_type_name())
    }
}

impl OperationKind {
    pub(crate) const fn default_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl FromStr for OperationKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(OperationKind::Query),
            "mutation" => Ok(OperationKind::Mutation),
            "subscription" => Ok(OperationKind::Subscription),
            _ => Err(ConfigurationError::UnsupportedOperation {
                operation: s.to_owned(),
            }),
        }
    }
}

impl From<OperationKind> for ast::OperationType {
    fn from(value: OperationKind) -> Self {
        match value {
            OperationKind::Query => ast::OperationType::Query,
            OperationKind::Mutation => ast::OperationType::Mutation,
            OperationKind::Subscription => ast::OperationType::Subscription,
        }
    }
}

impl From<ast::OperationType> for OperationKind {
    fn from(value: ast::OperationType) -> Self {
        match value {
            ast::OperationType::Query => OperationKind::Query,
            ast::OperationType::Mutation => OperationKind::Mutation,
            ast::OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

/// An outgoing request to a target schema: a document and the values of its variables.
///
/// Every transform stage takes a request by value and returns a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub document: ast::Document,
    pub variables: Object,
}

impl Request {
    pub fn new(document: ast::Document, variables: Object) -> Self {
        Self {
            document,
            variables,
        }
    }

    /// The operation definitions of the document, in order.
    pub fn operations(&self) -> impl Iterator<Item = &apollo_compiler::Node<ast::OperationDefinition>> {
        self.document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::OperationDefinition(operation) => Some(operation),
                _ => None,
            })
    }
}

/// The field a delegation targets on the root type of the target schema.
///
/// A path of several names denotes nested wrapper fields, outermost first:
/// `["viewer", "account"]` delegates to `{ viewer { account { ... } } }`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Response keys, outermost first.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.0.iter().map(String::as_str)
    }

    /// The innermost field, whose value is the result of the delegation.
    pub fn innermost(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The wrapper fields above the innermost one, as response path elements.
    pub(crate) fn wrapper_prefix(&self) -> Vec<PathElement> {
        let wrappers = self.0.len().saturating_sub(1);
        self.0[..wrappers]
            .iter()
            .map(|key| PathElement::Key(key.clone()))
            .collect()
    }

    /// Validate the path as a non-empty list of GraphQL names.
    pub(crate) fn to_names(&self) -> Result<Vec<Name>, ConfigurationError> {
        if self.0.is_empty() {
            return Err(ConfigurationError::EmptyFieldPath);
        }
        self.0
            .iter()
            .map(|name| {
                Name::new(name).map_err(|_| ConfigurationError::InvalidFieldName {
                    name: name.clone(),
                })
            })
            .collect()
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(name: &str) -> Self {
        Self(vec![name.to_owned()])
    }
}

impl From<String> for FieldPath {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for FieldPath {
    fn from(names: Vec<&str>) -> Self {
        Self::new(names)
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(names: [&str; N]) -> Self {
        Self::new(names)
    }
}
