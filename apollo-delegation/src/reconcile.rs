//! Attribution of the partial errors of a delegated operation to the nodes of its result.
//!
//! Errors returned by the target schema are addressed by paths relative to its
//! `data`. Once the delegated field's value is extracted, those paths are
//! walked one level at a time: list indexes are followed right away, and the
//! remaining errors are parked in an [`ErrorAnnex`] next to the object they
//! belong to, until the caller resolves the fields of that object.

use std::collections::HashMap;

use tracing::debug;

use crate::configuration::UpstreamErrorPolicy;
use crate::delegate::ResolveInfo;
use crate::error::ErrorCause;
use crate::error::LocatedError;
use crate::graphql;
use crate::graphql::Response;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::request::FieldPath;

/// Errors not yet attributed to a field, keyed by the node they were parked on.
///
/// A node is identified by its [`Path`] from the root of the delegated value.
/// Error paths stored here are relative to that node: their first element is
/// the response key of a field of the node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorAnnex {
    entries: HashMap<Path, Vec<graphql::Error>>,
}

impl ErrorAnnex {
    /// Errors parked on the node at `handle`.
    pub fn get(&self, handle: &Path) -> &[graphql::Error] {
        self.entries.get(handle).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Vec<graphql::Error>)> {
        self.entries.iter()
    }

    fn attach(&mut self, handle: Path, errors: Vec<graphql::Error>) {
        if !errors.is_empty() {
            self.entries.insert(handle, errors);
        }
    }
}

/// A delegated value and the errors parked on its nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolved {
    pub value: Value,
    pub annex: ErrorAnnex,
}

impl Resolved {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            annex: ErrorAnnex::default(),
        }
    }

    /// Resolves the field `info` of the node at `parent`.
    ///
    /// An error addressed to the field itself fails the field. Errors addressed
    /// below it are parked on the field's value, which is returned.
    pub fn resolve_field(
        &mut self,
        parent: &Path,
        info: &ResolveInfo,
    ) -> Result<Value, LocatedError> {
        let key = info.response_key();
        match classify(&self.annex, parent, key) {
            Classification::Own(error) => {
                debug!(field = %key, parent = %parent, "field failed in the target schema");
                Err(LocatedError {
                    message: error.message.clone(),
                    locations: info.locations(),
                    path: info.path.clone(),
                    cause: ErrorCause::Upstream(error),
                })
            }
            Classification::Children(errors) => {
                let handle = parent.join(key);
                let value = self
                    .value
                    .get_path(&handle)
                    .cloned()
                    .unwrap_or(Value::Null);
                distribute(&value, errors, &handle, &mut self.annex);
                Ok(value)
            }
        }
    }
}

/// How the errors parked on a node relate to one of its fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// An error addressed to the field itself.
    Own(graphql::Error),

    /// Errors addressed below the field, with paths relative to its value.
    Children(Vec<graphql::Error>),
}

/// Attributes `errors`, whose paths start with the field owning `value`, to the nodes of `value`.
///
/// Annotating with no errors returns `value` unchanged and an empty annex.
pub fn annotate(value: Value, errors: Vec<graphql::Error>) -> Resolved {
    let mut annex = ErrorAnnex::default();
    let relative = errors
        .into_iter()
        .map(|error| {
            let path = error.path.as_ref().map(Path::strip_first);
            error.with_path(path)
        })
        .collect();
    distribute(&value, relative, &Path::empty(), &mut annex);
    Resolved { value, annex }
}

/// Splits the errors parked on the node at `handle` for the field `response_key`.
///
/// The first error with no path, or addressed exactly to the field, wins.
/// Errors about other fields are ignored.
pub fn classify(annex: &ErrorAnnex, handle: &Path, response_key: &str) -> Classification {
    let mut children = Vec::new();
    for error in annex.get(handle) {
        match &error.path {
            None => return Classification::Own(error.clone()),
            Some(path) if path.is_single_key(response_key) => {
                return Classification::Own(error.clone());
            }
            Some(path) if path.starts_with_key(response_key) => {
                children.push(error.with_path(Some(path.strip_first())));
            }
            Some(_) => {}
        }
    }
    Classification::Children(children)
}

/// Extracts the value of the delegated field from `response`.
///
/// Without a usable value, the errors of the response fail the caller's
/// field. Otherwise they are attributed to the nodes of the value.
pub fn check_result_and_handle_errors(
    response: Response,
    info: &ResolveInfo,
    field_path: Option<&FieldPath>,
    policy: UpstreamErrorPolicy,
) -> Result<Resolved, LocatedError> {
    let default_path;
    let field_path = match field_path {
        Some(field_path) if !field_path.is_empty() => field_path,
        _ => {
            default_path = FieldPath::from(info.response_key());
            &default_path
        }
    };

    let Response { data, errors, .. } = response;
    let candidate = data
        .as_ref()
        .and_then(|data| data.get_keys(field_path.keys()))
        .filter(|value| !value.is_null())
        .cloned();

    match candidate {
        None if !errors.is_empty() => {
            debug!(field = %field_path, errors = errors.len(), "no usable value, raising");
            Err(located_error(errors, info, policy))
        }
        Some(value) if !errors.is_empty() => {
            debug!(field = %field_path, errors = errors.len(), "annotating partial value");
            let prefix = field_path.wrapper_prefix();
            let errors = errors
                .into_iter()
                .map(|error| rebase(error, &prefix))
                .collect();
            Ok(annotate(value, errors))
        }
        Some(value) => Ok(Resolved::new(value)),
        None => Ok(Resolved::new(Value::Null)),
    }
}

/// Recursively parks `errors`, relative to the node at `handle`, on the objects below it.
fn distribute(
    value: &Value,
    errors: Vec<graphql::Error>,
    handle: &Path,
    annex: &mut ErrorAnnex,
) {
    if errors.is_empty() {
        return;
    }
    match value {
        Value::Array(items) => {
            let mut by_index: HashMap<usize, Vec<graphql::Error>> = HashMap::new();
            for error in errors {
                let Some(index) = error
                    .path
                    .as_ref()
                    .and_then(Path::first)
                    .and_then(PathElement::as_index)
                else {
                    continue;
                };
                let rest = error.path.as_ref().map(Path::strip_first);
                by_index
                    .entry(index)
                    .or_default()
                    .push(error.with_path(rest));
            }
            for (index, item) in items.iter().enumerate() {
                let item_errors = by_index.remove(&index).unwrap_or_default();
                distribute(item, item_errors, &handle.join(index), annex);
            }
        }
        _ => annex.attach(handle.clone(), errors),
    }
}

// Error paths start at the outermost wrapper field; the delegated value sits
// under the innermost one.
fn rebase(error: graphql::Error, prefix: &[PathElement]) -> graphql::Error {
    match error.path.as_ref().and_then(|path| path.strip_prefix(prefix)) {
        Some(rest) => error.with_path(Some(rest)),
        None => error,
    }
}

fn located_error(
    errors: Vec<graphql::Error>,
    info: &ResolveInfo,
    policy: UpstreamErrorPolicy,
) -> LocatedError {
    let passthrough = policy == UpstreamErrorPolicy::Passthrough
        && matches!(errors.as_slice(), [error] if has_upstream_result(error));
    let cause = if passthrough {
        ErrorCause::Upstream(errors.into_iter().next().unwrap_or_default())
    } else {
        ErrorCause::Combined(errors)
    };
    let message = match &cause {
        ErrorCause::Upstream(error) => error.message.clone(),
        ErrorCause::Combined(errors) => errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    };
    LocatedError {
        message,
        locations: info.locations(),
        path: info.path.clone(),
        cause,
    }
}

fn has_upstream_result(error: &graphql::Error) -> bool {
    let present = |value: Option<&Value>| value.is_some_and(|value| !value.is_null());
    present(error.extensions.get("result"))
        || present(
            error
                .extensions
                .get("originalError")
                .and_then(Value::as_object)
                .and_then(|original| original.get("result")),
        )
}
