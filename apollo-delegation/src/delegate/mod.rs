//! Delegation of a field to an operation against another schema.
//!
//! The outgoing document is built from the caller's selections of the field,
//! run through the transform pipeline, validated, and executed against the
//! target schema. The response comes back through the pipeline in reverse
//! order; its last step extracts the delegated field's value and attributes
//! the errors of the target to the nodes of that value.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Node;
use apollo_compiler::ast;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use tracing::Span;
use tracing::debug;

use crate::context::Context;
use crate::error::ConfigurationError;
use crate::error::DelegationError;
use crate::error::ValidationErrors;
use crate::executor::ExecutionRequest;
use crate::graphql::ResponseStream;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::reconcile::Resolved;
use crate::request::FieldPath;
use crate::request::OperationKind;
use crate::request::Request;
use crate::transform::AddArgumentsAsVariables;
use crate::transform::CheckResultAndHandleErrors;
use crate::transform::Pipeline;
use crate::transform::ResultValue;
use crate::transform::Transform;

mod info;
mod subschema;

pub use info::ResolveInfo;
pub use subschema::Subschema;

/// What to delegate, and where.
#[derive(Debug)]
pub struct DelegationOptions {
    subschema: Subschema,
    operation: Option<OperationKind>,
    field_name: FieldPath,
    args: Object,
    transforms: Vec<Transform>,
    context: Option<Context>,
    skip_validation: Option<bool>,
    info: Arc<ResolveInfo>,
}

#[buildstructor::buildstructor]
impl DelegationOptions {
    /// Returns a builder for the options of a delegation.
    ///
    /// Required:
    /// - `subschema`: the target.
    /// - `field_name`: the field to delegate to on the target's root type,
    ///   or a path of nested wrapper fields, outermost first.
    /// - `info`: the caller's resolution context for the delegated field.
    ///
    /// Optional:
    /// - `operation`: defaults to the kind of the caller's operation.
    /// - `args`: values for the arguments of the target field, bound as variables.
    /// - `transforms`: run before the built-in transforms.
    /// - `context`: passed to the target executor.
    /// - `skip_validation`: overrides the target's configuration.
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        subschema: Subschema,
        operation: Option<OperationKind>,
        field_name: FieldPath,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        args: JsonMap<ByteString, Value>,
        transforms: Vec<Transform>,
        context: Option<Context>,
        skip_validation: Option<bool>,
        info: Arc<ResolveInfo>,
    ) -> Self {
        Self {
            subschema,
            operation,
            field_name,
            args,
            transforms,
            context,
            skip_validation,
            info,
        }
    }
}

/// The outcome of a delegation.
pub enum Delegated {
    /// The result of a query or a mutation, after every result transform.
    Value(ResultValue),

    /// The events of a subscription, as produced by the target executor.
    ///
    /// Result transforms are not applied to subscription events.
    Subscription(ResponseStream),
}

impl Delegated {
    /// The resolved value of a query or a mutation.
    pub fn into_resolved(self) -> Option<Resolved> {
        match self {
            Delegated::Value(ResultValue::Resolved(resolved)) => Some(resolved),
            Delegated::Value(ResultValue::Response(_)) | Delegated::Subscription(_) => None,
        }
    }

    /// The event stream of a subscription.
    pub fn into_stream(self) -> Option<ResponseStream> {
        match self {
            Delegated::Subscription(stream) => Some(stream),
            Delegated::Value(_) => None,
        }
    }
}

impl fmt::Debug for Delegated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegated::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Delegated::Subscription(_) => f.debug_tuple("Subscription").finish_non_exhaustive(),
        }
    }
}

/// Builds the operation delegating the caller's field to `field_path`.
///
/// The selections and arguments of every caller field node are merged under
/// the innermost field of the path; each outer field wraps the one below it.
/// The caller's operation name, variable definitions and fragments are kept.
pub fn create_document(
    info: &ResolveInfo,
    field_path: &FieldPath,
    operation: OperationKind,
) -> Result<ast::Document, ConfigurationError> {
    let mut names = field_path.to_names()?.into_iter().rev();
    let innermost = names.next().ok_or(ConfigurationError::EmptyFieldPath)?;

    let mut selections = Vec::new();
    let mut arguments = Vec::new();
    for field in &info.field_nodes {
        selections.extend(field.selection_set.iter().cloned());
        arguments.extend(field.arguments.iter().cloned());
    }

    // Caller arguments belong to the innermost field; wrappers take none.
    let mut selection_set = vec![field_selection(innermost, arguments, selections)];
    for name in names {
        selection_set = vec![field_selection(name, Vec::new(), selection_set)];
    }

    let mut document = ast::Document::new();
    document
        .definitions
        .push(ast::Definition::OperationDefinition(Node::new(
            ast::OperationDefinition {
                operation_type: operation.into(),
                name: info.operation.name.clone(),
                variables: info.operation.variables.clone(),
                directives: ast::DirectiveList::default(),
                selection_set,
            },
        )));
    document.definitions.extend(
        info.fragments
            .values()
            .cloned()
            .map(ast::Definition::FragmentDefinition),
    );
    Ok(document)
}

fn field_selection(
    name: apollo_compiler::Name,
    arguments: Vec<Node<ast::Argument>>,
    selection_set: Vec<ast::Selection>,
) -> ast::Selection {
    ast::Selection::Field(Node::new(ast::Field {
        alias: None,
        name,
        arguments,
        directives: ast::DirectiveList::default(),
        selection_set,
    }))
}

/// Delegates the resolution of a field to an operation against another schema.
///
/// Executes exactly one operation, or starts one subscription, on the target.
#[tracing::instrument(
    skip_all,
    level = "debug",
    name = "delegate",
    fields(field = %options.field_name, operation = tracing::field::Empty)
)]
pub async fn delegate(options: DelegationOptions) -> Result<Delegated, DelegationError> {
    let DelegationOptions {
        subschema,
        operation,
        field_name,
        args,
        transforms,
        context,
        skip_validation,
        info,
    } = options;
    let operation =
        operation.unwrap_or_else(|| OperationKind::from(info.operation.operation_type));
    Span::current().record("operation", operation.as_str());

    let document = create_document(&info, &field_name, operation)?;
    let request = Request::new(document, info.variable_values.clone());

    let caller_transforms = transforms.len();
    let schema = subschema.schema().clone();
    let pipeline = Pipeline::new(transforms.into_iter().chain([
        Transform::request(AddArgumentsAsVariables::new(schema.clone(), args)),
        subschema.schema_filter(),
        subschema.typename_injector(),
        Transform::result(CheckResultAndHandleErrors::new(
            info.clone(),
            field_name,
            subschema.config().upstream_errors,
        )),
    ]));
    debug!(caller_transforms, ?pipeline, "assembled transform pipeline");

    let request = pipeline.transform_request(request)?;

    if !skip_validation.unwrap_or(subschema.config().skip_validation) {
        request
            .document
            .to_executable_validate(&schema)
            .map_err(|errors| {
                let errors = ValidationErrors::from(errors);
                debug!(
                    errors = errors.errors.len(),
                    "delegated operation failed validation"
                );
                errors
            })?;
    }

    let operation_name = request
        .operations()
        .next()
        .and_then(|operation| operation.name.clone());
    let execution_request = ExecutionRequest {
        schema,
        document: request.document,
        operation_name,
        variables: request.variables,
        root_value: info.root_value.clone(),
        context: context.unwrap_or_default(),
    };

    match operation {
        OperationKind::Subscription => {
            debug!("starting subscription");
            let stream = subschema.executor().subscribe(execution_request).await;
            Ok(Delegated::Subscription(stream))
        }
        OperationKind::Query | OperationKind::Mutation => {
            debug!("executing delegated operation");
            let response = subschema.executor().execute(execution_request).await;
            let value = pipeline.transform_result(ResultValue::Response(response))?;
            Ok(Delegated::Value(value))
        }
    }
}
