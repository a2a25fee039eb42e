use std::collections::HashSet;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::validation::Valid;
use tracing::debug;

use super::RequestTransform;
use crate::error::DelegationError;
use crate::error::HoistError;
use crate::json_ext::Object;
use crate::request::Request;

/// Moves resolver arguments of the root fields into variables of the operation.
///
/// For every root field of every operation, each argument declared by the
/// target schema and present in `args` is replaced by a reference to a new
/// variable, typed as declared, and bound to the supplied value. Arguments of
/// nested fields are left alone.
#[derive(Clone, Debug)]
pub struct AddArgumentsAsVariables {
    schema: Arc<Valid<Schema>>,
    args: Object,
}

impl AddArgumentsAsVariables {
    pub fn new(schema: Arc<Valid<Schema>>, args: Object) -> Self {
        Self { schema, args }
    }

    fn hoist_operation(
        &self,
        operation: &mut Node<ast::OperationDefinition>,
        variables: &mut Object,
    ) -> Result<(), HoistError> {
        let root = self
            .schema
            .root_operation(operation.operation_type)
            .and_then(|name| self.schema.get_object(name))
            .ok_or(HoistError::MissingRootType {
                operation: operation.operation_type.into(),
            })?;

        // every root field must exist before anything is rewritten
        let mut targets: Vec<(usize, Component<FieldDefinition>)> = Vec::new();
        for (index, selection) in operation.selection_set.iter().enumerate() {
            let ast::Selection::Field(field) = selection else {
                continue;
            };
            if field.name.starts_with("__") {
                continue;
            }
            let definition =
                root.fields
                    .get(&field.name)
                    .ok_or_else(|| HoistError::FieldNotFound {
                        field: field.name.to_string(),
                        type_name: root.name.to_string(),
                    })?;
            targets.push((index, definition.clone()));
        }

        let mut taken: HashSet<String> = operation
            .variables
            .iter()
            .map(|variable| variable.name.to_string())
            .chain(variables.keys().map(|key| key.as_str().to_string()))
            .collect();
        let mut counter = 0;

        let operation = operation.make_mut();
        for (index, definition) in targets {
            let Some(ast::Selection::Field(field)) = operation.selection_set.get_mut(index) else {
                continue;
            };
            let field = field.make_mut();
            for argument in &definition.arguments {
                let Some(value) = self.args.get(argument.name.as_str()) else {
                    continue;
                };
                let variable = fresh_variable_name(&argument.name, &mut counter, &taken)?;
                taken.insert(variable.to_string());
                debug!(
                    field = %field.name,
                    argument = %argument.name,
                    variable = %variable,
                    "hoisting argument"
                );

                let reference = Node::new(ast::Value::Variable(variable.clone()));
                // merged caller fields may repeat the argument: keep the first, in place
                let mut replaced = false;
                field.arguments.retain_mut(|existing| {
                    if existing.name != argument.name {
                        return true;
                    }
                    if replaced {
                        return false;
                    }
                    existing.make_mut().value = reference.clone();
                    replaced = true;
                    true
                });
                if !replaced {
                    field.arguments.push(Node::new(ast::Argument {
                        name: argument.name.clone(),
                        value: reference,
                    }));
                }
                operation
                    .variables
                    .push(Node::new(ast::VariableDefinition {
                        name: variable.clone(),
                        ty: argument.ty.clone(),
                        default_value: None,
                        directives: ast::DirectiveList::default(),
                    }));
                variables.insert(variable.as_str(), value.clone());
            }
        }
        Ok(())
    }
}

impl RequestTransform for AddArgumentsAsVariables {
    fn transform_request(&self, request: Request) -> Result<Request, DelegationError> {
        let Request {
            mut document,
            mut variables,
        } = request;
        for definition in document.definitions.iter_mut() {
            if let ast::Definition::OperationDefinition(operation) = definition {
                self.hoist_operation(operation, &mut variables)?;
            }
        }
        Ok(Request::new(document, variables))
    }
}

fn fresh_variable_name(
    argument: &str,
    counter: &mut usize,
    taken: &HashSet<String>,
) -> Result<Name, HoistError> {
    loop {
        let candidate = format!("_v{counter}_{argument}");
        *counter += 1;
        if !taken.contains(&candidate) {
            return Name::new(&candidate)
                .map_err(|_| HoistError::InvalidVariableName { name: candidate });
        }
    }
}
