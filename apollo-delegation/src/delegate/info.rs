use std::collections::HashSet;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::parser::SourceMap;

use crate::error::ConfigurationError;
use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// The caller's resolution context for the field being delegated.
#[derive(Clone, Debug)]
pub struct ResolveInfo {
    /// Name of the field in the caller's schema.
    pub field_name: Name,

    /// Every selection of the field, after alias merging.
    pub field_nodes: Vec<Node<ast::Field>>,

    /// Fragment definitions of the caller document, by name.
    pub fragments: IndexMap<Name, Node<ast::FragmentDefinition>>,

    /// The caller operation.
    pub operation: Node<ast::OperationDefinition>,

    /// Coerced variable values of the caller operation.
    pub variable_values: Object,

    /// Root value of the caller execution, handed to the target executor.
    pub root_value: Value,

    /// Response path of the field in the caller's result.
    pub path: Path,

    /// Sources of the caller document, used to locate the field nodes.
    pub sources: SourceMap,
}

impl ResolveInfo {
    /// Builds the context of a root field of a parsed caller document.
    ///
    /// Collects every root selection with the given response key, looking
    /// through inline fragments and fragment spreads.
    pub fn for_root_field(
        document: &ast::Document,
        operation_name: Option<&str>,
        response_key: &str,
        variable_values: Object,
    ) -> Result<Self, ConfigurationError> {
        let operation = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::OperationDefinition(operation) => Some(operation),
                _ => None,
            })
            .find(|operation| match operation_name {
                Some(name) => operation.name.as_deref() == Some(name),
                None => true,
            })
            .ok_or_else(|| ConfigurationError::OperationNotFound {
                name: operation_name.unwrap_or("(anonymous)").to_string(),
            })?;

        let fragments: IndexMap<Name, Node<ast::FragmentDefinition>> = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => {
                    Some((fragment.name.clone(), fragment.clone()))
                }
                _ => None,
            })
            .collect();

        let mut field_nodes = Vec::new();
        collect_fields(
            &operation.selection_set,
            &fragments,
            response_key,
            &mut HashSet::new(),
            &mut field_nodes,
        );
        let field_name = field_nodes
            .first()
            .map(|field| field.name.clone())
            .ok_or_else(|| ConfigurationError::FieldNotSelected {
                response_key: response_key.to_string(),
            })?;

        Ok(Self {
            field_name,
            field_nodes,
            fragments,
            operation: operation.clone(),
            variable_values,
            root_value: Value::Null,
            path: Path::from(response_key),
            sources: document.sources.clone(),
        })
    }

    /// The response key of the field: the alias of its first selection, else its name.
    pub fn response_key(&self) -> &str {
        self.field_nodes
            .first()
            .and_then(|field| field.alias.as_ref())
            .unwrap_or(&self.field_name)
            .as_str()
    }

    /// Source locations of the field's selections in the caller document.
    pub fn locations(&self) -> Vec<Location> {
        self.field_nodes
            .iter()
            .filter_map(|field| field.line_column_range(&self.sources))
            .map(|range| Location {
                line: range.start.line as u32,
                column: range.start.column as u32,
            })
            .collect()
    }
}

fn collect_fields(
    selections: &[ast::Selection],
    fragments: &IndexMap<Name, Node<ast::FragmentDefinition>>,
    response_key: &str,
    visited: &mut HashSet<Name>,
    fields: &mut Vec<Node<ast::Field>>,
) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                if field.alias.as_ref().unwrap_or(&field.name).as_str() == response_key {
                    fields.push(field.clone());
                }
            }
            ast::Selection::InlineFragment(inline) => {
                collect_fields(
                    &inline.selection_set,
                    fragments,
                    response_key,
                    visited,
                    fields,
                );
            }
            ast::Selection::FragmentSpread(spread) => {
                if !visited.insert(spread.fragment_name.clone()) {
                    continue;
                }
                if let Some(fragment) = fragments.get(&spread.fragment_name) {
                    collect_fields(
                        &fragment.selection_set,
                        fragments,
                        response_key,
                        visited,
                        fields,
                    );
                }
            }
        }
    }
}
