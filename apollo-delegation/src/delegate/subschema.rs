use std::fmt;
use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;

use crate::configuration::DelegationConfig;
use crate::executor::Executor;
use crate::transform::Transform;
use crate::transform::TransformFactory;

/// A schema operations can be delegated to, and how to execute them.
#[derive(Clone)]
pub struct Subschema {
    schema: Arc<Valid<Schema>>,
    executor: Arc<dyn Executor>,
    config: DelegationConfig,
    schema_filter: Option<Arc<dyn TransformFactory>>,
    typename_injector: Option<Arc<dyn TransformFactory>>,
}

#[buildstructor::buildstructor]
impl Subschema {
    /// Returns a builder for a delegation target.
    ///
    /// `schema_filter` removes selections the target does not support and
    /// `typename_injector` adds `__typename` to selections on abstract types.
    /// Both are created once per delegation; when absent they change nothing.
    #[builder(visibility = "pub")]
    fn new(
        schema: Arc<Valid<Schema>>,
        executor: Arc<dyn Executor>,
        config: Option<DelegationConfig>,
        schema_filter: Option<Arc<dyn TransformFactory>>,
        typename_injector: Option<Arc<dyn TransformFactory>>,
    ) -> Self {
        Self {
            schema,
            executor,
            config: config.unwrap_or_default(),
            schema_filter,
            typename_injector,
        }
    }

    pub fn schema(&self) -> &Arc<Valid<Schema>> {
        &self.schema
    }

    pub fn config(&self) -> &DelegationConfig {
        &self.config
    }

    pub(crate) fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub(crate) fn schema_filter(&self) -> Transform {
        self.schema_filter
            .as_ref()
            .map(|factory| factory.create(&self.schema))
            .unwrap_or_default()
    }

    pub(crate) fn typename_injector(&self) -> Transform {
        self.typename_injector
            .as_ref()
            .map(|factory| factory.create(&self.schema))
            .unwrap_or_default()
    }
}

impl fmt::Debug for Subschema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subschema")
            .field("config", &self.config)
            .field("schema_filter", &self.schema_filter.is_some())
            .field("typename_injector", &self.typename_injector.is_some())
            .finish_non_exhaustive()
    }
}
