//! Request and result transforms, and the pipeline composing them.
//!
//! A [`Transform`] optionally rewrites the outgoing [`Request`] and optionally
//! rewrites the delegated result. A [`Pipeline`] runs the request stages in
//! registration order and the result stages in reverse order, so the transform
//! registered last sees the rawest result.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::validation::Valid;

use crate::error::DelegationError;
use crate::graphql::Response;
use crate::reconcile::Resolved;
use crate::request::Request;

pub(crate) mod check_result;
pub(crate) mod hoist;

pub use check_result::CheckResultAndHandleErrors;
pub use hoist::AddArgumentsAsVariables;

/// A delegated result on its way back through the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultValue {
    /// The response of the target executor, as returned.
    Response(Response),

    /// The value of the delegated field, with its errors attributed.
    Resolved(Resolved),
}

/// Rewrites the outgoing request.
pub trait RequestTransform: Send + Sync {
    fn transform_request(&self, request: Request) -> Result<Request, DelegationError>;
}

/// Rewrites the delegated result.
pub trait ResultTransform: Send + Sync {
    fn transform_result(&self, result: ResultValue) -> Result<ResultValue, DelegationError>;
}

impl<F> RequestTransform for F
where
    F: Fn(Request) -> Result<Request, DelegationError> + Send + Sync,
{
    fn transform_request(&self, request: Request) -> Result<Request, DelegationError> {
        self(request)
    }
}

impl<F> ResultTransform for F
where
    F: Fn(ResultValue) -> Result<ResultValue, DelegationError> + Send + Sync,
{
    fn transform_result(&self, result: ResultValue) -> Result<ResultValue, DelegationError> {
        self(result)
    }
}

/// A pair of optional stages. A missing stage is the identity.
#[derive(Clone, Default)]
pub struct Transform {
    request: Option<Arc<dyn RequestTransform>>,
    result: Option<Arc<dyn ResultTransform>>,
}

impl Transform {
    /// A transform that changes nothing.
    pub fn identity() -> Self {
        Self::default()
    }

    /// A transform that both rewrites requests and results.
    pub fn new<T>(transform: T) -> Self
    where
        T: RequestTransform + ResultTransform + 'static,
    {
        let transform = Arc::new(transform);
        let request: Arc<dyn RequestTransform> = transform.clone();
        let result: Arc<dyn ResultTransform> = transform;
        Self {
            request: Some(request),
            result: Some(result),
        }
    }

    /// A transform that only rewrites requests.
    pub fn request(transform: impl RequestTransform + 'static) -> Self {
        Self {
            request: Some(Arc::new(transform)),
            result: None,
        }
    }

    /// A transform that only rewrites results.
    pub fn result(transform: impl ResultTransform + 'static) -> Self {
        Self {
            request: None,
            result: Some(Arc::new(transform)),
        }
    }

    pub fn has_request_stage(&self) -> bool {
        self.request.is_some()
    }

    pub fn has_result_stage(&self) -> bool {
        self.result.is_some()
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("request", &self.request.is_some())
            .field("result", &self.result.is_some())
            .finish()
    }
}

/// Creates a transform for a target schema.
///
/// Used for the transforms a target builds per delegation, such as filtering
/// selections the target does not support.
pub trait TransformFactory: Send + Sync {
    fn create(&self, schema: &Arc<Valid<Schema>>) -> Transform;
}

impl<F> TransformFactory for F
where
    F: Fn(&Arc<Valid<Schema>>) -> Transform + Send + Sync,
{
    fn create(&self, schema: &Arc<Valid<Schema>>) -> Transform {
        self(schema)
    }
}

/// An ordered list of transforms, split into its request and result stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    request_stages: Vec<Arc<dyn RequestTransform>>,
    // already reversed
    result_stages: Vec<Arc<dyn ResultTransform>>,
}

impl Pipeline {
    pub fn new(transforms: impl IntoIterator<Item = Transform>) -> Self {
        let mut request_stages = Vec::new();
        let mut result_stages = Vec::new();
        for transform in transforms {
            request_stages.extend(transform.request);
            result_stages.extend(transform.result);
        }
        result_stages.reverse();
        Self {
            request_stages,
            result_stages,
        }
    }

    /// Runs every request stage, in registration order.
    pub fn transform_request(&self, request: Request) -> Result<Request, DelegationError> {
        self.request_stages
            .iter()
            .try_fold(request, |request, stage| stage.transform_request(request))
    }

    /// Runs every result stage, in reverse registration order.
    pub fn transform_result(&self, result: ResultValue) -> Result<ResultValue, DelegationError> {
        self.result_stages
            .iter()
            .try_fold(result, |result, stage| stage.transform_result(result))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_stages", &self.request_stages.len())
            .field("result_stages", &self.result_stages.len())
            .finish()
    }
}
