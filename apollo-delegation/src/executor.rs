//! The seam between the delegator and whatever executes operations against a target schema.

use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;

use crate::context::Context;
use crate::graphql;
use crate::graphql::Response;
use crate::graphql::ResponseStream;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// An operation ready to be executed against a target schema.
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    pub schema: Arc<Valid<Schema>>,
    pub document: ast::Document,
    pub operation_name: Option<Name>,
    pub variables: Object,
    pub root_value: Value,
    pub context: Context,
}

/// Executes delegated operations.
///
/// Implementations may run the operation in process or send it over the
/// network. Execution errors are reported in [`Response::errors`], never as
/// a failed call.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Execute a query or a mutation.
    async fn execute(&self, request: ExecutionRequest) -> Response;

    /// Start a subscription and return its events.
    async fn subscribe(&self, _request: ExecutionRequest) -> ResponseStream {
        let response = Response::builder()
            .error(
                graphql::Error::builder()
                    .message("subscriptions are not supported by this executor")
                    .extension_code("SUBSCRIPTION_NOT_SUPPORTED")
                    .build(),
            )
            .build();
        stream::once(async move { response }).boxed()
    }
}

/// An [`Executor`] returning canned responses and recording what it was sent.
#[derive(Clone, Default)]
pub struct MockExecutor {
    // using an arc so that clones observe the same requests
    response: Arc<Response>,
    events: Option<Arc<Vec<Response>>>,
    requests: Arc<Mutex<Vec<ExecutionRequest>>>,
}

impl MockExecutor {
    pub fn new(response: Response) -> Self {
        Self {
            response: Arc::new(response),
            ..Default::default()
        }
    }

    /// Serve subscriptions with these events.
    pub fn with_events(mut self, events: Vec<Response>) -> Self {
        self.events = Some(Arc::new(events));
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, request: ExecutionRequest) -> Response {
        self.requests.lock().push(request);
        (*self.response).clone()
    }

    async fn subscribe(&self, request: ExecutionRequest) -> ResponseStream {
        self.requests.lock().push(request);
        match &self.events {
            Some(events) => stream::iter((**events).clone()).boxed(),
            None => stream::empty().boxed(),
        }
    }
}
