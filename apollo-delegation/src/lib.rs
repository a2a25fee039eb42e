//! Delegation of GraphQL field resolution to operations against other schemas.
//!
//! A gateway resolving a field of its composite schema calls [`delegate()`] with
//! the target [`Subschema`] and the caller's [`ResolveInfo`]. The field is
//! turned into a standalone operation on the target, executed through the
//! target's [`Executor`], and its result is brought back as a [`Resolved`]
//! value whose partial errors are attributed to the right nodes.

pub mod configuration;
mod context;
pub mod delegate;
pub mod error;
pub mod executor;
pub mod graphql;
pub mod json_ext;
pub mod reconcile;
pub mod request;
pub mod transform;

pub use crate::configuration::DelegationConfig;
pub use crate::configuration::UpstreamErrorPolicy;
pub use crate::context::Context;
pub use crate::delegate::Delegated;
pub use crate::delegate::DelegationOptions;
pub use crate::delegate::ResolveInfo;
pub use crate::delegate::Subschema;
pub use crate::delegate::create_document;
pub use crate::delegate::delegate;
pub use crate::error::DelegationError;
pub use crate::executor::ExecutionRequest;
pub use crate::executor::Executor;
pub use crate::executor::MockExecutor;
pub use crate::reconcile::Resolved;
pub use crate::request::FieldPath;
pub use crate::request::OperationKind;
pub use crate::request::Request;
pub use crate::transform::Pipeline;
pub use crate::transform::ResultValue;
pub use crate::transform::Transform;
