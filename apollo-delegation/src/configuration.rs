//! Per-target delegation configuration.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Configuration attached to a delegation target.
///
/// Example:
///
/// ```yaml
/// skip_validation: false
/// upstream_errors: combine
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct DelegationConfig {
    /// Do not validate delegated operations against the target schema before
    /// executing them. A per-call `skip_validation` option takes precedence.
    pub skip_validation: bool,

    /// How a failed delegated field reports the errors of the target.
    pub upstream_errors: UpstreamErrorPolicy,
}

/// What to raise when the delegated field has no usable value and the target
/// returned errors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorPolicy {
    /// A sole error exposing an upstream `result` payload, directly or through
    /// its `originalError`, is raised as is so that transport metadata survives.
    /// Anything else is combined into one error.
    #[default]
    Passthrough,

    /// Always combine every error message into a single error.
    Combine,
}
