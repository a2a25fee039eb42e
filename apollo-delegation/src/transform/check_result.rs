use std::sync::Arc;

use super::ResultTransform;
use super::ResultValue;
use crate::configuration::UpstreamErrorPolicy;
use crate::delegate::ResolveInfo;
use crate::error::DelegationError;
use crate::reconcile::check_result_and_handle_errors;
use crate::request::FieldPath;

/// Turns the response of the target executor into the value of the delegated field.
///
/// Always the last transform of a delegation, so it sees the response as the
/// executor returned it. A value that is already resolved passes through.
#[derive(Clone, Debug)]
pub struct CheckResultAndHandleErrors {
    info: Arc<ResolveInfo>,
    field_path: FieldPath,
    policy: UpstreamErrorPolicy,
}

impl CheckResultAndHandleErrors {
    pub fn new(info: Arc<ResolveInfo>, field_path: FieldPath, policy: UpstreamErrorPolicy) -> Self {
        Self {
            info,
            field_path,
            policy,
        }
    }
}

impl ResultTransform for CheckResultAndHandleErrors {
    fn transform_result(&self, result: ResultValue) -> Result<ResultValue, DelegationError> {
        match result {
            ResultValue::Response(response) => Ok(ResultValue::Resolved(
                check_result_and_handle_errors(
                    response,
                    &self.info,
                    Some(&self.field_path),
                    self.policy,
                )?,
            )),
            resolved @ ResultValue::Resolved(_) => Ok(resolved),
        }
    }
}
