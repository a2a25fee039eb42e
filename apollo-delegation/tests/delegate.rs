use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::validation::Valid;
use apollo_delegation::Context;
use apollo_delegation::DelegationConfig;
use apollo_delegation::DelegationError;
use apollo_delegation::DelegationOptions;
use apollo_delegation::Executor;
use apollo_delegation::FieldPath;
use apollo_delegation::MockExecutor;
use apollo_delegation::OperationKind;
use apollo_delegation::Request;
use apollo_delegation::ResolveInfo;
use apollo_delegation::Resolved;
use apollo_delegation::ResultValue;
use apollo_delegation::Subschema;
use apollo_delegation::Transform;
use apollo_delegation::delegate;
use apollo_delegation::error::ErrorCause;
use apollo_delegation::graphql;
use apollo_delegation::graphql::Response;
use apollo_delegation::json_ext::Object;
use apollo_delegation::json_ext::Path;
use apollo_delegation::transform::TransformFactory;
use futures::StreamExt;
use insta::assert_snapshot;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;
use test_log::test;

const TARGET_SCHEMA: &str = r#"
type Query {
  user(id: ID!): User
  viewer: Viewer
}

type Viewer {
  user(id: ID!): User
}

type Mutation {
  rename(id: ID!, name: String!): User
}

type Subscription {
  userChanged(id: ID!): User
}

type User {
  id: ID!
  name: String
  friends: [User]
}
"#;

fn target_schema() -> Arc<Valid<Schema>> {
    Arc::new(Schema::parse_and_validate(TARGET_SCHEMA, "target.graphql").unwrap())
}

fn subschema(mock: &MockExecutor) -> Subschema {
    let executor: Arc<dyn Executor> = Arc::new(mock.clone());
    Subschema::builder()
        .schema(target_schema())
        .executor(executor)
        .build()
}

fn info(query: &str, response_key: &str) -> Arc<ResolveInfo> {
    let document = ast::Document::parse(query, "query.graphql").unwrap();
    Arc::new(ResolveInfo::for_root_field(&document, None, response_key, Object::new()).unwrap())
}

fn resolved(delegated: apollo_delegation::Delegated) -> Resolved {
    delegated.into_resolved().expect("a resolved value")
}

#[test(tokio::test)]
async fn delegates_a_root_field_with_hoisted_arguments() {
    let mock = MockExecutor::new(
        Response::builder()
            .data(json!({"user": {"id": "1", "name": "Ada"}}))
            .build(),
    );
    let context = Context::new();
    context.insert("request-id".to_string());

    let delegated = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("1"))
            .context(context)
            .info(info("{ me { id name } }", "me"))
            .build(),
    )
    .await
    .unwrap();

    assert_eq!(
        resolved(delegated),
        Resolved::new(json!({"id": "1", "name": "Ada"}))
    );

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_snapshot!(requests[0].document, @r###"
    query($_v0_id: ID!) {
      user(id: $_v0_id) {
        id
        name
      }
    }
    "###);
    assert_eq!(
        serde_json_bytes::Value::Object(requests[0].variables.clone()),
        json!({"_v0_id": "1"})
    );
    assert_eq!(
        requests[0].context.get::<String>().as_deref(),
        Some("request-id")
    );
}

#[test(tokio::test)]
async fn keeps_caller_variables_and_operation_name() {
    let mock = MockExecutor::new(Response::builder().data(json!({"user": {"id": "1"}})).build());
    let document = ast::Document::parse(
        "query Me($id: ID!) { me: person(id: $id) { id } }",
        "query.graphql",
    )
    .unwrap();
    let mut variables = Object::new();
    variables.insert("id", json!("1"));
    let info = ResolveInfo::for_root_field(&document, Some("Me"), "me", variables).unwrap();

    delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .info(Arc::new(info))
            .build(),
    )
    .await
    .unwrap();

    let request = &mock.requests()[0];
    assert_eq!(request.operation_name.as_deref(), Some("Me"));
    assert_snapshot!(request.document, @r###"
    query Me($id: ID!) {
      user(id: $id) {
        id
      }
    }
    "###);
    assert_eq!(
        serde_json_bytes::Value::Object(request.variables.clone()),
        json!({"id": "1"})
    );
}

#[test(tokio::test)]
async fn defers_errors_below_the_delegated_field() {
    let mock = MockExecutor::new(
        Response::builder()
            .data(json!({"user": {"id": "1", "friends": [{"name": "Bo"}, {"name": null}]}}))
            .error(
                graphql::Error::builder()
                    .message("name is private")
                    .path(serde_json::from_str::<Path>(r#"["user","friends",1,"name"]"#).unwrap())
                    .build(),
            )
            .build(),
    );

    let delegated = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("1"))
            .info(info("{ me { id friends { name } } }", "me"))
            .build(),
    )
    .await
    .unwrap();
    let mut resolved = resolved(delegated);

    let friends = resolved
        .resolve_field(&Path::empty(), &info("{ id friends { name } }", "friends"))
        .unwrap();
    assert_eq!(friends, json!([{"name": "Bo"}, {"name": null}]));

    let name = info("{ name }", "name");
    let first: Path = serde_json::from_str(r#"["friends",0]"#).unwrap();
    assert_eq!(resolved.resolve_field(&first, &name).unwrap(), json!("Bo"));

    let second: Path = serde_json::from_str(r#"["friends",1]"#).unwrap();
    let error = resolved.resolve_field(&second, &name).unwrap_err();
    assert_eq!(error.message, "name is private");
}

#[test(tokio::test)]
async fn fails_the_field_without_a_usable_value() {
    let mock = MockExecutor::new(
        Response::builder()
            .data(json!({"user": null}))
            .error(
                graphql::Error::builder()
                    .message("user not found")
                    .path(Path::from("user"))
                    .extension_code("NOT_FOUND")
                    .build(),
            )
            .build(),
    );

    let error = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("404"))
            .info(info("{\n  me { id }\n}", "me"))
            .build(),
    )
    .await
    .unwrap_err();

    let DelegationError::Execution(located) = &error else {
        panic!("expected an execution error, got {error:?}");
    };
    assert!(matches!(located.cause, ErrorCause::Combined(ref errors) if errors.len() == 1));

    let errors = error.to_graphql_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "user not found");
    assert_eq!(errors[0].path, Some(Path::from("me")));
    assert_eq!(
        errors[0].locations,
        vec![graphql::Location { line: 2, column: 3 }]
    );
    assert_eq!(errors[0].extension_code().as_deref(), Some("SUBSCHEMA_ERRORS"));
}

#[test(tokio::test)]
async fn invalid_operations_are_not_executed() {
    let mock = MockExecutor::new(Response::builder().data(json!({"user": null})).build());

    let error = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("1"))
            .info(info("{ me { id age } }", "me"))
            .build(),
    )
    .await
    .unwrap_err();

    let DelegationError::Validation(validation) = &error else {
        panic!("expected a validation error, got {error:?}");
    };
    assert_eq!(validation.errors.len(), 1);
    assert!(validation.errors[0].message.contains("age"));
    assert_eq!(
        validation.errors[0].extension_code().as_deref(),
        Some("GRAPHQL_VALIDATION_FAILED")
    );
    assert!(mock.requests().is_empty());
}

#[test(tokio::test)]
async fn every_validation_error_is_reported() {
    let mock = MockExecutor::new(Response::builder().data(json!({"user": null})).build());

    let error = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("1"))
            .info(info("{ me { id age email } }", "me"))
            .build(),
    )
    .await
    .unwrap_err();

    let DelegationError::Validation(validation) = &error else {
        panic!("expected a validation error, got {error:?}");
    };
    assert_eq!(validation.errors.len(), 2);
    assert!(validation.errors[0].message.contains("age"));
    assert!(validation.errors[1].message.contains("email"));
    assert_eq!(error.to_graphql_errors().len(), 2);
    assert!(mock.requests().is_empty());
}

#[test(tokio::test)]
async fn merged_caller_arguments_are_hoisted_once() {
    let mock = MockExecutor::new(
        Response::builder()
            .data(json!({"user": {"id": "2", "name": "Bo"}}))
            .build(),
    );

    let delegated = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("2"))
            .info(info(
                r#"{ me: user(id: "1") { id } me: user(id: "1") { name } }"#,
                "me",
            ))
            .build(),
    )
    .await
    .unwrap();

    assert_eq!(resolved(delegated).value, json!({"id": "2", "name": "Bo"}));
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_snapshot!(requests[0].document, @r###"
    query($_v0_id: ID!) {
      user(id: $_v0_id) {
        id
        name
      }
    }
    "###);
    assert_eq!(
        serde_json_bytes::Value::Object(requests[0].variables.clone()),
        json!({"_v0_id": "2"})
    );
}

#[test(tokio::test)]
async fn validation_can_be_skipped() {
    let mock = MockExecutor::new(Response::builder().data(json!({"user": {"id": "1"}})).build());

    delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("1"))
            .skip_validation(true)
            .info(info("{ me { id age } }", "me"))
            .build(),
    )
    .await
    .unwrap();
    assert_eq!(mock.requests().len(), 1);

    let executor: Arc<dyn Executor> = Arc::new(mock.clone());
    let lenient = Subschema::builder()
        .schema(target_schema())
        .executor(executor)
        .config(DelegationConfig {
            skip_validation: true,
            ..Default::default()
        })
        .build();
    delegate(
        DelegationOptions::builder()
            .subschema(lenient)
            .field_name("user")
            .arg("id", json!("1"))
            .info(info("{ me { id age } }", "me"))
            .build(),
    )
    .await
    .unwrap();
    assert_eq!(mock.requests().len(), 2);
}

#[test(tokio::test)]
async fn delegates_through_wrapper_fields() {
    let mock = MockExecutor::new(
        Response::builder()
            .data(json!({"viewer": {"user": {"id": "1", "name": null}}}))
            .error(
                graphql::Error::builder()
                    .message("no name")
                    .path(serde_json::from_str::<Path>(r#"["viewer","user","name"]"#).unwrap())
                    .build(),
            )
            .build(),
    );

    let delegated = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name(["viewer", "user"])
            .info(info(r#"{ me(id: "1") { id name } }"#, "me"))
            .build(),
    )
    .await
    .unwrap();

    assert_snapshot!(mock.requests()[0].document, @r###"
    {
      viewer {
        user(id: "1") {
          id
          name
        }
      }
    }
    "###);

    let mut resolved = resolved(delegated);
    assert_eq!(resolved.value, json!({"id": "1", "name": null}));
    let error = resolved
        .resolve_field(&Path::empty(), &info("{ id name }", "name"))
        .unwrap_err();
    assert_eq!(error.message, "no name");
}

#[test(tokio::test)]
async fn caller_transforms_wrap_the_built_in_ones() {
    let mock = MockExecutor::new(Response::builder().data(json!({"user": {"id": "1"}})).build());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_request = seen.clone();
    let seen_result = seen.clone();
    let caller = Transform::request(move |request: Request| -> Result<Request, DelegationError> {
        seen_request
            .lock()
            .push(format!("request with {} variables", request.variables.len()));
        Ok(request)
    });
    let observer = Transform::result(
        move |result: ResultValue| -> Result<ResultValue, DelegationError> {
            let kind = match &result {
                ResultValue::Response(_) => "response",
                ResultValue::Resolved(_) => "resolved",
            };
            seen_result.lock().push(format!("result {kind}"));
            Ok(result)
        },
    );

    delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .arg("id", json!("1"))
            .transform(caller)
            .transform(observer)
            .info(info("{ me { id } }", "me"))
            .build(),
    )
    .await
    .unwrap();

    // caller transforms run before hoisting and after reconciliation
    assert_eq!(
        *seen.lock(),
        vec![
            "request with 0 variables".to_string(),
            "result resolved".to_string()
        ]
    );
}

#[test(tokio::test)]
async fn failing_caller_transform_prevents_execution() {
    let mock = MockExecutor::new(Response::default());

    let error = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("user")
            .transform(Transform::request(
                |_: Request| -> Result<Request, DelegationError> {
                    Err(DelegationError::Transform("not allowed".into()))
                },
            ))
            .info(info("{ me { id } }", "me"))
            .build(),
    )
    .await
    .unwrap_err();

    assert_eq!(error.to_string(), "transform failed: not allowed");
    assert!(mock.requests().is_empty());
}

#[test(tokio::test)]
async fn target_transform_factories_run_after_hoisting() {
    let mock = MockExecutor::new(Response::builder().data(json!({"user": {"id": "1"}})).build());
    let factory: Arc<dyn TransformFactory> = Arc::new(|_: &Arc<Valid<Schema>>| {
        Transform::request(|mut request: Request| -> Result<Request, DelegationError> {
            request
                .variables
                .insert("filtered", json!(request.variables.len()));
            Ok(request)
        })
    });
    let executor: Arc<dyn Executor> = Arc::new(mock.clone());
    let subschema = Subschema::builder()
        .schema(target_schema())
        .executor(executor)
        .schema_filter(factory)
        .build();

    delegate(
        DelegationOptions::builder()
            .subschema(subschema)
            .field_name("user")
            .arg("id", json!("1"))
            .info(info("{ me { id } }", "me"))
            .build(),
    )
    .await
    .unwrap();

    assert_eq!(
        mock.requests()[0].variables.get("filtered"),
        Some(&json!(1))
    );
}

#[test(tokio::test)]
async fn delegates_mutations() {
    let mock = MockExecutor::new(
        Response::builder()
            .data(json!({"rename": {"id": "1", "name": "Ada"}}))
            .build(),
    );

    let delegated = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .operation(OperationKind::Mutation)
            .field_name("rename")
            .arg("id", json!("1"))
            .arg("name", json!("Ada"))
            .info(info("{ renameMe { name } }", "renameMe"))
            .build(),
    )
    .await
    .unwrap();

    assert_eq!(resolved(delegated).value, json!({"id": "1", "name": "Ada"}));
    assert_snapshot!(mock.requests()[0].document, @r###"
    mutation($_v0_id: ID!, $_v1_name: String!) {
      rename(id: $_v0_id, name: $_v1_name) {
        name
      }
    }
    "###);
}

#[test(tokio::test)]
async fn unknown_target_field_fails_before_execution() {
    let mock = MockExecutor::new(Response::default());

    let error = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .field_name("account")
            .arg("id", json!("1"))
            .info(info("{ me { id } }", "me"))
            .build(),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, DelegationError::Hoist(_)));
    assert!(mock.requests().is_empty());
}

#[test(tokio::test)]
async fn subscriptions_return_the_event_stream() {
    let mock = MockExecutor::new(Response::default()).with_events(vec![
        Response::builder()
            .data(json!({"userChanged": {"id": "1"}}))
            .build(),
        Response::builder()
            .data(json!({"userChanged": {"id": "2"}}))
            .build(),
    ]);

    let delegated = delegate(
        DelegationOptions::builder()
            .subschema(subschema(&mock))
            .operation(OperationKind::Subscription)
            .field_name("userChanged")
            .arg("id", json!("1"))
            .info(info("subscription { changes { id } }", "changes"))
            .build(),
    )
    .await
    .unwrap();

    let events: Vec<Response> = delegated
        .into_stream()
        .expect("an event stream")
        .collect()
        .await;
    // events are not reconciled
    assert_eq!(
        events[1].data,
        Some(json!({"userChanged": {"id": "2"}}))
    );
    assert_eq!(events.len(), 2);
    assert_snapshot!(mock.requests()[0].document, @r###"
    subscription($_v0_id: ID!) {
      userChanged(id: $_v0_id) {
        id
      }
    }
    "###);
}

#[test]
fn field_path_accepts_strings_and_lists() {
    assert_eq!(FieldPath::from("user").to_string(), "user");
    assert_eq!(FieldPath::from(vec!["viewer", "user"]).len(), 2);
}
