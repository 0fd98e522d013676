//! Tests for facet validation and type narrowing.
//!
//! The checker consumes the external validator (`jsonschema`); these tests
//! pin the observable contract: ordered failure messages, verbatim success
//! values, deterministic outcomes, and string-facet coercion.

use checkroute::{field, number, object, optional, string, RequestShape};
use http::Method;
use serde::Deserialize;
use serde_json::{json, Value};

mod common;
use common::fixtures::{handler_request, push_pair};

#[derive(Debug, Deserialize, PartialEq)]
struct CheckedUser {
    body: UserBody,
}

#[derive(Debug, Deserialize, PartialEq)]
struct UserBody {
    name: String,
    age: i64,
}

fn user_shape() -> RequestShape {
    RequestShape::new().body(object([field("name", string()), field("age", number())]))
}

#[test]
fn test_valid_body_narrows_into_typed_value() {
    let checker = user_shape().checker::<CheckedUser>().expect("compile");
    let (req, _rx) = handler_request(
        Method::POST,
        "/user",
        Some(json!({ "name": "Ada", "age": 30 })),
    );

    let user = checker.check(&req).expect("valid request");
    assert_eq!(
        user,
        CheckedUser {
            body: UserBody {
                name: "Ada".to_string(),
                age: 30,
            }
        }
    );
}

#[test]
fn test_missing_field_reports_message_mentioning_it() {
    let checker = user_shape().checker::<CheckedUser>().expect("compile");
    let (req, _rx) = handler_request(Method::POST, "/user", Some(json!({ "name": "Ada" })));

    let errors = checker.check(&req).expect_err("invalid request");
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].contains("age"),
        "message should mention the missing field: {}",
        errors[0]
    );
    assert!(errors[0].starts_with("body:"));
}

#[test]
fn test_wrong_type_is_reported() {
    let checker = user_shape().checker::<CheckedUser>().expect("compile");
    let (req, _rx) = handler_request(
        Method::POST,
        "/user",
        Some(json!({ "name": "Ada", "age": "thirty" })),
    );

    let errors = checker.check(&req).expect_err("invalid request");
    assert!(!errors.is_empty());
    assert!(errors.iter().any(|e| e.contains("thirty")));
}

#[test]
fn test_missing_body_is_a_validation_failure() {
    let checker = user_shape().checker::<CheckedUser>().expect("compile");
    let (req, _rx) = handler_request(Method::POST, "/user", None);

    let errors = checker.check(&req).expect_err("no body");
    assert!(!errors.is_empty());
    assert!(errors[0].starts_with("body:"));
}

#[test]
fn test_check_is_deterministic() {
    let checker = user_shape().checker::<CheckedUser>().expect("compile");
    let (req, _rx) = handler_request(Method::POST, "/user", Some(json!({ "age": true })));

    let first = checker.check(&req).expect_err("invalid");
    let second = checker.check(&req).expect_err("invalid");
    assert_eq!(first, second);
}

#[test]
fn test_success_value_is_verbatim() {
    // Narrowing into Value exposes exactly what the validator approved:
    // nothing added, removed, or reordered.
    let shape = RequestShape::new().body(object([
        field("name", string()),
        optional("tags", checkroute::array(string())),
    ]));
    let checker = shape.checker::<Value>().expect("compile");
    let body = json!({ "name": "Ada", "tags": ["a", "b"], "extra": 1 });
    let (req, _rx) = handler_request(Method::POST, "/user", Some(body.clone()));

    let value = checker.check(&req).expect("valid");
    assert_eq!(value, json!({ "body": body }));
}

#[test]
fn test_unconstrained_facets_are_ignored() {
    let checker = user_shape().checker::<Value>().expect("compile");
    let (mut req, _rx) = handler_request(
        Method::POST,
        "/user",
        Some(json!({ "name": "Ada", "age": 30 })),
    );
    push_pair(&mut req.query_params, "verbose", "true");

    let value = checker.check(&req).expect("valid");
    let facets = value.as_object().expect("object");
    assert_eq!(facets.keys().collect::<Vec<_>>(), vec!["body"]);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Paged {
    query: PageQuery,
}

#[derive(Debug, Deserialize, PartialEq)]
struct PageQuery {
    limit: i64,
}

#[test]
fn test_query_facet_coerces_numbers() {
    let shape = RequestShape::new().query(object([field("limit", number())]));
    let checker = shape.checker::<Paged>().expect("compile");
    let (mut req, _rx) = handler_request(Method::GET, "/items", None);
    push_pair(&mut req.query_params, "limit", "25");

    let paged = checker.check(&req).expect("valid");
    assert_eq!(paged.query.limit, 25);
}

#[test]
fn test_query_facet_rejects_non_numeric_strings() {
    let shape = RequestShape::new().query(object([field("limit", number())]));
    let checker = shape.checker::<Paged>().expect("compile");
    let (mut req, _rx) = handler_request(Method::GET, "/items", None);
    push_pair(&mut req.query_params, "limit", "lots");

    let errors = checker.check(&req).expect_err("invalid");
    assert!(errors[0].starts_with("query:"));
}

#[test]
fn test_params_facet_uses_path_parameters() {
    #[derive(Debug, Deserialize)]
    struct ItemLookup {
        params: ItemParams,
    }
    #[derive(Debug, Deserialize)]
    struct ItemParams {
        id: i64,
    }

    let shape = RequestShape::new().params(object([field("id", number())]));
    let checker = shape.checker::<ItemLookup>().expect("compile");
    let (mut req, _rx) = handler_request(Method::GET, "/items/{id}", None);
    push_pair(&mut req.path_params, "id", "7");

    let lookup = checker.check(&req).expect("valid");
    assert_eq!(lookup.params.id, 7);
}

#[test]
fn test_header_facet_checks_lowercase_names() {
    #[derive(Debug, Deserialize)]
    struct Versioned {
        header: VersionHeader,
    }
    #[derive(Debug, Deserialize)]
    struct VersionHeader {
        #[serde(rename = "x-api-version")]
        version: String,
    }

    let shape = RequestShape::new().header(object([field("x-api-version", string())]));
    let checker = shape.checker::<Versioned>().expect("compile");

    let (mut req, _rx) = handler_request(Method::GET, "/items", None);
    req.headers
        .push((std::sync::Arc::from("x-api-version"), "2024-01".to_string()));
    let versioned = checker.check(&req).expect("valid");
    assert_eq!(versioned.header.version, "2024-01");

    let (req, _rx) = handler_request(Method::GET, "/items", None);
    let errors = checker.check(&req).expect_err("missing header");
    assert!(errors[0].contains("x-api-version"));
}

#[test]
fn test_facet_order_is_query_params_body_header() {
    let shape = RequestShape::new()
        .query(object([field("q", number())]))
        .body(object([field("name", string())]));
    let checker = shape.checker::<Value>().expect("compile");
    let (mut req, _rx) = handler_request(Method::POST, "/user", Some(json!({})));
    push_pair(&mut req.query_params, "q", "nope");

    let errors = checker.check(&req).expect_err("both facets invalid");
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("query:"));
    assert!(errors[1].starts_with("body:"));
}
