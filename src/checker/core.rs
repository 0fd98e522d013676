//! Request validation against a [`RequestShape`] descriptor.
//!
//! The validation engine is the `jsonschema` crate; this module only lowers
//! each constrained facet to a compiled schema, applies it to the matching
//! part of the incoming request, and narrows the validated facets into the
//! handler's typed value via serde.
//!
//! Validation failure is a normal outcome, not a fault: `check` returns the
//! ordered message list and never panics or throws past its caller.

use crate::dispatcher::HandlerRequest;
use crate::shape::{RequestShape, Shape};
use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone)]
struct FacetChecker {
    shape: Shape,
    schema: Arc<JSONSchema>,
}

impl FacetChecker {
    fn compile(facet: &str, shape: &Shape) -> anyhow::Result<Self> {
        let schema_doc = shape.to_schema();
        let schema = JSONSchema::compile(&schema_doc)
            .map_err(|e| anyhow::anyhow!("invalid {facet} facet schema: {e}"))?;
        Ok(Self {
            shape: shape.clone(),
            schema: Arc::new(schema),
        })
    }

    fn validate(&self, facet: &str, value: &Value, errors: &mut Vec<String>) {
        if let Err(found) = self.schema.validate(value) {
            errors.extend(found.map(|e| format!("{facet}: {e}")));
        }
    }
}

/// Compiled validators for the constrained facets of a [`RequestShape`],
/// narrowing valid requests into `T`.
///
/// `T` mirrors the descriptor: an object holding exactly the constrained
/// facets, e.g. a descriptor constraining only `body` narrows into
/// `struct Checked { body: ... }`. Cloning is cheap - the compiled schemas
/// sit behind `Arc`.
pub struct RequestChecker<T> {
    query: Option<FacetChecker>,
    params: Option<FacetChecker>,
    body: Option<FacetChecker>,
    header: Option<FacetChecker>,
    _narrowed: PhantomData<fn() -> T>,
}

impl<T> Clone for RequestChecker<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            params: self.params.clone(),
            body: self.body.clone(),
            header: self.header.clone(),
            _narrowed: PhantomData,
        }
    }
}

impl RequestShape {
    /// Compile this descriptor's facet schemas into a [`RequestChecker`].
    ///
    /// Compilation happens once, at route-registration time; per-request
    /// validation reuses the compiled schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if a facet shape lowers to a schema the validator
    /// rejects.
    pub fn checker<T: DeserializeOwned>(&self) -> anyhow::Result<RequestChecker<T>> {
        Ok(RequestChecker {
            query: self
                .query
                .as_ref()
                .map(|s| FacetChecker::compile("query", s))
                .transpose()?,
            params: self
                .params
                .as_ref()
                .map(|s| FacetChecker::compile("params", s))
                .transpose()?,
            body: self
                .body
                .as_ref()
                .map(|s| FacetChecker::compile("body", s))
                .transpose()?,
            header: self
                .header
                .as_ref()
                .map(|s| FacetChecker::compile("header", s))
                .transpose()?,
            _narrowed: PhantomData,
        })
    }
}

/// Build a facet object from name/value string pairs, coercing each value to
/// the primitive type the facet shape expects. Duplicate names keep the last
/// occurrence, matching the request accessors.
fn facet_value<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>, shape: &Shape) -> Value {
    let mut map = Map::new();
    for (name, raw) in pairs {
        let value = match shape.field_shape(name) {
            Some(field) => field.coerce(raw),
            None => Value::String(raw.to_string()),
        };
        map.insert(name.to_string(), value);
    }
    Value::Object(map)
}

impl<T: DeserializeOwned> RequestChecker<T> {
    /// Validate the request's constrained facets and narrow into `T`.
    ///
    /// Facets are checked in a fixed order (query, params, body, header) and
    /// every message from every constrained facet is collected - validation
    /// does not stop at the first failure. The success value contains exactly
    /// the facets the descriptor constrains, verbatim as validated.
    ///
    /// A constrained body facet with no request body validates JSON `null`,
    /// which yields a descriptive type mismatch from the validator.
    pub fn check(&self, req: &HandlerRequest) -> Result<T, Vec<String>> {
        let mut errors = Vec::new();
        let mut checked = Map::new();

        if let Some(facet) = &self.query {
            let value = facet_value(
                req.query_params.iter().map(|(k, v)| (k.as_ref(), v.as_str())),
                &facet.shape,
            );
            facet.validate("query", &value, &mut errors);
            checked.insert("query".to_string(), value);
        }
        if let Some(facet) = &self.params {
            let value = facet_value(
                req.path_params.iter().map(|(k, v)| (k.as_ref(), v.as_str())),
                &facet.shape,
            );
            facet.validate("params", &value, &mut errors);
            checked.insert("params".to_string(), value);
        }
        if let Some(facet) = &self.body {
            let value = req.body.clone().unwrap_or(Value::Null);
            facet.validate("body", &value, &mut errors);
            checked.insert("body".to_string(), value);
        }
        if let Some(facet) = &self.header {
            let value = facet_value(
                req.headers.iter().map(|(k, v)| (k.as_ref(), v.as_str())),
                &facet.shape,
            );
            facet.validate("header", &value, &mut errors);
            checked.insert("header".to_string(), value);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // The descriptor and T disagreeing is a registration bug, but it is
        // still reported on the validation path rather than as a fault.
        serde_json::from_value(Value::Object(checked))
            .map_err(|e| vec![format!("checked value did not match handler type: {e}")])
    }
}
