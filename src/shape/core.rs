//! Composable request-shape primitives.
//!
//! A [`Shape`] is a structural description of an expected value — primitive
//! leaves (`string`, `number`, `boolean`), arrays, and objects with named,
//! typed fields. A [`RequestShape`] groups up to four facet shapes (query,
//! params, body, header) into a descriptor for a whole request.
//!
//! Shapes are lowered to JSON Schema documents and handed to the external
//! validator; they are never interpreted at request time except to coerce
//! string-valued facets (query/params/header arrive as text) into the
//! primitive type the shape expects.

use serde_json::{json, Map, Value};

/// A structural description of an expected value.
///
/// Descriptors built from shapes are immutable; lowering the same shape twice
/// yields identical schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Boolean,
    Array(Box<Shape>),
    Object(Vec<Field>),
}

/// A named, typed field of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: Shape,
    pub required: bool,
}

/// A string leaf.
pub fn string() -> Shape {
    Shape::String
}

/// A number leaf (any JSON number).
pub fn number() -> Shape {
    Shape::Number
}

/// A boolean leaf.
pub fn boolean() -> Shape {
    Shape::Boolean
}

/// An array whose items all match `items`.
pub fn array(items: Shape) -> Shape {
    Shape::Array(Box::new(items))
}

/// An object with the given named fields. Unknown keys are permitted; only
/// the listed fields are constrained.
pub fn object(fields: impl IntoIterator<Item = Field>) -> Shape {
    Shape::Object(fields.into_iter().collect())
}

/// A required object field.
pub fn field(name: impl Into<String>, shape: Shape) -> Field {
    Field {
        name: name.into(),
        shape,
        required: true,
    }
}

/// An optional object field: constrained when present, not required.
pub fn optional(name: impl Into<String>, shape: Shape) -> Field {
    Field {
        name: name.into(),
        shape,
        required: false,
    }
}

impl Shape {
    /// Lower this shape to a JSON Schema document.
    pub fn to_schema(&self) -> Value {
        match self {
            Shape::String => json!({ "type": "string" }),
            Shape::Number => json!({ "type": "number" }),
            Shape::Boolean => json!({ "type": "boolean" }),
            Shape::Array(items) => json!({ "type": "array", "items": items.to_schema() }),
            Shape::Object(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for f in fields {
                    properties.insert(f.name.clone(), f.shape.to_schema());
                    if f.required {
                        required.push(Value::String(f.name.clone()));
                    }
                }
                let mut schema = Map::new();
                schema.insert("type".to_string(), Value::String("object".to_string()));
                schema.insert("properties".to_string(), Value::Object(properties));
                if !required.is_empty() {
                    schema.insert("required".to_string(), Value::Array(required));
                }
                Value::Object(schema)
            }
        }
    }

    /// Convert a raw string value to the primitive type this shape expects.
    ///
    /// Query parameters, path parameters, and headers arrive as text; this
    /// converts them so a `number`-typed query field validates as a number.
    /// When conversion fails the raw string is kept, letting the validator
    /// report the mismatch instead of hiding it.
    pub fn coerce(&self, raw: &str) -> Value {
        match self {
            Shape::String => Value::String(raw.to_string()),
            Shape::Number => raw
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| raw.parse::<f64>().map(Value::from))
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            Shape::Boolean => raw
                .parse::<bool>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            Shape::Array(items) => Value::Array(
                raw.split(',')
                    .filter(|s| !s.is_empty())
                    .map(|part| items.coerce(part.trim()))
                    .collect(),
            ),
            Shape::Object(_) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
            }
        }
    }

    /// The shape of a named field, when this shape is an object that names it.
    pub(crate) fn field_shape(&self, name: &str) -> Option<&Shape> {
        match self {
            Shape::Object(fields) => fields.iter().find(|f| f.name == name).map(|f| &f.shape),
            _ => None,
        }
    }
}

/// Expected structure for up to four request facets.
///
/// Each facet is optional; an unconstrained facet is ignored entirely during
/// validation. Header field names should be lowercase — header lookup is
/// performed against lowercased names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestShape {
    pub query: Option<Shape>,
    pub params: Option<Shape>,
    pub body: Option<Shape>,
    pub header: Option<Shape>,
}

impl RequestShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain the query-string facet.
    pub fn query(mut self, shape: Shape) -> Self {
        self.query = Some(shape);
        self
    }

    /// Constrain the path-parameter facet.
    pub fn params(mut self, shape: Shape) -> Self {
        self.params = Some(shape);
        self
    }

    /// Constrain the body facet.
    pub fn body(mut self, shape: Shape) -> Self {
        self.body = Some(shape);
        self
    }

    /// Constrain the header facet. Field names must be lowercase.
    pub fn header(mut self, shape: Shape) -> Self {
        self.header = Some(shape);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_schema_lists_required_fields() {
        let shape = object([field("name", string()), optional("nick", string())]);
        let schema = shape.to_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn test_coerce_number_keeps_integers_integral() {
        assert_eq!(number().coerce("30"), json!(30));
        assert_eq!(number().coerce("1.5"), json!(1.5));
        assert_eq!(number().coerce("thirty"), json!("thirty"));
    }

    #[test]
    fn test_coerce_boolean() {
        assert_eq!(boolean().coerce("true"), json!(true));
        assert_eq!(boolean().coerce("yes"), json!("yes"));
    }

    #[test]
    fn test_coerce_array_splits_on_commas() {
        assert_eq!(array(number()).coerce("1,2,3"), json!([1, 2, 3]));
    }
}
