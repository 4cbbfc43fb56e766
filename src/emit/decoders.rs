//! Typed decoding of captured path parameters.
//!
//! The matcher only checks the shape of a value (`[0-9]+` for ints, hyphen
//! positions for uuids). Decoding into native types can still fail, e.g. on
//! integer overflow, and that failure is a `DecodeError` rather than a miss.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::routing::definition::{ParamType, RouteDefinition};
use crate::routing::matcher::{CompiledRoutes, Params};

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Str(String),
    Int(isize),
    Int64(i64),
    Uuid(Uuid),
}

impl TypedValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            TypedValue::Str(_) => ParamType::String,
            TypedValue::Int(_) => ParamType::Int,
            TypedValue::Int64(_) => ParamType::Int64,
            TypedValue::Uuid(_) => ParamType::Uuid,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Str(s) => f.write_str(s),
            TypedValue::Int(n) => write!(f, "{}", n),
            TypedValue::Int64(n) => write!(f, "{}", n),
            TypedValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Str(s.to_string())
    }
}

impl From<isize> for TypedValue {
    fn from(n: isize) -> Self {
        TypedValue::Int(n)
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        TypedValue::Int64(n)
    }
}

impl From<Uuid> for TypedValue {
    fn from(u: Uuid) -> Self {
        TypedValue::Uuid(u)
    }
}

/// Decoded parameters keyed by name.
pub type TypedParams = BTreeMap<String, TypedValue>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("parameter '{param}' was not captured")]
    Missing { param: String },

    #[error("parameter '{param}' value '{value}' does not decode as {expected}: {reason}")]
    Invalid {
        param: String,
        expected: ParamType,
        value: String,
        reason: String,
    },
}

/// One field of a parameter shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeField {
    pub name: String,
    pub ty: ParamType,
    pub catch_all: bool,
}

/// The ordered names and types a route binds.
///
/// Routes with equal shapes share one generated parameter struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParamShape {
    fields: Vec<ShapeField>,
}

impl ParamShape {
    pub fn of(route: &RouteDefinition) -> Self {
        Self {
            fields: route
                .params
                .iter()
                .map(|p| ShapeField {
                    name: p.name.clone(),
                    ty: p.ty,
                    catch_all: p.catch_all,
                })
                .collect(),
        }
    }

    pub fn fields(&self) -> &[ShapeField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// CamelCase struct name, e.g. `SlugParams` or `UserIdIntParams`.
    pub fn type_name(&self) -> String {
        let mut name = String::new();
        for field in &self.fields {
            name.push_str(&pascal_case(&field.name));
            match field.ty {
                ParamType::String if field.catch_all => name.push_str("Rest"),
                ParamType::String => {}
                ParamType::Int => name.push_str("Int"),
                ParamType::Int64 => name.push_str("Int64"),
                ParamType::Uuid => name.push_str("Uuid"),
            }
        }
        name.push_str("Params");
        name
    }

    /// Decode raw captures into typed values.
    pub fn decode(&self, raw: &Params) -> Result<TypedParams, DecodeError> {
        self.fields
            .iter()
            .map(|field| -> Result<(String, TypedValue), DecodeError> {
                let value = raw.get(&field.name).ok_or_else(|| DecodeError::Missing {
                    param: field.name.clone(),
                })?;
                Ok((field.name.clone(), decode_value(&field.name, field.ty, value)?))
            })
            .collect()
    }
}

/// Decode the captures of a match for `route`.
pub fn decode_params(route: &RouteDefinition, raw: &Params) -> Result<TypedParams, DecodeError> {
    ParamShape::of(route).decode(raw)
}

/// Distinct non-empty shapes with the routes using them, in path order.
pub fn param_shapes(compiled: &CompiledRoutes) -> Vec<(ParamShape, Vec<&RouteDefinition>)> {
    let mut shapes: Vec<(ParamShape, Vec<&RouteDefinition>)> = Vec::new();
    for (route, _) in compiled.routes() {
        let shape = ParamShape::of(route);
        if shape.is_empty() {
            continue;
        }
        match shapes.iter_mut().find(|(s, _)| *s == shape) {
            Some((_, routes)) => routes.push(route),
            None => shapes.push((shape, vec![route])),
        }
    }
    shapes
}

fn decode_value(param: &str, ty: ParamType, value: &str) -> Result<TypedValue, DecodeError> {
    let invalid = |reason: String| DecodeError::Invalid {
        param: param.to_string(),
        expected: ty,
        value: value.to_string(),
        reason,
    };

    match ty {
        ParamType::String => Ok(TypedValue::Str(value.to_string())),
        ParamType::Int => value
            .parse::<isize>()
            .map(TypedValue::Int)
            .map_err(|e| invalid(e.to_string())),
        ParamType::Int64 => value
            .parse::<i64>()
            .map(TypedValue::Int64)
            .map_err(|e| invalid(e.to_string())),
        ParamType::Uuid => Uuid::parse_str(value)
            .map(TypedValue::Uuid)
            .map_err(|e| invalid(e.to_string())),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::definition::{HandlerRef, RouteKind};

    fn route(pattern: &str) -> RouteDefinition {
        RouteDefinition::parse(pattern, pattern, "", HandlerRef::new(pattern), RouteKind::Page)
            .unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_decode_typed_values() {
        let route = route("/orgs/[org:uuid]/items/[id:int64]/[...rest]");
        let decoded = decode_params(
            &route,
            &raw(&[
                ("org", "123e4567-e89b-12d3-a456-426614174000"),
                ("id", "9000000000"),
                ("rest", "a/b"),
            ]),
        )
        .unwrap();

        assert_eq!(decoded["id"], TypedValue::Int64(9_000_000_000));
        assert_eq!(decoded["rest"], TypedValue::Str("a/b".into()));
        assert_eq!(
            decoded["org"].to_string(),
            "123e4567-e89b-12d3-a456-426614174000"
        );
    }

    #[test]
    fn test_int_overflow_is_decode_error() {
        let route = route("/item/[id:int]");
        let err = decode_params(&route, &raw(&[("id", "99999999999999999999999")])).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Invalid {
                expected: ParamType::Int,
                ..
            }
        ));
    }

    #[test]
    fn test_uuid_with_bad_hex_is_decode_error() {
        let route = route("/o/[id:uuid]");
        let value = "zzzzzzzz-e89b-12d3-a456-426614174000";
        assert!(ParamType::Uuid.accepts(value));
        assert!(decode_params(&route, &raw(&[("id", value)])).is_err());
    }

    #[test]
    fn test_missing_capture() {
        let route = route("/a/[b]");
        assert_eq!(
            decode_params(&route, &Params::new()),
            Err(DecodeError::Missing { param: "b".into() })
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ParamShape::of(&route("/blog/[slug]")).type_name(), "SlugParams");
        assert_eq!(
            ParamShape::of(&route("/u/[user_id:int]/[...path]")).type_name(),
            "UserIdIntPathRestParams"
        );
    }
}
