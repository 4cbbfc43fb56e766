//! Path reconstruction from typed arguments.

use thiserror::Error;

use crate::emit::decoders::{TypedParams, TypedValue};
use crate::routing::definition::{ParamType, RouteDefinition};
use crate::routing::grammar::Segment;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("route '{pattern}' needs a value for '{param}'")]
    MissingParam { pattern: String, param: String },

    #[error("route '{pattern}' expects {expected} for '{param}', got {actual}")]
    TypeMismatch {
        pattern: String,
        param: String,
        expected: ParamType,
        actual: ParamType,
    },

    #[error("route '{pattern}' was given an empty value for '{param}'")]
    EmptyValue { pattern: String, param: String },

    #[error("route '{pattern}' was given a value containing '/' for '{param}'")]
    SlashInSegment { pattern: String, param: String },

    #[error("route '{pattern}' was given negative value {value} for '{param}'")]
    NegativeNumber {
        pattern: String,
        param: String,
        value: i64,
    },
}

/// Substitute `args` into `route`'s pattern, producing a literal path.
///
/// The result matches `route` again with the same captures. Catch-all values
/// lose any leading or trailing `/` first, since the matcher never captures them.
pub fn build_path(route: &RouteDefinition, args: &TypedParams) -> Result<String, BuildError> {
    if route.segments.is_empty() {
        return Ok("/".to_string());
    }

    let mut path = String::new();
    for segment in &route.segments {
        path.push('/');
        match segment {
            Segment::Static { text } => path.push_str(text),
            Segment::Param { name, ty } => {
                let value = lookup(route, name, *ty, args)?;
                if value.contains('/') {
                    return Err(BuildError::SlashInSegment {
                        pattern: route.pattern.clone(),
                        param: name.clone(),
                    });
                }
                path.push_str(&value);
            }
            Segment::CatchAll { name } => {
                let value = lookup(route, name, ParamType::String, args)?;
                path.push_str(value.trim_matches('/'));
            }
        }
    }
    Ok(path)
}

fn lookup(
    route: &RouteDefinition,
    name: &str,
    ty: ParamType,
    args: &TypedParams,
) -> Result<String, BuildError> {
    let value = args.get(name).ok_or_else(|| BuildError::MissingParam {
        pattern: route.pattern.clone(),
        param: name.to_string(),
    })?;
    if value.param_type() != ty {
        return Err(BuildError::TypeMismatch {
            pattern: route.pattern.clone(),
            param: name.to_string(),
            expected: ty,
            actual: value.param_type(),
        });
    }

    let negative = match value {
        TypedValue::Int(n) => (*n < 0).then_some(*n as i64),
        TypedValue::Int64(n) => (*n < 0).then_some(*n),
        _ => None,
    };
    if let Some(value) = negative {
        return Err(BuildError::NegativeNumber {
            pattern: route.pattern.clone(),
            param: name.to_string(),
            value,
        });
    }

    let rendered = value.to_string();
    let empty = match value {
        TypedValue::Str(s) => s.trim_matches('/').is_empty(),
        _ => false,
    };
    if empty {
        return Err(BuildError::EmptyValue {
            pattern: route.pattern.clone(),
            param: name.to_string(),
        });
    }
    Ok(rendered)
}
