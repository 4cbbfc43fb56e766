//! Path pattern grammar.
//!
//! # Responsibilities
//! - Split a pattern into `/`-delimited segments
//! - Classify each segment as static text, typed parameter, or catch-all
//! - Reject malformed patterns with a `ParseError` scoped to that pattern
//!
//! # Grammar
//! ```text
//! pattern   = "/" [ segment *( "/" segment ) ] [ "/" ]
//! segment   = static | param | catch-all
//! static    = 1*( any char except "/" "[" "]" )
//! param     = "[" name [ ":" type ] "]"
//! catch-all = "[..." name "]"          ; must be the last segment
//! type      = "string" | "int" | "int64" | "uuid"
//! ```
//!
//! # Design Decisions
//! - A trailing `/` is not significant: `/foo/` parses like `/foo`
//! - Nothing may follow a catch-all; such patterns are rejected here
//!   rather than at tree construction
//! - Parameter names must be usable as identifiers in generated code

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::routing::definition::ParamType;

/// One parsed unit of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Literal text that must match exactly.
    Static { text: String },
    /// A named parameter consuming one path segment.
    Param { name: String, ty: ParamType },
    /// A terminal parameter consuming the rest of the path.
    CatchAll { name: String },
}

impl Segment {
    /// The parameter name, if this segment binds one.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Static { .. } => None,
            Segment::Param { name, .. } | Segment::CatchAll { name } => Some(name),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static { text } => f.write_str(text),
            Segment::Param { name, ty: ParamType::String } => write!(f, "[{}]", name),
            Segment::Param { name, ty } => write!(f, "[{}:{}]", name, ty),
            Segment::CatchAll { name } => write!(f, "[...{}]", name),
        }
    }
}

/// Malformed path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("pattern '{pattern}' must start with '/'")]
    MissingLeadingSlash { pattern: String },

    #[error("pattern '{pattern}' has an unterminated bracket in segment '{segment}'")]
    UnterminatedBracket { pattern: String, segment: String },

    #[error("pattern '{pattern}' mixes brackets with literal text in segment '{segment}'")]
    MixedSegment { pattern: String, segment: String },

    #[error("pattern '{pattern}' contains an empty segment")]
    EmptySegment { pattern: String },

    #[error("pattern '{pattern}' declares a parameter without a name")]
    EmptyParamName { pattern: String },

    #[error("pattern '{pattern}' declares invalid parameter name '{name}'")]
    InvalidParamName { pattern: String, name: String },

    #[error("pattern '{pattern}' uses unknown parameter type '{ty}' for '{name}'")]
    UnknownParamType {
        pattern: String,
        name: String,
        ty: String,
    },

    #[error("pattern '{pattern}' declares parameter '{name}' more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("pattern '{pattern}' gives catch-all '{name}' a type; catch-alls are always strings")]
    TypedCatchAll { pattern: String, name: String },

    #[error("pattern '{pattern}' has segments after catch-all '{name}'")]
    SegmentAfterCatchAll { pattern: String, name: String },
}

impl ParseError {
    /// The pattern that failed to parse.
    pub fn pattern(&self) -> &str {
        match self {
            ParseError::MissingLeadingSlash { pattern }
            | ParseError::UnterminatedBracket { pattern, .. }
            | ParseError::MixedSegment { pattern, .. }
            | ParseError::EmptySegment { pattern }
            | ParseError::EmptyParamName { pattern }
            | ParseError::InvalidParamName { pattern, .. }
            | ParseError::UnknownParamType { pattern, .. }
            | ParseError::DuplicateParam { pattern, .. }
            | ParseError::TypedCatchAll { pattern, .. }
            | ParseError::SegmentAfterCatchAll { pattern, .. } => pattern,
        }
    }
}

/// Parse a path pattern into its ordered segments.
///
/// The root pattern `/` yields an empty segment list.
pub fn parse(pattern: &str) -> Result<Vec<Segment>, ParseError> {
    if !pattern.starts_with('/') {
        return Err(ParseError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }

    let body = &pattern[1..];
    let body = body.strip_suffix('/').unwrap_or(body);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments: Vec<Segment> = Vec::new();
    for raw in body.split('/') {
        if let Some(Segment::CatchAll { name }) = segments.last() {
            return Err(ParseError::SegmentAfterCatchAll {
                pattern: pattern.to_string(),
                name: name.clone(),
            });
        }

        let segment = parse_segment(pattern, raw)?;
        if let Some(name) = segment.param_name() {
            if segments.iter().any(|s| s.param_name() == Some(name)) {
                return Err(ParseError::DuplicateParam {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
        }
        segments.push(segment);
    }

    Ok(segments)
}

/// Render segments back into canonical pattern form.
pub fn render(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().fold(String::new(), |mut acc, s| {
        acc.push('/');
        acc.push_str(&s.to_string());
        acc
    })
}

fn parse_segment(pattern: &str, raw: &str) -> Result<Segment, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::EmptySegment {
            pattern: pattern.to_string(),
        });
    }

    let Some(after_open) = raw.strip_prefix('[') else {
        return match (raw.contains('['), raw.contains(']')) {
            (false, false) => Ok(Segment::Static {
                text: raw.to_string(),
            }),
            (true, false) => Err(unterminated(pattern, raw)),
            _ => Err(mixed(pattern, raw)),
        };
    };

    let Some(inner) = after_open.strip_suffix(']') else {
        return if raw.contains(']') {
            Err(mixed(pattern, raw))
        } else {
            Err(unterminated(pattern, raw))
        };
    };
    if inner.contains('[') || inner.contains(']') {
        return Err(mixed(pattern, raw));
    }

    if let Some(name) = inner.strip_prefix("...") {
        if let Some((name, _)) = name.split_once(':') {
            return Err(ParseError::TypedCatchAll {
                pattern: pattern.to_string(),
                name: name.to_string(),
            });
        }
        validate_name(pattern, name)?;
        return Ok(Segment::CatchAll {
            name: name.to_string(),
        });
    }

    let (name, ty) = match inner.split_once(':') {
        Some((name, tag)) => {
            let ty = ParamType::parse(tag).ok_or_else(|| ParseError::UnknownParamType {
                pattern: pattern.to_string(),
                name: name.to_string(),
                ty: tag.to_string(),
            })?;
            (name, ty)
        }
        None => (inner, ParamType::String),
    };
    validate_name(pattern, name)?;

    Ok(Segment::Param {
        name: name.to_string(),
        ty,
    })
}

fn validate_name(pattern: &str, name: &str) -> Result<(), ParseError> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err(ParseError::EmptyParamName {
            pattern: pattern.to_string(),
        }),
        Some(first)
            if first.is_ascii_digit()
                || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            Err(ParseError::InvalidParamName {
                pattern: pattern.to_string(),
                name: name.to_string(),
            })
        }
        Some(_) => Ok(()),
    }
}

fn unterminated(pattern: &str, segment: &str) -> ParseError {
    ParseError::UnterminatedBracket {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    }
}

fn mixed(pattern: &str, segment: &str) -> ParseError {
    ParseError::MixedSegment {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    }
}
