//! Route definitions and parameter specs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::routing::grammar::{self, ParseError, Segment};

/// Declared type of a path parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Int,
    Int64,
    Uuid,
}

impl ParamType {
    /// Parse a type tag as written in a pattern (`[id:int]`).
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ParamType::String),
            "int" => Some(ParamType::Int),
            "int64" => Some(ParamType::Int64),
            "uuid" => Some(ParamType::Uuid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Int64 => "int64",
            ParamType::Uuid => "uuid",
        }
    }

    /// Returns true if a raw path segment satisfies this type.
    ///
    /// - `int`/`int64`: one or more ASCII digits
    /// - `uuid`: exactly 36 characters with `-` at offsets 8, 13, 18, 23
    /// - `string`: any non-empty value
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ParamType::String => !value.is_empty(),
            ParamType::Int | ParamType::Int64 => {
                !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
            }
            ParamType::Uuid => {
                let bytes = value.as_bytes();
                bytes.len() == 36 && [8, 13, 18, 23].iter().all(|&i| bytes[i] == b'-')
            }
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a route renders a page or serves an API response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    #[default]
    Page,
    Api,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Page => "page",
            RouteKind::Api => "api",
        }
    }
}

/// Opaque reference to a handler symbol (e.g. `blog/[slug]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerRef(String);

impl HandlerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Snake-case identifier derived from the reference, for generated code.
    pub fn ident(&self) -> String {
        let mut ident = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            if c.is_ascii_alphanumeric() {
                ident.push(c.to_ascii_lowercase());
            } else if !ident.ends_with('_') {
                ident.push('_');
            }
        }
        let ident = ident.trim_matches('_');
        match ident.chars().next() {
            None => "root".to_string(),
            Some(c) if c.is_ascii_digit() => format!("r_{}", ident),
            Some(_) => ident.to_string(),
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A parameter bound by a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub catch_all: bool,
    /// Index of the segment that binds this parameter.
    pub position: usize,
}

/// A parsed, immutable route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Canonical pattern, e.g. `/blog/[slug]`.
    pub pattern: String,
    /// Declaring file, relative to the routes root.
    pub source: String,
    /// Declaring directory, relative to the routes root (`""` is the root).
    pub dir: String,
    pub handler: HandlerRef,
    pub kind: RouteKind,
    pub segments: Vec<Segment>,
    pub params: Vec<ParamSpec>,
}

impl RouteDefinition {
    /// Parse `pattern` and derive the parameter list.
    pub fn parse(
        pattern: &str,
        source: impl Into<String>,
        dir: impl Into<String>,
        handler: HandlerRef,
        kind: RouteKind,
    ) -> Result<Self, ParseError> {
        let segments = grammar::parse(pattern)?;
        let params = segments
            .iter()
            .enumerate()
            .filter_map(|(position, segment)| match segment {
                Segment::Static { .. } => None,
                Segment::Param { name, ty } => Some(ParamSpec {
                    name: name.clone(),
                    ty: *ty,
                    catch_all: false,
                    position,
                }),
                Segment::CatchAll { name } => Some(ParamSpec {
                    name: name.clone(),
                    ty: ParamType::String,
                    catch_all: true,
                    position,
                }),
            })
            .collect();

        Ok(Self {
            pattern: grammar::render(&segments),
            source: source.into(),
            dir: dir.into(),
            handler,
            kind,
            segments,
            params,
        })
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}
