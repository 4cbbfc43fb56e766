//! Rust source generation (`routes.rs`).
//!
//! The generated module is self-contained apart from the `uuid` crate, which
//! it references only when some route declares a `uuid` parameter.

use std::collections::HashSet;
use std::fmt::Write;

use crate::emit::decoders::{param_shapes, ParamShape};
use crate::routing::definition::{ParamType, RouteDefinition};
use crate::routing::grammar::Segment;
use crate::routing::matcher::CompiledRoutes;

const HEADER: &str = "// @generated by route-compiler. Do not edit.";

/// Render the generated module for `compiled`.
pub fn render_module(compiled: &CompiledRoutes) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let routes = compiled.routes();

    writeln!(out, "{}", HEADER)?;
    writeln!(out, "//")?;
    writeln!(out, "// Routes: {}", routes.len())?;
    writeln!(out)?;
    writeln!(out, "use std::collections::BTreeMap;")?;
    writeln!(out)?;
    write_support(&mut out)?;

    let mut type_names = Names::default();
    for (shape, users) in param_shapes(compiled) {
        let name = type_names.claim(shape.type_name());
        write_shape(&mut out, &name, &shape, &users)?;
    }

    let mut fn_names = Names::default();
    for (route, _) in &routes {
        let name = fn_names.claim(format!("{}_path", route.handler.ident()));
        write_builder(&mut out, &name, route)?;
    }

    writeln!(out, "/// Every route as `(pattern, handler id)`, sorted by pattern.")?;
    writeln!(out, "#[allow(dead_code)]")?;
    writeln!(out, "pub const ROUTES: &[(&str, &str)] = &[")?;
    for (route, _) in &routes {
        writeln!(
            out,
            "    ({:?}, {:?}),",
            route.pattern,
            route.handler.as_str()
        )?;
    }
    writeln!(out, "];")?;
    Ok(out)
}

fn write_support(out: &mut String) -> std::fmt::Result {
    writeln!(out, "/// A captured parameter that could not be decoded.")?;
    writeln!(out, "#[derive(Debug, Clone, PartialEq, Eq)]")?;
    writeln!(out, "pub struct DecodeError {{")?;
    writeln!(out, "    pub param: &'static str,")?;
    writeln!(out, "    pub value: Option<String>,")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "impl std::fmt::Display for DecodeError {{")?;
    writeln!(
        out,
        "    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {{"
    )?;
    writeln!(out, "        match &self.value {{")?;
    writeln!(
        out,
        "            Some(value) => write!(f, \"parameter '{{}}' cannot decode '{{}}'\", self.param, value),"
    )?;
    writeln!(
        out,
        "            None => write!(f, \"parameter '{{}}' was not captured\", self.param),"
    )?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "impl std::error::Error for DecodeError {{}}")?;
    writeln!(out)?;
    writeln!(out, "#[allow(dead_code)]")?;
    writeln!(
        out,
        "fn parse_capture<T: std::str::FromStr>(raw: &BTreeMap<String, String>, param: &'static str) -> Result<T, DecodeError> {{"
    )?;
    writeln!(
        out,
        "    let value = raw.get(param).ok_or(DecodeError {{ param, value: None }})?;"
    )?;
    writeln!(
        out,
        "    value.parse().map_err(|_| DecodeError {{ param, value: Some(value.clone()) }})"
    )?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn write_shape(
    out: &mut String,
    name: &str,
    shape: &ParamShape,
    users: &[&RouteDefinition],
) -> std::fmt::Result {
    writeln!(out, "/// Parameters of:")?;
    for route in users {
        writeln!(out, "/// - `{}`", route.pattern)?;
    }
    writeln!(out, "#[allow(dead_code, non_snake_case)]")?;
    writeln!(out, "#[derive(Debug, Clone, PartialEq, Eq)]")?;
    writeln!(out, "pub struct {} {{", name)?;
    for field in shape.fields() {
        writeln!(
            out,
            "    pub {}: {},",
            rust_ident(&field.name),
            owned_type(field.ty)
        )?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "#[allow(dead_code)]")?;
    writeln!(out, "impl {} {{", name)?;
    writeln!(
        out,
        "    pub fn decode(raw: &BTreeMap<String, String>) -> Result<Self, DecodeError> {{"
    )?;
    writeln!(out, "        Ok(Self {{")?;
    for field in shape.fields() {
        writeln!(
            out,
            "            {}: parse_capture(raw, {:?})?,",
            rust_ident(&field.name),
            field.name
        )?;
    }
    writeln!(out, "        }})")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

fn write_builder(out: &mut String, name: &str, route: &RouteDefinition) -> std::fmt::Result {
    let mut args = Vec::new();
    let mut template = String::new();
    let mut values = Vec::new();
    let mut checks = Vec::new();

    for segment in &route.segments {
        template.push('/');
        match segment {
            Segment::Static { text } => {
                template.push_str(&text.replace('{', "{{").replace('}', "}}"));
            }
            Segment::Param { name, ty } => {
                let ident = rust_ident(name);
                args.push(format!("{}: {}", ident, arg_type(*ty)));
                if matches!(ty, ParamType::Int | ParamType::Int64) {
                    checks.push(format!(
                        "debug_assert!({} >= 0, \"{} must not be negative\");",
                        ident, name
                    ));
                }
                template.push_str("{}");
                values.push(ident);
            }
            Segment::CatchAll { name } => {
                let ident = rust_ident(name);
                args.push(format!("{}: &str", ident));
                template.push_str("{}");
                values.push(format!("{}.trim_matches('/')", ident));
            }
        }
    }

    writeln!(out, "/// `{}`", route.pattern)?;
    writeln!(out, "#[allow(dead_code, non_snake_case)]")?;
    writeln!(out, "pub fn {}({}) -> String {{", name, args.join(", "))?;
    for check in &checks {
        writeln!(out, "    {}", check)?;
    }
    if values.is_empty() {
        let literal = if template.is_empty() {
            "/".to_string()
        } else {
            template.replace("{{", "{").replace("}}", "}")
        };
        writeln!(out, "    String::from({:?})", literal)?;
    } else {
        writeln!(out, "    format!({:?}, {})", template, values.join(", "))?;
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

fn owned_type(ty: ParamType) -> &'static str {
    match ty {
        ParamType::String => "String",
        ParamType::Int => "isize",
        ParamType::Int64 => "i64",
        ParamType::Uuid => "uuid::Uuid",
    }
}

fn arg_type(ty: ParamType) -> &'static str {
    match ty {
        ParamType::String => "&str",
        ParamType::Int => "isize",
        ParamType::Int64 => "i64",
        ParamType::Uuid => "&uuid::Uuid",
    }
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "do", "dyn", "else", "enum",
    "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield", "abstract", "become",
];

/// Parameter names are already `[A-Za-z_][A-Za-z0-9_]*`; only keywords need care.
fn rust_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{}_", name),
        _ if KEYWORDS.contains(&name) => format!("r#{}", name),
        _ => name.to_string(),
    }
}

/// Hands out unique names, suffixing repeats with `_2`, `_3`, ...
#[derive(Default)]
struct Names {
    taken: HashSet<String>,
}

impl Names {
    fn claim(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
