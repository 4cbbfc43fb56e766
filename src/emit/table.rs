//! Introspection table (`routes.json`).

use serde::{Deserialize, Serialize};

use crate::routing::definition::{ParamType, RouteKind};
use crate::routing::matcher::{CompiledRoutes, SpecialRoutes};

/// Every compiled route, sorted by path, plus the special slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTable {
    pub routes: Vec<RouteRow>,
    pub not_found: Option<String>,
    pub server_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRow {
    pub path: String,
    pub handler_id: String,
    pub kind: RouteKind,
    pub source: String,
    pub params: Vec<ParamRow>,
    pub middleware_refs: Vec<String>,
    pub layout_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamRow {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub catch_all: bool,
}

impl RouteTable {
    pub fn from_compiled(compiled: &CompiledRoutes) -> Self {
        let routes = compiled
            .routes()
            .into_iter()
            .map(|(route, chain)| RouteRow {
                path: route.pattern.clone(),
                handler_id: route.handler.to_string(),
                kind: route.kind,
                source: route.source.clone(),
                params: route
                    .params
                    .iter()
                    .map(|p| ParamRow {
                        name: p.name.clone(),
                        ty: p.ty,
                        catch_all: p.catch_all,
                    })
                    .collect(),
                middleware_refs: chain.middleware.clone(),
                layout_refs: chain.layouts.clone(),
            })
            .collect();

        let SpecialRoutes {
            not_found,
            server_error,
        } = compiled.specials().clone();

        Self {
            routes,
            not_found,
            server_error,
        }
    }
}
