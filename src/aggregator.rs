//! ディレクトリごとの集約モジュール (`__init__.py`) の生成
//!
//! 集約モジュールは丸ごと生成物として扱い、毎回ノードの子一覧から作り直す。
//! 末尾には配下のエンドポイント要約 `__endpoints__` を入れ子で置く:
//!
//! ```text
//! __endpoints__: dict = {
//!     "/": { "GET /": {...} },          # base モジュール
//!     "/items": { "POST /": {...} },    # 他のモジュール
//!     "/users": { "/": {...} }          # 子ディレクトリ (再帰)
//! }
//! ```

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::block::{EndpointTable, pretty_json};
use crate::error::Result;
use crate::model::RouteNode;

pub const GENERATED_HEADER: &str = "# This file is generated by routesync. Do not edit directly.";

/// 集約モジュールが取り込む子 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// 相対 import 名 (モジュールの stem か子ディレクトリ名)
    pub module: String,
    /// `include_router` の prefix。base モジュールは `None`。
    pub prefix: Option<String>,
}

impl Include {
    fn alias(&self, router_name: &str) -> String {
        format!("{}_{router_name}", self.module)
    }
}

/// 子の取り込み順: base モジュール → 他のモジュール (名前順) → 子ディレクトリ (名前順)
pub fn includes(node: &RouteNode) -> Vec<Include> {
    let modules = node.modules.iter().map(|m| Include {
        module: m.name.clone(),
        prefix: (!m.is_base()).then(|| m.prefix.clone()),
    });
    let children = node.children.values().map(|c| Include {
        module: c.segment.clone(),
        prefix: Some(format!("/{}", c.segment)),
    });
    modules.chain(children).collect()
}

/// ノード配下の要約。キーは取り込み時の prefix (base は `"/"`)。
struct DirectorySummary<'a>(&'a RouteNode);

impl Serialize for DirectorySummary<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let node = self.0;
        let mut map = serializer.serialize_map(Some(node.modules.len() + node.children.len()))?;
        for module in &node.modules {
            let key = if module.is_base() { "/" } else { module.prefix.as_str() };
            map.serialize_entry(key, &EndpointTable(&module.endpoints))?;
        }
        for (segment, child) in &node.children {
            map.serialize_entry(&format!("/{segment}"), &DirectorySummary(child))?;
        }
        map.end()
    }
}

/// 集約モジュール全文を生成する (副作用なし)
pub fn render_aggregator(node: &RouteNode, router_name: &str) -> Result<String> {
    let includes = includes(node);
    let mut lines = vec![
        GENERATED_HEADER.to_string(),
        "from fastapi import APIRouter".to_string(),
        String::new(),
    ];

    for include in &includes {
        lines.push(format!(
            "from .{} import {router_name} as {}",
            include.module,
            include.alias(router_name)
        ));
    }
    if !includes.is_empty() {
        lines.push(String::new());
    }

    lines.push(format!("{router_name} = APIRouter()"));
    for include in &includes {
        let alias = include.alias(router_name);
        match &include.prefix {
            Some(prefix) => lines.push(format!(
                "{router_name}.include_router({alias}, prefix=\"{prefix}\")"
            )),
            None => lines.push(format!("{router_name}.include_router({alias})")),
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "__endpoints__: dict = {}",
        pretty_json(&DirectorySummary(node))?
    ));

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Endpoint, Method, RouteModule};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn module(name: &str, base: bool) -> RouteModule {
        RouteModule {
            name: name.to_string(),
            path: PathBuf::from(format!("{name}.py")),
            prefix: if base { String::new() } else { format!("/{name}") },
            source: String::new(),
            endpoints: Vec::new(),
        }
    }

    fn sample() -> RouteNode {
        let mut node = RouteNode::new("v1", "/api/v1", PathBuf::from("routes/api/v1"));
        node.modules = vec![module("base", true), module("items", false)];
        for seg in ["users", "orders"] {
            node.children.insert(
                seg.to_string(),
                RouteNode::new(seg, format!("/api/v1/{seg}"), PathBuf::from(seg)),
            );
        }
        node
    }

    #[test]
    fn renders_imports_then_registrations() {
        let expected = r#"# This file is generated by routesync. Do not edit directly.
from fastapi import APIRouter

from .base import router as base_router
from .items import router as items_router
from .orders import router as orders_router
from .users import router as users_router

router = APIRouter()
router.include_router(base_router)
router.include_router(items_router, prefix="/items")
router.include_router(orders_router, prefix="/orders")
router.include_router(users_router, prefix="/users")

__endpoints__: dict = {
    "/": {},
    "/items": {},
    "/orders": {},
    "/users": {}
}
"#;
        assert_eq!(render_aggregator(&sample(), "router").unwrap(), expected);
    }

    #[test]
    fn summary_nests_child_directories() {
        let mut node = sample();
        node.modules[1].endpoints.push(Endpoint {
            method: Method::Post,
            path: "/".into(),
            full_path: "/api/v1/items".into(),
            handler: "create_item".into(),
            parameters: Vec::new(),
            source_file: "items.py".into(),
            line: 7,
        });
        let users = node.children.get_mut("users").unwrap();
        users.modules.push(module("base", true));
        users.children.insert(
            "admin".into(),
            RouteNode::new("admin", "/api/v1/users/admin", PathBuf::from("admin")),
        );

        let text = render_aggregator(&node, "router").unwrap();
        let summary = text.split_once("__endpoints__: dict = ").unwrap().1;
        let expected = r#"{
    "/": {},
    "/items": {
        "POST /": {
            "method": "POST",
            "path": "/",
            "handler": "create_item",
            "parameters": {}
        }
    },
    "/orders": {},
    "/users": {
        "/": {},
        "/admin": {}
    }
}
"#;
        assert_eq!(summary, expected);
    }

    #[test]
    fn removed_child_disappears() {
        let mut node = sample();
        node.children.remove("orders");
        let text = render_aggregator(&node, "router").unwrap();
        assert!(!text.contains("orders"));
        assert!(text.contains("users_router"));
    }

    #[test]
    fn empty_node_still_defines_router() {
        let node = RouteNode::new("", "/", PathBuf::from("routes"));
        assert_eq!(
            render_aggregator(&node, "api").unwrap(),
            format!(
                "{GENERATED_HEADER}\nfrom fastapi import APIRouter\n\napi = APIRouter()\n\n__endpoints__: dict = {{}}\n"
            )
        );
    }
}
