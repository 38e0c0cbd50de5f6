//! プロジェクト全体のエンドポイントレジストリ (`endpoints.json`)
//!
//! 毎回ツリーから丸ごと作り直す生成物。部分的なマージはしない。

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::block::pretty_json;
use crate::error::Result;
use crate::model::{Method, RouteNode};
use crate::writer::write_if_changed;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub method: Method,
    pub handler: String,
    pub source_file: String,
    pub line: usize,
}

/// full_path → そのパスに登録されたエンドポイント
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EndpointRegistry {
    routes: BTreeMap<String, Vec<RegistryEntry>>,
}

impl EndpointRegistry {
    /// 前順 (ノードのモジュール → 子をセグメント順) で平坦化する
    pub fn from_tree(root: &RouteNode) -> Self {
        let mut routes: BTreeMap<String, Vec<RegistryEntry>> = BTreeMap::new();
        for endpoint in root.all_endpoints() {
            routes
                .entry(endpoint.full_path.clone())
                .or_default()
                .push(RegistryEntry {
                    method: endpoint.method,
                    handler: endpoint.handler.clone(),
                    source_file: endpoint.source_file.clone(),
                    line: endpoint.line,
                });
        }
        EndpointRegistry { routes }
    }

    pub fn get(&self, full_path: &str) -> Option<&[RegistryEntry]> {
        self.routes.get(full_path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 4 スペースインデントの JSON (末尾改行つき)
    pub fn to_json(&self) -> Result<String> {
        let mut text = pretty_json(self)?;
        text.push('\n');
        Ok(text)
    }

    /// 内容が変わったときだけ書き込む。書き込んだら true。
    pub fn persist(&self, path: &Path) -> Result<bool> {
        write_if_changed(path, &self.to_json()?)
    }
}
