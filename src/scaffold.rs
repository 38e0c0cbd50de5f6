//! `create` コマンド: ルートディレクトリとひな形ファイルを作る
//!
//! 既存のファイルは上書きしない。親の集約モジュールへの取り込みは次の `update` で行う。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::aggregator::render_aggregator;
use crate::block::render_block;
use crate::config::{Config, is_identifier};
use crate::error::{Error, Result};
use crate::model::{RouteModule, RouteNode};
use crate::tree::AGGREGATOR_FILE;
use crate::writer::write_atomic;

/// base モジュールのひな形
pub fn base_module_template(router_name: &str) -> Result<String> {
    let block = render_block(&[]).map_err(|e| Error::config(e.to_string()))?;
    Ok(format!(
        r#"from fastapi import APIRouter

{block}
{router_name} = APIRouter()


@{router_name}.get("/")
async def default_response() -> dict:
    return {{"message": "Default response for this route."}}
"#
    ))
}

/// `route_path` (例: `/apikey/v2`) の各階層に、足りないディレクトリ・base モジュール・
/// 集約モジュールを作る。作ったファイルのパスを返す。
pub fn create_route(routes_dir: &Path, route_path: &str, config: &Config) -> Result<Vec<PathBuf>> {
    let segments: Vec<&str> = route_path
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return Err(Error::config("route path must contain at least one segment"));
    }
    if let Some(bad) = segments.iter().find(|s| !is_identifier(s)) {
        return Err(Error::config(format!(
            "segment {bad:?} is not a valid Python identifier"
        )));
    }

    let base_file = format!("{}.py", config.base_module);
    let base_text = base_module_template(&config.router_name)?;
    let mut created = Vec::new();
    let mut dir = routes_dir.to_path_buf();

    for seg in segments {
        dir.push(seg);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            info!(dir = %dir.display(), "created directory");
        }

        let base = dir.join(&base_file);
        if create_file(&base, &base_text)? {
            created.push(base.clone());
        }

        let init = dir.join(AGGREGATOR_FILE);
        let mut node = RouteNode::new(seg, "", dir.clone());
        node.modules.push(RouteModule {
            name: config.base_module.clone(),
            path: base,
            prefix: String::new(),
            source: String::new(),
            endpoints: Vec::new(),
        });
        if create_file(&init, &render_aggregator(&node, &config.router_name)?)? {
            created.push(init);
        }
    }
    Ok(created)
}

/// 無ければ作る。作ったら true。
fn create_file(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_atomic(path, content)?;
    info!(file = %path.display(), "created file");
    Ok(true)
}
