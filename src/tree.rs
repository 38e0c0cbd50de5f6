//! routes ディレクトリを走査してルートツリーを組み立てる。
//!
//! ツリーは実行ごとに一から作り直し、永続化はしない。

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::{Config, is_identifier};
use crate::diagnostics::{Conflict, IoFailure, Site, Warning};
use crate::error::{Error, Result};
use crate::model::{Method, RouteModule, RouteNode, mount_path};
use crate::parser::{ModuleSource, declares_router, parse_endpoints_in_file};

/// 集約モジュールのファイル名。ルートモジュールとしては扱わない。
pub const AGGREGATOR_FILE: &str = "__init__.py";

/// 組み立てたツリーと、その過程で集めた診断
#[derive(Debug)]
pub struct RouteTree {
    pub root: RouteNode,
    pub warnings: Vec<Warning>,
    pub io_failures: Vec<IoFailure>,
}

pub struct TreeBuilder<'a> {
    project_root: &'a Path,
    routes_dir: &'a Path,
    config: &'a Config,
}

impl<'a> TreeBuilder<'a> {
    /// `routes_dir` は絶対化済みであること
    pub fn new(project_root: &'a Path, routes_dir: &'a Path, config: &'a Config) -> Self {
        TreeBuilder {
            project_root,
            routes_dir,
            config,
        }
    }

    pub fn build(&self) -> Result<RouteTree> {
        if !self.routes_dir.is_dir() {
            return Err(Error::config(format!(
                "routes directory {} does not exist",
                self.routes_dir.display()
            )));
        }

        let mut root = RouteNode::new("", "/", self.routes_dir.to_path_buf());
        let mut warnings = Vec::new();
        let mut io_failures = Vec::new();
        let mut tainted: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut invalid_dirs: Vec<PathBuf> = Vec::new();

        // 1) ファイル名順に走査する (ファイルシステムの列挙順に依存させない)
        let walker = WalkDir::new(self.routes_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                if name.starts_with('.') || name == "__pycache__" {
                    return false;
                }
                if e.file_type().is_dir() && !is_identifier(&name) {
                    if contains_python(e.path()) {
                        invalid_dirs.push(e.path().to_path_buf());
                    }
                    return false;
                }
                true
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), "failed to walk routes directory: {err}");
                    if let Some(segments) = path.parent().and_then(|p| self.segments_of(p)) {
                        tainted.insert(segments);
                    }
                    io_failures.push(IoFailure::new(&path, &err));
                    continue;
                }
            };
            if !is_route_candidate(&entry) {
                continue;
            }

            let path = entry.path();
            let Some(segments) = path.parent().and_then(|p| self.segments_of(p)) else {
                continue;
            };
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            // 2) 抽出。読めなければそのノードだけを汚染扱いにする
            let (source, extraction) = match parse_endpoints_in_file(path, &self.config.router_name) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(file = %path.display(), "failed to read route module: {err}");
                    io_failures.push(IoFailure::new(path, &err));
                    tainted.insert(segments);
                    continue;
                }
            };
            if !extraction.has_declarations()
                && !declares_router(source.text(), &self.config.router_name)
            {
                debug!(file = %path.display(), "not a route module, ignored");
                continue;
            }
            if !is_identifier(&stem) {
                warnings.push(Warning::InvalidName {
                    path: path.to_path_buf(),
                });
                continue;
            }

            let rel_file = self.relative(path);
            // 書き戻せないルートモジュールがあるノードは丸ごと触らない
            let source = match source {
                ModuleSource::Utf8(text) => text,
                ModuleSource::Undecodable(_) => {
                    warnings.push(Warning::Undecodable {
                        file: PathBuf::from(&rel_file),
                    });
                    tainted.insert(segments);
                    continue;
                }
            };
            for warning in extraction.warnings {
                warnings.push(Warning::Parse {
                    file: PathBuf::from(&rel_file),
                    warning,
                });
            }

            // 3) ノードに取り付け、マウント先とプロヴェナンスを確定させる
            let node = node_mut(&mut root, &segments);
            let prefix = if stem == self.config.base_module {
                String::new()
            } else {
                format!("/{stem}")
            };
            let mut endpoints = extraction.endpoints;
            for endpoint in &mut endpoints {
                endpoint.full_path = mount_path(&[&node.full_path, &prefix, &endpoint.path]);
                endpoint.source_file = rel_file.clone();
            }
            debug!(file = %rel_file, endpoints = endpoints.len(), "scanned route module");

            node.modules.push(RouteModule {
                name: stem,
                path: path.to_path_buf(),
                prefix,
                source,
                endpoints,
            });
        }

        for dir in invalid_dirs {
            warnings.push(Warning::InvalidName { path: dir });
        }
        for segments in tainted {
            node_mut(&mut root, &segments).tainted = true;
        }
        finish(&mut root, &mut warnings);

        Ok(RouteTree {
            root,
            warnings,
            io_failures,
        })
    }

    fn segments_of(&self, dir: &Path) -> Option<Vec<String>> {
        let rel = dir.strip_prefix(self.routes_dir).ok()?;
        Some(
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect(),
        )
    }

    fn relative(&self, path: &Path) -> String {
        relative_display(self.project_root, path)
    }
}

/// プロジェクトルートからの相対パスを '/' 区切りで表す
pub fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_route_candidate(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.path().extension().is_some_and(|ext| ext == "py")
        && entry.file_name() != AGGREGATOR_FILE
}

fn contains_python(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "py"))
}

/// セグメント列のノードを (無ければ途中も含めて) 作って返す
fn node_mut<'t>(root: &'t mut RouteNode, segments: &[String]) -> &'t mut RouteNode {
    let mut node = root;
    for seg in segments {
        let full_path = mount_path(&[&node.full_path, seg]);
        let dir = node.dir.join(seg);
        node = node
            .children
            .entry(seg.clone())
            .or_insert_with(|| RouteNode::new(seg.clone(), full_path, dir));
    }
    node
}

/// base モジュールを先頭に並べ、子ディレクトリに隠されるモジュールを外す
fn finish(node: &mut RouteNode, warnings: &mut Vec<Warning>) {
    node.modules.sort_by(|a, b| {
        b.is_base()
            .cmp(&a.is_base())
            .then_with(|| a.name.cmp(&b.name))
    });

    let children = &node.children;
    node.modules.retain(|module| {
        if children.contains_key(&module.name) {
            warnings.push(Warning::ShadowedModule {
                file: module.path.clone(),
            });
            false
        } else {
            true
        }
    });

    for child in node.children.values_mut() {
        finish(child, warnings);
    }
}

/// ツリー全体を集めてから (method, full_path) の重複を検出する
pub fn detect_conflicts(root: &RouteNode) -> Vec<Conflict> {
    let mut seen: BTreeMap<(String, Method), Vec<Site>> = BTreeMap::new();
    for endpoint in root.all_endpoints() {
        seen.entry((endpoint.full_path.clone(), endpoint.method))
            .or_default()
            .push(Site {
                source_file: endpoint.source_file.clone(),
                line: endpoint.line,
                handler: endpoint.handler.clone(),
            });
    }
    seen.into_iter()
        .filter(|(_, sites)| sites.len() > 1)
        .map(|((full_path, method), sites)| Conflict {
            method,
            full_path,
            sites,
        })
        .collect()
}
