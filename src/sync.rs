//! 同期ドライバ
//!
//! `Scan → Extract → Synchronize (子が先) → Persist → Report` の順に進める。
//! 宣言の警告・ルート衝突・ノード単位の I/O 失敗はその場で止めずに集め、
//! 最後に `SyncReport` として返す。書き込み前に分かる設定エラーだけが `Err`。

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::aggregator::render_aggregator;
use crate::block::sync_block;
use crate::config::Config;
use crate::diagnostics::{Conflict, IoFailure, Warning};
use crate::error::Result;
use crate::model::RouteNode;
use crate::parser::extract_endpoints;
use crate::registry::EndpointRegistry;
use crate::resolver::{Scope, resolve_project_root, resolve_scope};
use crate::tree::{AGGREGATOR_FILE, TreeBuilder, detect_conflicts, relative_display};
use crate::writer::write_if_changed;

/// `update` の実行オプション
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// routes ディレクトリ内のサブツリー (例: `/api/v1`)。`None` ならツリー全体。
    pub scope: Option<String>,
    /// false ならレジストリを書かない (他の同期はすべて通常どおり行う)
    pub persist_registry: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            scope: None,
            persist_registry: true,
        }
    }
}

/// 実行の最終状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    SuccessWithWarnings,
    /// ルート衝突かノード単位の I/O 失敗があった。影響の無い書き込みは適用済み。
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStatus {
    Written,
    Unchanged,
    Disabled,
    /// 衝突があるため前回のファイルを残した
    SkippedForConflicts,
    Failed,
}

#[derive(Debug)]
pub struct SyncReport {
    pub modules_scanned: usize,
    pub endpoints_found: usize,
    pub files_rewritten: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
    pub conflicts: Vec<Conflict>,
    pub io_failures: Vec<IoFailure>,
    pub registry: RegistryStatus,
    pub registry_path: PathBuf,
}

impl SyncReport {
    pub fn outcome(&self) -> Outcome {
        if !self.conflicts.is_empty() || !self.io_failures.is_empty() {
            Outcome::Failed
        } else if !self.warnings.is_empty() {
            Outcome::SuccessWithWarnings
        } else {
            Outcome::Success
        }
    }

    /// 人が読むための要約
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "scanned {} modules, found {} endpoints",
            self.modules_scanned, self.endpoints_found
        );
        let _ = writeln!(out, "rewrote {} files", self.files_rewritten.len());
        for file in &self.files_rewritten {
            let _ = writeln!(out, "  {}", file.display());
        }
        let registry = match self.registry {
            RegistryStatus::Written => "written",
            RegistryStatus::Unchanged => "unchanged",
            RegistryStatus::Disabled => "disabled",
            RegistryStatus::SkippedForConflicts => "not written (conflicts)",
            RegistryStatus::Failed => "write failed",
        };
        let _ = writeln!(out, "registry {}: {registry}", self.registry_path.display());
        if !self.warnings.is_empty() {
            let _ = writeln!(out, "warnings: {}", self.warnings.len());
            for w in &self.warnings {
                let _ = writeln!(out, "  {w}");
            }
        }
        if !self.conflicts.is_empty() {
            let _ = writeln!(out, "conflicts: {}", self.conflicts.len());
            for c in &self.conflicts {
                let _ = writeln!(out, "  {c}");
            }
        }
        if !self.io_failures.is_empty() {
            let _ = writeln!(out, "I/O failures: {}", self.io_failures.len());
            for f in &self.io_failures {
                let _ = writeln!(out, "  {f}");
            }
        }
        out.truncate(out.trim_end().len());
        out
    }
}

/// 1 プロジェクトに対する同期処理
pub struct Synchronizer {
    project_root: PathBuf,
    routes_dir: PathBuf,
    config: Config,
}

impl Synchronizer {
    /// `project_root/routesync.toml` を読み込んで作る
    pub fn open(project_root: &Path) -> Result<Self> {
        let project_root = resolve_project_root(project_root)?;
        let config = Config::load(&project_root)?;
        Self::new(&project_root, config)
    }

    pub fn new(project_root: &Path, config: Config) -> Result<Self> {
        let project_root = resolve_project_root(project_root)?;
        let routes_dir = project_root.join(&config.routes_dir);
        Ok(Synchronizer {
            project_root,
            routes_dir,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes_dir(&self) -> &Path {
        &self.routes_dir
    }

    pub fn registry_path(&self) -> PathBuf {
        self.project_root.join(&self.config.registry_file)
    }

    pub fn update(&self, options: &SyncOptions) -> Result<SyncReport> {
        // 1) Scan / Extract: ツリー全体を組み立てる (設定エラーはここで返る)
        let mut tree =
            TreeBuilder::new(&self.project_root, &self.routes_dir, &self.config).build()?;
        let scope = resolve_scope(&self.routes_dir, options.scope.as_deref())?;
        for w in &tree.warnings {
            warn!("{w}");
        }

        // 2) 衝突検出はツリー全体が揃ってから
        let conflicts = detect_conflicts(&tree.root);
        for c in &conflicts {
            error!("route conflict: {c}");
        }

        let mut report = SyncReport {
            modules_scanned: tree.root.module_count(),
            endpoints_found: tree.root.endpoint_count(),
            files_rewritten: Vec::new(),
            warnings: std::mem::take(&mut tree.warnings),
            conflicts,
            io_failures: std::mem::take(&mut tree.io_failures),
            registry: RegistryStatus::Disabled,
            registry_path: PathBuf::from(&self.config.registry_file),
        };

        // 3) 子から先に書き換える
        self.sync_node(&mut tree.root, &scope, &mut report);

        // 4) レジストリ
        report.registry = self.persist(&tree.root, options, &mut report);

        info!(
            modules = report.modules_scanned,
            endpoints = report.endpoints_found,
            rewritten = report.files_rewritten.len(),
            "synchronization finished: {:?}",
            report.outcome()
        );
        Ok(report)
    }

    fn sync_node(&self, node: &mut RouteNode, scope: &Scope, report: &mut SyncReport) {
        for child in node.children.values_mut() {
            self.sync_node(child, scope, report);
        }
        if !scope.contains(&node.full_path) {
            return;
        }
        if node.tainted {
            warn!(dir = %node.dir.display(), "skipping node with an unreadable module");
            return;
        }

        let router_name = &self.config.router_name;
        for module in &mut node.modules {
            let rel = relative_display(&self.project_root, &module.path);
            if report.conflicts.iter().any(|c| c.involves(&rel)) {
                debug!(file = %rel, "module involved in a conflict, left untouched");
                continue;
            }

            let text = match sync_block(&module.source, &module.endpoints) {
                Ok(text) => text,
                Err(e) => {
                    let warning = Warning::MalformedBlock {
                        file: PathBuf::from(&rel),
                        reason: e.to_string(),
                    };
                    warn!("{warning}");
                    report.warnings.push(warning);
                    continue;
                }
            };
            if text == module.source {
                continue;
            }

            match write_if_changed(&module.path, &text) {
                Ok(written) => {
                    if written {
                        info!(file = %rel, "updated endpoint block");
                        report.files_rewritten.push(PathBuf::from(&rel));
                    }
                    // マーカー領域の大きさが変わると後続の行番号がずれる
                    let fresh = extract_endpoints(&text, router_name);
                    if fresh.endpoints.len() == module.endpoints.len() {
                        for (endpoint, moved) in module.endpoints.iter_mut().zip(fresh.endpoints) {
                            endpoint.line = moved.line;
                        }
                    }
                    module.source = text;
                }
                Err(e) => {
                    error!(file = %rel, "{e}");
                    report.io_failures.push(IoFailure::new(&module.path, &e));
                    return;
                }
            }
        }

        let init = node.dir.join(AGGREGATOR_FILE);
        let rel = relative_display(&self.project_root, &init);
        let written =
            render_aggregator(node, router_name).and_then(|text| write_if_changed(&init, &text));
        match written {
            Ok(true) => {
                info!(file = %rel, "updated aggregator");
                report.files_rewritten.push(PathBuf::from(rel));
            }
            Ok(false) => {}
            Err(e) => {
                error!(file = %rel, "{e}");
                report.io_failures.push(IoFailure::new(&init, &e));
            }
        }
    }

    fn persist(&self, root: &RouteNode, options: &SyncOptions, report: &mut SyncReport) -> RegistryStatus {
        if !options.persist_registry || !self.config.persist_registry {
            return RegistryStatus::Disabled;
        }
        if !report.conflicts.is_empty() {
            warn!("registry not written because of route conflicts");
            return RegistryStatus::SkippedForConflicts;
        }
        let path = self.registry_path();
        match EndpointRegistry::from_tree(root).persist(&path) {
            Ok(true) => {
                info!(file = %path.display(), "updated endpoint registry");
                report.files_rewritten.push(report.registry_path.clone());
                RegistryStatus::Written
            }
            Ok(false) => RegistryStatus::Unchanged,
            Err(e) => {
                error!("{e}");
                report.io_failures.push(IoFailure::new(&path, &e));
                RegistryStatus::Failed
            }
        }
    }
}
