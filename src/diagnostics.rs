//! 実行中に収集して最後に報告する非致命の診断

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::Method;
use crate::parser::ParseWarning;

/// 処理は続行するが報告すべき事象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// 宣言を抽出できず除外した
    Parse { file: PathBuf, warning: ParseWarning },
    /// Python の識別子にならない名前のため取り込めないモジュール・ディレクトリ
    InvalidName { path: PathBuf },
    /// 同名の子ディレクトリ (パッケージ) に隠されるモジュール
    ShadowedModule { file: PathBuf },
    /// マーカー領域が壊れているためモジュールを書き換えなかった
    MalformedBlock { file: PathBuf, reason: String },
    /// UTF-8 でないルートモジュール。そのディレクトリは書き換えない。
    Undecodable { file: PathBuf },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Parse { file, warning } => write!(f, "{}: {warning}", file.display()),
            Warning::InvalidName { path } => write!(
                f,
                "{}: name is not a valid Python identifier, skipped",
                path.display()
            ),
            Warning::ShadowedModule { file } => write!(
                f,
                "{}: shadowed by a package directory of the same name, skipped",
                file.display()
            ),
            Warning::MalformedBlock { file, reason } => {
                write!(f, "{}: {reason}, module left untouched", file.display())
            }
            Warning::Undecodable { file } => write!(
                f,
                "{}: route module is not valid UTF-8, directory left untouched",
                file.display()
            ),
        }
    }
}

/// 衝突した宣言の場所
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub source_file: String,
    pub line: usize,
    pub handler: String,
}

/// ツリー全体で (method, full_path) が重複している
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub method: Method,
    pub full_path: String,
    /// 宣言順 (ツリーの前順)
    pub sites: Vec<Site>,
}

impl Conflict {
    pub fn involves(&self, source_file: &str) -> bool {
        self.sites.iter().any(|s| s.source_file == source_file)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} is declared {} times:", self.method, self.full_path, self.sites.len())?;
        for site in &self.sites {
            write!(f, " {}:{} ({})", site.source_file, site.line, site.handler)?;
        }
        Ok(())
    }
}

/// ノード単位の I/O 失敗 (そのノードだけ処理を打ち切る)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFailure {
    pub path: PathBuf,
    pub message: String,
}

impl IoFailure {
    pub fn new(path: impl AsRef<Path>, err: impl fmt::Display) -> Self {
        IoFailure {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for IoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
