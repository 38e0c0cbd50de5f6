// src/error.rs
//! 実行全体を中断させる致命的エラー
//!
//! 宣言単位の警告・ルート衝突・ノード単位の I/O 失敗はここには含めず、
//! `sync::SyncReport` に収集して最後にまとめて報告する。

use std::path::{Path, PathBuf};

/// routesync の Result 型
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 書き込み前に検出される設定・対象パスの誤り
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize endpoint data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
