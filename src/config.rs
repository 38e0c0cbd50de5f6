//! プロジェクト設定 (`routesync.toml`)
//!
//! ファイルが無ければすべて既定値。CLI フラグはロード後に上書きする。

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "routesync.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// ルートモジュールを置くディレクトリ (プロジェクトルートからの相対)
    pub routes_dir: PathBuf,
    /// エンドポイントレジストリの出力先 (プロジェクトルートからの相対)
    pub registry_file: PathBuf,
    /// デコレータの対象になるルータ変数名
    pub router_name: String,
    /// prefix なしで取り込まれるモジュールの stem
    pub base_module: String,
    pub persist_registry: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            routes_dir: PathBuf::from("src").join("routes"),
            registry_file: PathBuf::from("endpoints.json"),
            router_name: "router".to_string(),
            base_module: "base".to_string(),
            persist_registry: true,
        }
    }
}

impl Config {
    /// `project_root/routesync.toml` を読む。無ければ既定値。
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let config: Config =
            toml::from_str(&text).map_err(|source| Error::Toml { path: path.clone(), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !is_identifier(&self.router_name) {
            return Err(Error::config(format!(
                "router_name {:?} is not a valid identifier",
                self.router_name
            )));
        }
        if !is_identifier(&self.base_module) {
            return Err(Error::config(format!(
                "base_module {:?} is not a valid identifier",
                self.base_module
            )));
        }
        Ok(())
    }
}

/// import 文やエイリアスに使えない Python の予約語
const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Python の識別子として使える名前か (モジュール名・ディレクトリ名の判定にも使う)
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_') && !KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Config::load(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "routes_dir = \"app/routes\"\npersist_registry = false\n",
        )
        .unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.routes_dir, PathBuf::from("app/routes"));
        assert!(!config.persist_registry);
        assert_eq!(config.router_name, "router");
    }

    #[test]
    fn unknown_keys_and_bad_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "route_dir = \"x\"\n").unwrap();
        assert!(matches!(Config::load(tmp.path()), Err(Error::Toml { .. })));

        fs::write(&path, "router_name = \"my-router\"\n").unwrap();
        assert!(matches!(Config::load(tmp.path()), Err(Error::Config(_))));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("users"));
        assert!(is_identifier("_v1"));
        assert!(!is_identifier("1users"));
        assert!(!is_identifier("{id}"));
        assert!(!is_identifier("v1-beta"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("import"));
        assert!(!is_identifier("class"));
        assert!(is_identifier("imports"));
        assert!(is_identifier("match"));
    }
}
