use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// 更新対象を絞り込むサブツリー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// routes ディレクトリからのセグメント列 (空ならツリー全体)
    pub segments: Vec<String>,
    /// サブツリーの絶対パス
    pub dir: PathBuf,
}

impl Scope {
    pub fn whole(routes_dir: &Path) -> Self {
        Scope {
            segments: Vec::new(),
            dir: routes_dir.to_path_buf(),
        }
    }

    /// `full_path` がこのスコープの内側にあるか
    pub fn contains(&self, full_path: &str) -> bool {
        let mut parts = full_path.split('/').filter(|s| !s.is_empty());
        self.segments.iter().all(|seg| parts.next() == Some(seg.as_str()))
    }
}

/// プロジェクトルートを絶対パス化する (存在しなければ設定エラー)
pub fn resolve_project_root(project_root: &Path) -> Result<PathBuf> {
    let abs = project_root
        .absolutize()
        .map_err(|e| Error::io(project_root, e))?
        .to_path_buf();
    if !abs.is_dir() {
        return Err(Error::config(format!(
            "project root {} is not a directory",
            abs.display()
        )));
    }
    Ok(abs)
}

/// `update` に渡されたルートパス (例: `/api/v1`) を routes ディレクトリ内の
/// サブツリーに解決する。
///
/// - `route_path`: 先頭・末尾の '/' は任意
/// - `routes_dir`: 絶対化済みの routes ディレクトリ
///
/// routes ディレクトリの外を指すもの、存在しないものは書き込み前の設定エラー。
pub fn resolve_scope(routes_dir: &Path, route_path: Option<&str>) -> Result<Scope> {
    let Some(route_path) = route_path else {
        return Ok(Scope::whole(routes_dir));
    };

    // 1) セグメントに分割し、'.' / '..' は拒否する
    let mut segments = Vec::new();
    for seg in route_path.split(['/', '\\']).map(str::trim).filter(|s| !s.is_empty()) {
        if seg == "." || seg == ".." {
            return Err(Error::config(format!(
                "route path {route_path:?} must not contain '.' or '..' segments"
            )));
        }
        segments.push(seg.to_string());
    }

    // 2) routes ディレクトリを基準に結合し、絶対化して外に出ていないか確認
    let candidate = segments.iter().fold(routes_dir.to_path_buf(), |p, s| p.join(s));
    let abs = candidate
        .absolutize()
        .map_err(|e| Error::io(&candidate, e))?
        .to_path_buf();
    if !abs.starts_with(routes_dir) {
        return Err(Error::config(format!(
            "route path {route_path:?} resolves outside of {}",
            routes_dir.display()
        )));
    }

    // 3) 実在するディレクトリでなければエラー
    if !abs.is_dir() {
        return Err(Error::config(format!(
            "route path {route_path:?} does not exist under {}",
            routes_dir.display()
        )));
    }

    Ok(Scope { segments, dir: abs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn none_means_whole_tree() {
        let tmp = TempDir::new().unwrap();
        let scope = resolve_scope(tmp.path(), None).unwrap();
        assert!(scope.segments.is_empty());
        assert!(scope.contains("/anything/at/all"));
    }

    #[test]
    fn resolves_existing_subtree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("api/v1")).unwrap();

        let scope = resolve_scope(tmp.path(), Some("/api/v1/")).unwrap();
        assert_eq!(scope.segments, vec!["api".to_string(), "v1".to_string()]);
        assert!(scope.contains("/api/v1"));
        assert!(scope.contains("/api/v1/users"));
        assert!(!scope.contains("/api"));
        assert!(!scope.contains("/api/v2"));
    }

    #[test]
    fn rejects_missing_and_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            resolve_scope(tmp.path(), Some("nope")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolve_scope(tmp.path(), Some("../outside")),
            Err(Error::Config(_))
        ));
    }
}
