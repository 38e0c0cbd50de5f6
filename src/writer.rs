//! 差分チェック付きのファイル書き込み

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use similar::TextDiff;
use tracing::{debug, enabled, Level};

use crate::error::{Error, Result};

/// 既存ファイルの内容。無ければ `None`。
pub fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// `content` が現在の内容と異なるときだけ書き込む。書き込んだら true。
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    let current = read_existing(path)?;
    if current.as_deref() == Some(content) {
        return Ok(false);
    }
    log_diff(path, current.as_deref().unwrap_or(""), content);
    write_atomic(path, content)?;
    Ok(true)
}

/// 同じディレクトリの一時ファイルに書いてから rename する。
/// 途中で止まっても書きかけのファイルは残らない。
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(path, e));
    }
    Ok(())
}

fn log_diff(path: &Path, old: &str, new: &str) {
    if !enabled!(Level::DEBUG) {
        return;
    }
    let diff = TextDiff::from_lines(old, new);
    let name = path.display().to_string();
    let unified = diff.unified_diff().context_radius(2).header(&name, &name).to_string();
    debug!(file = %name, "rewriting\n{unified}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_only_on_change() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.py");

        assert!(write_if_changed(&path, "x = 1\n").unwrap());
        assert!(!write_if_changed(&path, "x = 1\n").unwrap());
        assert!(write_if_changed(&path, "x = 2\n").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 2\n");

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_existing(&tmp.path().join("nope")).unwrap(), None);
    }
}
