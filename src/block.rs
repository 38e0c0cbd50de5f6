//! モジュール内のエンドポイント要約 (マーカー領域) の生成と差し替え
//!
//! ファイルを「前 / マーカー領域 / 後」の 3 つに分け、真ん中だけを作り直す。
//!
//! ```text
//! # routesync:endpoints:begin
//! __endpoints__: dict = {
//!     "GET /{id}": { ... }
//! }
//! # routesync:endpoints:end
//! ```

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;

use crate::model::{Endpoint, Method, Parameter};
use crate::parser::string_spans;

pub const BLOCK_BEGIN: &str = "# routesync:endpoints:begin";
pub const BLOCK_END: &str = "# routesync:endpoints:end";

static BEGIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*# routesync:endpoints:begin[ \t]*\r?$").unwrap());
static END_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*# routesync:endpoints:end[ \t]*\r?$").unwrap());
/// マーカー無しの旧形式 `__endpoints__: Dict[str, Any] = {...}`
static LEGACY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^__endpoints__\b[^=\n]*=[ \t]*\{").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("begin marker has no matching end marker")]
    Unterminated,
    #[error("end marker without a begin marker")]
    OrphanEnd,
    #[error("more than one endpoint block")]
    Duplicate,
    #[error("failed to render endpoint block: {0}")]
    Render(#[from] serde_json::Error),
}

/// `module` のテキストを、`endpoints` を反映したテキストに変換する。
///
/// マーカー領域の外側は一切変更しない。結果が入力と同じなら書き込み不要。
pub fn sync_block(source: &str, endpoints: &[Endpoint]) -> Result<String, BlockError> {
    let block = render_block(endpoints)?;

    if let Some(region) = find_region(source)? {
        let mut out = String::with_capacity(source.len() + block.len());
        out.push_str(&source[..region.start]);
        out.push_str(&block);
        out.push_str(&source[region.end..]);
        return Ok(out);
    }

    Ok(insert_after_header(source, &block))
}

/// マーカー込みの領域テキスト (末尾改行つき)
pub fn render_block(endpoints: &[Endpoint]) -> Result<String, BlockError> {
    let body = pretty_json(&EndpointTable(endpoints))?;
    Ok(format!("{BLOCK_BEGIN}\n__endpoints__: dict = {body}\n{BLOCK_END}\n"))
}

/// 4 スペースインデントの JSON (末尾改行なし)
pub(crate) fn pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json は常に UTF-8 を出力する
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 差し替え対象の範囲 (行頭から末尾改行まで)。無ければ `None`。
///
/// 文字列リテラルの中に書かれたマーカー (docstring の使用例など) は数えない。
fn find_region(source: &str) -> Result<Option<Range<usize>>, BlockError> {
    let strings = string_spans(source);
    let outside = |m: &regex::Match<'_>| !strings.iter().any(|s| s.contains(&m.start()));
    let begins: Vec<_> = BEGIN_PATTERN.find_iter(source).filter(|m| outside(m)).collect();
    let ends: Vec<_> = END_PATTERN.find_iter(source).filter(|m| outside(m)).collect();

    match (begins.as_slice(), ends.as_slice()) {
        ([], []) => {}
        ([begin], [end]) if end.start() > begin.end() => {
            return Ok(Some(begin.start()..line_end(source, end.end())));
        }
        ([], _) => return Err(BlockError::OrphanEnd),
        ([_], []) => return Err(BlockError::Unterminated),
        ([_], [_]) => return Err(BlockError::OrphanEnd),
        _ => return Err(BlockError::Duplicate),
    }

    let legacy: Vec<_> = LEGACY_PATTERN.find_iter(source).filter(|m| outside(m)).collect();
    match legacy.as_slice() {
        [] => Ok(None),
        [m] => {
            let open = m.end() - 1;
            let close = closing_brace(source, open).ok_or(BlockError::Unterminated)?;
            Ok(Some(m.start()..line_end(source, close + 1)))
        }
        _ => Err(BlockError::Duplicate),
    }
}

/// `pos` を含む行の末尾 (改行の直後)
fn line_end(source: &str, pos: usize) -> usize {
    match source[pos..].find('\n') {
        Some(nl) => pos + nl + 1,
        None => source.len(),
    }
}

/// `open` にある '{' に対応する '}' の位置。文字列内の括弧は数えない。
fn closing_brace(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' | b'[' | b'(' => depth += 1,
                b'}' | b']' | b')' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                b'#' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// ヘッダ部 (モジュール docstring・コメント・import 文) の直後に挿入する
fn insert_after_header(source: &str, block: &str) -> String {
    let at = header_end(source);
    let (before, after) = source.split_at(at);

    let mut out = String::with_capacity(source.len() + block.len() + 2);
    out.push_str(before);
    if !before.is_empty() {
        if !before.ends_with('\n') {
            out.push('\n');
        }
        if !before.ends_with("\n\n") {
            out.push('\n');
        }
    }
    out.push_str(block);
    if !after.is_empty() && !after.starts_with('\n') && !after.starts_with("\r\n") {
        out.push('\n');
    }
    out.push_str(after);
    out
}

/// 挿入位置: 最後の import 文の後。import が無ければ先頭の docstring の後、
/// それも無ければ先頭のコメント行 (shebang・encoding 宣言など) の後、どれも無ければ 0。
fn header_end(source: &str) -> usize {
    let mut offset = 0;
    let mut last_import_end = None;
    let mut docstring_end = None;
    let mut comment_header_end = None;
    let mut at_top = true;
    let mut seen_statement = false;
    let mut lines = source.split_inclusive('\n');

    while let Some(line) = lines.next() {
        offset += line.len();
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            if at_top {
                comment_header_end = Some(offset);
            }
            continue;
        }
        at_top = false;
        if trimmed.is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            break;
        }

        // モジュール docstring (最初の文のみ)
        if !seen_statement && (trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")) {
            seen_statement = true;
            let delim = &trimmed[..3];
            let mut closed = trimmed.len() >= 6 && trimmed[3..].contains(delim);
            while !closed {
                match lines.next() {
                    Some(next) => {
                        offset += next.len();
                        closed = next.contains(delim);
                    }
                    None => break,
                }
            }
            docstring_end = Some(offset);
            continue;
        }
        seen_statement = true;

        if !(trimmed.starts_with("import ") || trimmed.starts_with("from ")) {
            break;
        }

        // 括弧・バックスラッシュで複数行にまたがる import
        let mut depth = paren_delta(line);
        let mut continued = trimmed.ends_with('\\');
        while depth > 0 || continued {
            match lines.next() {
                Some(next) => {
                    offset += next.len();
                    depth += paren_delta(next);
                    continued = next.trim_end().ends_with('\\');
                }
                None => break,
            }
        }
        last_import_end = Some(offset);
    }

    last_import_end
        .or(docstring_end)
        .or(comment_header_end)
        .unwrap_or(0)
}

fn paren_delta(line: &str) -> i32 {
    let code = line.split('#').next().unwrap_or(line);
    code.chars()
        .map(|c| match c {
            '(' => 1,
            ')' => -1,
            _ => 0,
        })
        .sum()
}

// ───────────────────────────── シリアライズ ─────────────────────────────

/// 宣言順を保ったまま `"METHOD path" -> 要約` のマップとして出力する
pub(crate) struct EndpointTable<'a>(pub(crate) &'a [Endpoint]);

#[derive(Serialize)]
struct EndpointSummary<'a> {
    method: Method,
    path: &'a str,
    handler: &'a str,
    parameters: ParameterTable<'a>,
}

struct ParameterTable<'a>(&'a [Parameter]);

impl Serialize for EndpointTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for endpoint in self.0 {
            map.serialize_entry(
                &endpoint.block_key(),
                &EndpointSummary {
                    method: endpoint.method,
                    path: &endpoint.path,
                    handler: &endpoint.handler,
                    parameters: ParameterTable(&endpoint.parameters),
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for ParameterTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for param in self.0 {
            map.serialize_entry(&param.name, param.annotation.as_deref().unwrap_or("Any"))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn endpoint(method: Method, path: &str, handler: &str) -> Endpoint {
        Endpoint {
            method,
            path: path.to_string(),
            full_path: path.to_string(),
            handler: handler.to_string(),
            parameters: vec![Parameter {
                name: "id".to_string(),
                annotation: Some("int".to_string()),
            }],
            source_file: "src/routes/base.py".to_string(),
            line: 1,
        }
    }

    #[test]
    fn renders_in_declaration_order() {
        let block = render_block(&[
            endpoint(Method::Post, "/b", "create"),
            endpoint(Method::Get, "/a", "read"),
        ])
        .unwrap();
        let expected = r#"# routesync:endpoints:begin
__endpoints__: dict = {
    "POST /b": {
        "method": "POST",
        "path": "/b",
        "handler": "create",
        "parameters": {
            "id": "int"
        }
    },
    "GET /a": {
        "method": "GET",
        "path": "/a",
        "handler": "read",
        "parameters": {
            "id": "int"
        }
    }
}
# routesync:endpoints:end
"#;
        assert_eq!(block, expected);
    }

    #[test]
    fn renders_empty_block() {
        assert_eq!(
            render_block(&[]).unwrap(),
            "# routesync:endpoints:begin\n__endpoints__: dict = {}\n# routesync:endpoints:end\n"
        );
    }

    #[test]
    fn inserts_after_imports_and_is_idempotent() {
        let source = "\"\"\"Users.\"\"\"\nfrom fastapi import (\n    APIRouter,\n)\nimport os\nrouter = APIRouter()\n\ndef helper():\n    import json\n";
        let once = sync_block(source, &[]).unwrap();
        assert_eq!(
            once,
            "\"\"\"Users.\"\"\"\nfrom fastapi import (\n    APIRouter,\n)\nimport os\n\n# routesync:endpoints:begin\n__endpoints__: dict = {}\n# routesync:endpoints:end\n\nrouter = APIRouter()\n\ndef helper():\n    import json\n"
        );
        assert_eq!(sync_block(&once, &[]).unwrap(), once);
    }

    #[test]
    fn inserts_after_docstring_or_at_top() {
        let with_doc = sync_block("'''Doc\nstring'''\nx = 1\n", &[]).unwrap();
        assert!(with_doc.starts_with("'''Doc\nstring'''\n\n# routesync:endpoints:begin\n"));
        assert!(with_doc.ends_with("# routesync:endpoints:end\n\nx = 1\n"));

        let bare = sync_block("x = 1\n", &[]).unwrap();
        assert!(bare.starts_with("# routesync:endpoints:begin\n"));
        assert!(bare.ends_with("# routesync:endpoints:end\n\nx = 1\n"));
    }

    #[test]
    fn keeps_shebang_and_encoding_lines_first() {
        let source = "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\nrouter = APIRouter()\n";
        let once = sync_block(source, &[]).unwrap();
        assert_eq!(
            once,
            "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\n# routesync:endpoints:begin\n__endpoints__: dict = {}\n# routesync:endpoints:end\n\nrouter = APIRouter()\n"
        );
        assert_eq!(sync_block(&once, &[]).unwrap(), once);
    }

    #[test]
    fn ignores_markers_inside_strings() {
        let source = format!(
            "\"\"\"Usage:\n\n{}\"\"\"\nimport os\n",
            render_block(&[]).unwrap()
        );
        let block = render_block(&[endpoint(Method::Get, "/x", "f")]).unwrap();
        let once = sync_block(&source, &[endpoint(Method::Get, "/x", "f")]).unwrap();
        assert_eq!(once, format!("{source}\n{block}"));
        assert_eq!(sync_block(&once, &[endpoint(Method::Get, "/x", "f")]).unwrap(), once);
    }

    #[test]
    fn replaces_existing_region_in_place() {
        let source = "import os\n\n# keep me\n# routesync:endpoints:begin\n__endpoints__: dict = {}\n# routesync:endpoints:end\n\ndef f():\n    return 1  # also kept\n";
        let updated = sync_block(source, &[endpoint(Method::Get, "/x", "f")]).unwrap();
        assert!(updated.starts_with("import os\n\n# keep me\n# routesync:endpoints:begin\n"));
        assert!(updated.ends_with("# routesync:endpoints:end\n\ndef f():\n    return 1  # also kept\n"));
        assert!(updated.contains("\"GET /x\""));
    }

    #[test]
    fn migrates_legacy_assignment() {
        let source = "from typing import Dict, Any\n\n__endpoints__: Dict[str, Any] = {\n    \"/\": {\"method\": \"GET\", \"description\": \"}\"}\n}\n\n@router.get(\"/\")\ndef f():\n    pass\n";
        let updated = sync_block(source, &[]).unwrap();
        assert_eq!(
            updated,
            "from typing import Dict, Any\n\n# routesync:endpoints:begin\n__endpoints__: dict = {}\n# routesync:endpoints:end\n\n@router.get(\"/\")\ndef f():\n    pass\n"
        );
    }

    #[test]
    fn malformed_markers_are_rejected() {
        let unterminated = "# routesync:endpoints:begin\n__endpoints__: dict = {}\n";
        assert!(matches!(sync_block(unterminated, &[]), Err(BlockError::Unterminated)));

        let orphan = "x = 1\n# routesync:endpoints:end\n";
        assert!(matches!(sync_block(orphan, &[]), Err(BlockError::OrphanEnd)));

        let twice = format!("{0}{0}", render_block(&[]).unwrap());
        assert!(matches!(sync_block(&twice, &[]), Err(BlockError::Duplicate)));
    }
}
