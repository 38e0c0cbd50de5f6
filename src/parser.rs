// src/parser.rs
//! ルートモジュールのテキストからエンドポイント宣言を抽出する。
//!
//! 完全な構文解析は行わず、Python の字句 (コメント・文字列・括弧の入れ子)
//! だけを理解するトークナイザの上で、次の狭い文法をパターンとして探す:
//!
//! ```text
//! @router.get("/users/{id}")          # get/post/put/patch/delete/head/options/trace
//! @router.api_route("/x", methods=["GET", "POST"])
//! async def handler(...):
//! ```
//!
//! 確信を持って取り出せない宣言は警告にして除外する。実行は止めない。

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Endpoint, Method, Parameter};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str { value: String, formatted: bool },
    Number,
    Op(char),
    /// 括弧の外側にある論理行の終わり
    Newline,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
    start: usize,
    end: usize,
}

impl Token {
    fn is_op(&self, c: char) -> bool {
        self.tok == Tok::Op(c)
    }

    fn ident(&self) -> Option<&str> {
        match &self.tok {
            Tok::Ident(s) => Some(s),
            _ => None,
        }
    }
}

/// 1 件の宣言を取り出せなかった理由
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarningKind {
    #[error("path argument is not a string literal")]
    NonLiteralPath,
    #[error("route declaration has no path argument")]
    MissingPath,
    #[error("unsupported method {0:?} in methods list")]
    UnknownMethod(String),
    #[error("methods list is empty")]
    EmptyMethods,
    #[error("unterminated argument list")]
    UnterminatedCall,
    #[error("route decorator is not followed by a function definition")]
    DanglingDecorator,
}

/// 抽出時の警告 (非致命)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

/// 1 モジュール分の抽出結果
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// 宣言順
    pub endpoints: Vec<Endpoint>,
    pub warnings: Vec<ParseWarning>,
}

impl Extraction {
    /// ルートデコレータを 1 つでも持つか (警告になったものも含む)
    pub fn has_declarations(&self) -> bool {
        !self.endpoints.is_empty() || !self.warnings.is_empty()
    }
}

/// 読み込んだモジュールのテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Utf8(String),
    /// UTF-8 として復号できなかった。中身は置換文字で復号したもので、書き戻しには使えない。
    Undecodable(String),
}

impl ModuleSource {
    pub fn text(&self) -> &str {
        match self {
            ModuleSource::Utf8(text) | ModuleSource::Undecodable(text) => text,
        }
    }
}

/// ファイルを読み込んで抽出する。UTF-8 でないファイルも読み込みエラーにはしない。
pub fn parse_endpoints_in_file(
    file_path: &Path,
    router_name: &str,
) -> Result<(ModuleSource, Extraction)> {
    let bytes = fs::read(file_path).map_err(|e| Error::io(file_path, e))?;
    let source = match String::from_utf8(bytes) {
        Ok(text) => ModuleSource::Utf8(text),
        Err(e) => ModuleSource::Undecodable(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    };
    let extraction = extract_endpoints(source.text(), router_name);
    Ok((source, extraction))
}

/// テキストから宣言を抽出する (副作用なし)
pub fn extract_endpoints(src: &str, router_name: &str) -> Extraction {
    let tokens = Lexer::new(src).run();
    Scanner {
        src,
        tokens: &tokens,
        router_name,
        out: Extraction::default(),
    }
    .scan()
}

/// `router = ...` のようにルータ変数をトップレベルで束縛しているか
pub fn declares_router(src: &str, router_name: &str) -> bool {
    let tokens = Lexer::new(src).run();
    tokens.iter().enumerate().any(|(i, t)| {
        let at_line_start = i == 0 || tokens[i - 1].tok == Tok::Newline;
        at_line_start
            && t.ident() == Some(router_name)
            && is_assignment(&tokens[i + 1..])
    })
}

/// 文字列リテラルが占めるバイト範囲 (出現順)
pub fn string_spans(src: &str) -> Vec<Range<usize>> {
    Lexer::new(src)
        .run()
        .into_iter()
        .filter(|t| matches!(t.tok, Tok::Str { .. }))
        .map(|t| t.start..t.end)
        .collect()
}

fn is_assignment(rest: &[Token]) -> bool {
    match rest {
        [eq, next, ..] if eq.is_op('=') => !next.is_op('='),
        [colon, ..] if colon.is_op(':') => rest
            .iter()
            .take_while(|t| t.tok != Tok::Newline)
            .any(|t| t.is_op('=')),
        _ => false,
    }
}

// ───────────────────────────── トークナイザ ─────────────────────────────

const STRING_PREFIXES: [&str; 8] = ["r", "u", "b", "f", "br", "rb", "fr", "rf"];

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            depth: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn push(&mut self, tok: Tok, start: usize, line: usize) {
        self.tokens.push(Token {
            tok,
            line,
            start,
            end: self.pos,
        });
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '\\' if matches!(self.peek_at(1), Some('\n') | Some('\r')) => {
                    // 行継続: 改行ごと読み飛ばす
                    self.pos += 1;
                    if self.peek() == Some('\r') {
                        self.pos += 1;
                    }
                    if self.peek() == Some('\n') {
                        self.pos += 1;
                    }
                    self.line += 1;
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += c.len_utf8();
                    }
                }
                '\n' => {
                    self.pos += 1;
                    let line = self.line;
                    self.line += 1;
                    let last_is_newline = matches!(
                        self.tokens.last(),
                        None | Some(Token { tok: Tok::Newline, .. })
                    );
                    if self.depth == 0 && !last_is_newline {
                        self.push(Tok::Newline, start, line);
                    }
                }
                '"' | '\'' => self.string(start, ""),
                c if c.is_alphabetic() || c == '_' => {
                    while let Some(c) = self.peek() {
                        if !(c.is_alphanumeric() || c == '_') {
                            break;
                        }
                        self.pos += c.len_utf8();
                    }
                    let src = self.src;
                    let word = &src[start..self.pos];
                    let is_prefix = STRING_PREFIXES
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(word));
                    if is_prefix && matches!(self.peek(), Some('"') | Some('\'')) {
                        self.string(start, word);
                    } else {
                        let line = self.line;
                        self.push(Tok::Ident(word.to_string()), start, line);
                    }
                }
                c if c.is_ascii_digit() => {
                    while let Some(c) = self.peek() {
                        if !(c.is_alphanumeric() || c == '.' || c == '_') {
                            break;
                        }
                        self.pos += c.len_utf8();
                    }
                    let line = self.line;
                    self.push(Tok::Number, start, line);
                }
                '(' | '[' | '{' => {
                    self.pos += 1;
                    self.depth += 1;
                    let line = self.line;
                    self.push(Tok::Op(c), start, line);
                }
                ')' | ']' | '}' => {
                    self.pos += 1;
                    self.depth = self.depth.saturating_sub(1);
                    let line = self.line;
                    self.push(Tok::Op(c), start, line);
                }
                other => {
                    self.pos += other.len_utf8();
                    let line = self.line;
                    self.push(Tok::Op(other), start, line);
                }
            }
        }
        self.tokens
    }

    /// 文字列リテラルを読む。`self.pos` は開きクォートを指している。
    fn string(&mut self, start: usize, prefix: &str) {
        let line = self.line;
        let raw = prefix.contains(['r', 'R']);
        let formatted = prefix.contains(['f', 'F']);
        let Some(quote) = self.peek() else { return };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if c == '\n' {
                if !triple {
                    // 閉じられていない 1 行文字列はその行で打ち切る
                    break;
                }
                self.line += 1;
            }
            self.pos += c.len_utf8();
            if c != '\\' {
                value.push(c);
                continue;
            }
            let Some(next) = self.peek() else {
                value.push('\\');
                break;
            };
            self.pos += next.len_utf8();
            if next == '\n' {
                self.line += 1;
            }
            if raw {
                value.push('\\');
                value.push(next);
                continue;
            }
            match next {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                '\\' | '\'' | '"' => value.push(next),
                '\n' => {}
                other => {
                    value.push('\\');
                    value.push(other);
                }
            }
        }
        self.push(Tok::Str { value, formatted }, start, line);
    }
}

// ───────────────────────────── 宣言スキャナ ─────────────────────────────

/// デコレータ 1 つから読み取った宣言 (ハンドラ名はまだ未確定)
#[derive(Debug)]
struct Declaration {
    methods: Vec<Method>,
    path: String,
    line: usize,
}

struct Scanner<'a> {
    src: &'a str,
    tokens: &'a [Token],
    router_name: &'a str,
    out: Extraction,
}

impl<'a> Scanner<'a> {
    fn at_line_start(&self, i: usize) -> bool {
        i == 0 || self.tokens[i - 1].tok == Tok::Newline
    }

    /// `i` 以降で最初の Newline の次の位置
    fn next_line(&self, mut i: usize) -> usize {
        while i < self.tokens.len() {
            if self.tokens[i].tok == Tok::Newline {
                return i + 1;
            }
            i += 1;
        }
        i
    }

    fn warn(&mut self, line: usize, kind: WarningKind) {
        self.out.warnings.push(ParseWarning { line, kind });
    }

    fn scan(mut self) -> Extraction {
        let tokens = self.tokens;
        let mut pending: Vec<Declaration> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if !self.at_line_start(i) || tokens[i].tok == Tok::Newline {
                i += 1;
                continue;
            }
            let token = &tokens[i];

            // 1) デコレータ行
            if token.is_op('@') {
                let (next, decl) = self.decorator(i);
                match decl {
                    Some(Ok(decl)) => pending.push(decl),
                    Some(Err(kind)) => self.warn(token.line, kind),
                    None => {}
                }
                i = next;
                continue;
            }

            // 2) 関数定義: 保留中の宣言をすべてこの関数に結び付ける
            let def_at = match (token.ident(), tokens.get(i + 1).and_then(Token::ident)) {
                (Some("def"), _) => Some(i),
                (Some("async"), Some("def")) => Some(i + 1),
                _ => None,
            };
            if let Some(def_at) = def_at {
                if !pending.is_empty() {
                    self.bind(def_at, std::mem::take(&mut pending));
                }
                i = self.next_line(def_at);
                continue;
            }

            // 3) それ以外の文: 保留中の宣言は宙に浮く
            for decl in pending.drain(..) {
                self.out.warnings.push(ParseWarning {
                    line: decl.line,
                    kind: WarningKind::DanglingDecorator,
                });
            }
            i = self.next_line(i);
        }

        for decl in pending {
            self.warn(decl.line, WarningKind::DanglingDecorator);
        }
        self.out
    }

    /// `@` から始まる 1 行を読む。ルートデコレータでなければ `None`。
    fn decorator(&self, at: usize) -> (usize, Option<std::result::Result<Declaration, WarningKind>>) {
        let line = self.tokens[at].line;
        let mut chain = Vec::new();
        let mut j = at + 1;
        while let Some(name) = self.tokens.get(j).and_then(Token::ident) {
            chain.push(name);
            j += 1;
            if !self.tokens.get(j).is_some_and(|t| t.is_op('.')) {
                break;
            }
            j += 1;
        }

        let [object, attr] = chain.as_slice() else {
            return (self.next_line(at), None);
        };
        if *object != self.router_name {
            return (self.next_line(at), None);
        }
        let verb = Method::from_name(attr).filter(|_| attr.chars().all(|c| c.is_ascii_lowercase()));
        let is_api_route = *attr == "api_route";
        if verb.is_none() && !is_api_route {
            return (self.next_line(at), None);
        }
        if !self.tokens.get(j).is_some_and(|t| t.is_op('(')) {
            return (self.next_line(at), Some(Err(WarningKind::MissingPath)));
        }
        let Some(close) = matching_close(self.tokens, j) else {
            return (self.tokens.len(), Some(Err(WarningKind::UnterminatedCall)));
        };

        let args = split_top_level(&self.tokens[j + 1..close]);
        let decl = self.declaration(&args, verb, line);
        (self.next_line(close), Some(decl))
    }

    fn declaration(
        &self,
        args: &[&[Token]],
        verb: Option<Method>,
        line: usize,
    ) -> std::result::Result<Declaration, WarningKind> {
        let mut positional = Vec::new();
        let mut path_kw = None;
        let mut methods_kw = None;
        for arg in args {
            match keyword(arg) {
                Some(("path", value)) => path_kw = Some(value),
                Some(("methods", value)) => methods_kw = Some(value),
                Some(_) => {}
                None => positional.push(*arg),
            }
        }

        let path_tokens = path_kw
            .or_else(|| positional.first().copied())
            .ok_or(WarningKind::MissingPath)?;
        let path = string_literal(path_tokens).ok_or(WarningKind::NonLiteralPath)?;

        let methods = match verb {
            Some(method) => vec![method],
            None => match methods_kw {
                Some(list) => method_list(list)?,
                None => vec![Method::Get],
            },
        };

        Ok(Declaration {
            methods,
            path: path.trim().to_string(),
            line,
        })
    }

    /// `def` トークン位置から関数名と引数を読み、保留中の宣言を確定させる
    fn bind(&mut self, def_at: usize, pending: Vec<Declaration>) {
        let tokens = self.tokens;
        let Some(handler) = tokens.get(def_at + 1).and_then(Token::ident) else {
            for decl in pending {
                self.warn(decl.line, WarningKind::DanglingDecorator);
            }
            return;
        };
        let handler = handler.to_string();

        let open = def_at + 2;
        let parameters = match tokens.get(open) {
            Some(t) if t.is_op('(') => matching_close(tokens, open)
                .map(|close| self.parameters(&tokens[open + 1..close]))
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        for decl in pending {
            for method in decl.methods {
                self.out.endpoints.push(Endpoint {
                    method,
                    path: decl.path.clone(),
                    full_path: decl.path.clone(),
                    handler: handler.clone(),
                    parameters: parameters.clone(),
                    source_file: String::new(),
                    line: decl.line,
                });
            }
        }
    }

    fn parameters(&self, tokens: &[Token]) -> Vec<Parameter> {
        let mut params = Vec::new();
        for part in split_top_level(tokens) {
            let rest = match part {
                [star, rest @ ..] if star.is_op('*') => match rest {
                    [star2, rest @ ..] if star2.is_op('*') => rest,
                    _ => rest,
                },
                _ => part,
            };
            let Some(name) = rest.first().and_then(Token::ident) else {
                continue;
            };
            if name == "self" || name == "cls" {
                continue;
            }

            let mut depth = 0usize;
            let mut colon = None;
            let mut equals = None;
            for (k, t) in rest.iter().enumerate() {
                match t.tok {
                    Tok::Op('(' | '[' | '{') => depth += 1,
                    Tok::Op(')' | ']' | '}') => depth = depth.saturating_sub(1),
                    Tok::Op(':') if depth == 0 && colon.is_none() => colon = Some(k),
                    Tok::Op('=') if depth == 0 && equals.is_none() => equals = Some(k),
                    _ => {}
                }
            }
            let annotation = colon.and_then(|c| {
                let end = equals.unwrap_or(rest.len());
                let slice = rest.get(c + 1..end)?;
                let (first, last) = (slice.first()?, slice.last()?);
                Some(collapse_whitespace(&self.src[first.start..last.end]))
            });

            params.push(Parameter {
                name: name.to_string(),
                annotation,
            });
        }
        params
    }
}

/// `open` の括弧に対応する閉じ括弧の位置
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (k, t) in tokens.iter().enumerate().skip(open) {
        match t.tok {
            Tok::Op('(' | '[' | '{') => depth += 1,
            Tok::Op(')' | ']' | '}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

/// 括弧の外側にあるカンマで分割する。末尾カンマによる空要素は落とす。
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (k, t) in tokens.iter().enumerate() {
        match t.tok {
            Tok::Op('(' | '[' | '{') => depth += 1,
            Tok::Op(')' | ']' | '}') => depth = depth.saturating_sub(1),
            Tok::Op(',') if depth == 0 => {
                parts.push(&tokens[start..k]);
                start = k + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts.retain(|p| !p.is_empty());
    parts
}

/// `name=value` 形式ならキーワード名と値トークンを返す
fn keyword(arg: &[Token]) -> Option<(&str, &[Token])> {
    match arg {
        [name, eq, value @ ..] if eq.is_op('=') && !value.first().is_some_and(|t| t.is_op('=')) => {
            Some((name.ident()?, value))
        }
        _ => None,
    }
}

/// 非 f-string の文字列リテラル (隣接連結を含む) だけからなるなら値を返す
fn string_literal(tokens: &[Token]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    let mut value = String::new();
    for t in tokens {
        match &t.tok {
            Tok::Str { value: v, formatted: false } => value.push_str(v),
            _ => return None,
        }
    }
    Some(value)
}

/// `methods=["GET", "POST"]` の値を解釈する
fn method_list(tokens: &[Token]) -> std::result::Result<Vec<Method>, WarningKind> {
    let inner = match tokens {
        [open, inner @ .., close]
            if (open.is_op('[') && close.is_op(']')) || (open.is_op('(') && close.is_op(')')) =>
        {
            inner
        }
        _ => return Err(WarningKind::UnknownMethod(render(tokens))),
    };
    let mut methods = Vec::new();
    for item in split_top_level(inner) {
        let name = string_literal(item).ok_or_else(|| WarningKind::UnknownMethod(render(item)))?;
        let method = Method::from_name(name.trim()).ok_or(WarningKind::UnknownMethod(name))?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err(WarningKind::EmptyMethods);
    }
    Ok(methods)
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match &t.tok {
            Tok::Ident(s) => s.clone(),
            Tok::Str { value, .. } => format!("{value:?}"),
            Tok::Number => "<number>".to_string(),
            Tok::Op(c) => c.to_string(),
            Tok::Newline => String::new(),
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(src: &str) -> Extraction {
        extract_endpoints(src, "router")
    }

    fn summary(ex: &Extraction) -> Vec<(Method, &str, &str, usize)> {
        ex.endpoints
            .iter()
            .map(|e| (e.method, e.path.as_str(), e.handler.as_str(), e.line))
            .collect()
    }

    #[test]
    fn extracts_simple_declarations_in_order() {
        let src = r#"from fastapi import APIRouter
router = APIRouter()

@router.get("/")
async def list_users():
    return []

@router.post('/{id}')
def create_user(id: int):
    pass
"#;
        let ex = extract(src);
        assert_eq!(
            summary(&ex),
            vec![
                (Method::Get, "/", "list_users", 4),
                (Method::Post, "/{id}", "create_user", 8),
            ]
        );
        assert!(ex.warnings.is_empty());
    }

    #[test]
    fn tolerates_formatting_and_keyword_path() {
        let src = r#"
@router.put(
    response_model=User,
    path = " /users/{id} ",
)
async def update_user(
    id: int,
    body: Dict[str, Any] = Body(...),
    *,
    user: User = Depends(get_current_user),
) -> User:
    ...
"#;
        let ex = extract(src);
        assert_eq!(summary(&ex), vec![(Method::Put, "/users/{id}", "update_user", 2)]);
        let params: Vec<(&str, Option<&str>)> = ex.endpoints[0]
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.annotation.as_deref()))
            .collect();
        assert_eq!(
            params,
            vec![
                ("id", Some("int")),
                ("body", Some("Dict[str, Any]")),
                ("user", Some("User")),
            ]
        );
    }

    #[test]
    fn non_literal_path_is_skipped_with_warning() {
        let src = r#"
PREFIX = "/x"

@router.get(PREFIX)
def a():
    pass

@router.get(f"/users/{uid}")
def b():
    pass

@router.delete("/ok")
def c():
    pass
"#;
        let ex = extract(src);
        assert_eq!(summary(&ex), vec![(Method::Delete, "/ok", "c", 12)]);
        assert_eq!(
            ex.warnings,
            vec![
                ParseWarning { line: 4, kind: WarningKind::NonLiteralPath },
                ParseWarning { line: 8, kind: WarningKind::NonLiteralPath },
            ]
        );
    }

    #[test]
    fn ignores_decorators_inside_strings_and_comments() {
        let src = r#"
"""
@router.get("/doc")
def not_real():
    pass
"""
# @router.post("/commented")
@router.get("/real")
def real():
    pass
"#;
        let ex = extract(src);
        assert_eq!(summary(&ex), vec![(Method::Get, "/real", "real", 8)]);
    }

    #[test]
    fn stacked_decorators_bind_to_same_handler() {
        let src = r#"
@router.get("/a")
@some_other_decorator(x=1)
@router.head("/a")
async def handle():
    pass
"#;
        let ex = extract(src);
        assert_eq!(
            summary(&ex),
            vec![(Method::Get, "/a", "handle", 2), (Method::Head, "/a", "handle", 4)]
        );
    }

    #[test]
    fn api_route_expands_methods() {
        let src = r#"
@router.api_route("/multi", methods=["GET", "post"])
def multi():
    pass

@router.api_route("/bad", methods=["FETCH"])
def bad():
    pass
"#;
        let ex = extract(src);
        assert_eq!(
            summary(&ex),
            vec![(Method::Get, "/multi", "multi", 2), (Method::Post, "/multi", "multi", 2)]
        );
        assert_eq!(ex.warnings[0].kind, WarningKind::UnknownMethod("FETCH".into()));
    }

    #[test]
    fn dangling_and_unterminated_declarations_warn() {
        let src = "@router.get(\"/a\")\nclass NotAFunction:\n    pass\n\n@router.get(\"/b\"\n";
        let ex = extract(src);
        assert!(ex.endpoints.is_empty());
        assert_eq!(
            ex.warnings,
            vec![
                ParseWarning { line: 1, kind: WarningKind::DanglingDecorator },
                ParseWarning { line: 5, kind: WarningKind::UnterminatedCall },
            ]
        );
    }

    #[test]
    fn other_router_objects_are_ignored() {
        let src = "@app.get(\"/x\")\ndef x():\n    pass\n";
        assert!(extract(src).endpoints.is_empty());
        assert_eq!(extract_endpoints(src, "app").endpoints.len(), 1);
    }

    #[test]
    fn detects_router_binding() {
        assert!(declares_router("from fastapi import APIRouter\nrouter = APIRouter()\n", "router"));
        assert!(declares_router("router: APIRouter = APIRouter(prefix='/x')\n", "router"));
        assert!(!declares_router("def f():\n    return router == 1\n", "router"));
        assert!(!declares_router("x = 1\n", "router"));
    }

    #[test]
    fn string_spans_cover_literals_only() {
        let src = "x = 'a'  # 'not a string'\ny = \"\"\"b\nc\"\"\"\n";
        let spans: Vec<&str> = string_spans(src).into_iter().map(|r| &src[r]).collect();
        assert_eq!(spans, vec!["'a'", "\"\"\"b\nc\"\"\""]);
    }

    #[test]
    fn non_utf8_file_is_read_lossily() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("legacy.py");
        fs::write(&path, b"# -*- coding: latin-1 -*-\nNAME = '\xe9t\xe9'\n").unwrap();

        let (source, extraction) = parse_endpoints_in_file(&path, "router").unwrap();
        assert!(matches!(source, ModuleSource::Undecodable(_)));
        assert!(source.text().starts_with("# -*- coding: latin-1 -*-\n"));
        assert!(!extraction.has_declarations());
    }
}
