// src/model.rs
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// ルート宣言が使う HTTP メソッド
///
/// 列挙順がそのままソート順になる (レジストリ・衝突レポートの決定性のため)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Head,
        Method::Options,
        Method::Trace,
    ];

    /// デコレータ名 (`router.get` の `get`) から変換する。大文字小文字は区別しない。
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ハンドラ関数の引数 1 つ分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    /// 型注釈のソーステキスト (空白は 1 つに畳み込む)
    pub annotation: Option<String>,
}

/// 静的スキャンで見つかったエンドポイント宣言
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub method: Method,

    /// 宣言に書かれたままのパステンプレート (前後の空白のみ除去)
    pub path: String,

    /// ノードのパスとモジュールの prefix を前置した実際のマウント先。
    /// (method, full_path) がツリー全体での同一性になる。
    pub full_path: String,

    /// デコレートされた関数名
    pub handler: String,

    pub parameters: Vec<Parameter>,

    /// プロジェクトルートからの相対パス ('/' 区切り)。診断用のみ。
    pub source_file: String,

    /// デコレータの行番号 (1 始まり)
    pub line: usize,
}

impl Endpoint {
    /// モジュール内の `__endpoints__` で使うキー (`"GET /users/{id}"`)
    pub fn block_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// ディレクトリ直下のルートモジュール 1 ファイル
#[derive(Debug, Clone)]
pub struct RouteModule {
    /// ファイル名の stem (`users.py` → `users`)
    pub name: String,
    pub path: PathBuf,
    /// 集約モジュールで `include_router` に渡す prefix。base モジュールは空文字。
    pub prefix: String,
    /// スキャン時に読み込んだ本文。書き換えの差分判定に使う。
    pub source: String,
    pub endpoints: Vec<Endpoint>,
}

impl RouteModule {
    pub fn is_base(&self) -> bool {
        self.prefix.is_empty()
    }
}

/// ルートツリーの 1 ディレクトリ
///
/// 親への参照は持たず、`full_path` は構築時に上から順に確定させる。
#[derive(Debug, Clone)]
pub struct RouteNode {
    /// このディレクトリが与えるパスセグメント (ルートは空文字)
    pub segment: String,
    pub full_path: String,
    pub dir: PathBuf,
    /// 直下のルートモジュール。base が先頭、それ以外はファイル名順。
    pub modules: Vec<RouteModule>,
    pub children: BTreeMap<String, RouteNode>,
    /// 直下のモジュールを読めなかった場合に true。このノードは書き換えない。
    pub tainted: bool,
}

impl RouteNode {
    pub fn new(segment: impl Into<String>, full_path: impl Into<String>, dir: PathBuf) -> Self {
        RouteNode {
            segment: segment.into(),
            full_path: full_path.into(),
            dir,
            modules: Vec::new(),
            children: BTreeMap::new(),
            tainted: false,
        }
    }

    /// このディレクトリ直下で宣言されたエンドポイント (子ディレクトリは含まない)
    pub fn own_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.modules.iter().flat_map(|m| m.endpoints.iter())
    }

    /// 自身か子孫にルートモジュールがあるか
    pub fn has_routes(&self) -> bool {
        !self.modules.is_empty() || self.children.values().any(RouteNode::has_routes)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len() + self.children.values().map(RouteNode::module_count).sum::<usize>()
    }

    pub fn endpoint_count(&self) -> usize {
        self.own_endpoints().count()
            + self.children.values().map(RouteNode::endpoint_count).sum::<usize>()
    }

    /// 前順 (自身 → 子をセグメント順) で全エンドポイントを返す
    pub fn all_endpoints(&self) -> Vec<&Endpoint> {
        let mut out = Vec::new();
        self.collect_endpoints(&mut out);
        out
    }

    fn collect_endpoints<'a>(&'a self, out: &mut Vec<&'a Endpoint>) {
        out.extend(self.own_endpoints());
        for child in self.children.values() {
            child.collect_endpoints(out);
        }
    }

    /// 相対セグメント列でサブツリーを探す
    pub fn find<'a, I>(&self, segments: I) -> Option<&RouteNode>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut node = self;
        for seg in segments {
            node = node.children.get(seg)?;
        }
        Some(node)
    }
}

/// パス片を連結してマウント先のパスを作る。
///
/// 連続する '/' は 1 つにまとめ、末尾の '/' はルート以外では落とす。
/// テンプレート中のプレースホルダ (`{id}`) はそのまま残す。
pub fn mount_path(parts: &[&str]) -> String {
    let segments: Vec<&str> = parts
        .iter()
        .flat_map(|p| p.split('/'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
