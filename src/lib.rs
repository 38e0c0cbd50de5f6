//! routesync: ディレクトリ型ルーティング規約のソースツリー同期ツール
//!
//! ディレクトリ階層が API のパス階層に対応し、各ディレクトリのルートモジュール
//! (`*.py`) をデコレータ宣言ごと静的にスキャンして、次の 3 つを常に一致させる:
//!
//! 1. 各モジュール内のエンドポイント要約 ([`block`])
//! 2. ディレクトリごとの集約モジュール `__init__.py` ([`aggregator`])
//! 3. プロジェクト全体のレジストリ `endpoints.json` ([`registry`])
//!
//! 何が変わったかは与えられず、毎回ソースから作り直して差分があるものだけ書く。
//! そのため何度実行しても同じ結果になる。
//!
//! ```no_run
//! use routesync::{SyncOptions, Synchronizer};
//! use std::path::Path;
//!
//! let sync = Synchronizer::open(Path::new("."))?;
//! let report = sync.update(&SyncOptions::default())?;
//! println!("{}", report.summary());
//! # Ok::<(), routesync::Error>(())
//! ```

pub mod aggregator;
pub mod block;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod model;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod scaffold;
pub mod sync;
pub mod tree;
pub mod writer;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{Endpoint, Method, RouteNode};
pub use registry::EndpointRegistry;
pub use sync::{Outcome, SyncOptions, SyncReport, Synchronizer};
