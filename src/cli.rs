//! CLI 引数定義

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ディレクトリ型ルーティングのエンドポイント要約・集約モジュール・レジストリを同期する CLI ツール
#[derive(Parser, Debug)]
#[command(name = "routesync", version, about, long_about = None)]
pub struct Cli {
    /// プロジェクトルート (routesync.toml と routes ディレクトリの基準)
    /// 例: `--project-root C:/path/to/my-api`
    #[arg(
        short = 'r',
        long = "project-root",
        value_name = "DIR",
        default_value = ".",
        env = "ROUTESYNC_PROJECT_ROOT",
        global = true
    )]
    pub project_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// ルートディレクトリと base モジュール・集約モジュールのひな形を作る
    Create {
        /// ネストしたルートパス (例: '/apikey/v2')
        path: String,
    },

    /// エンドポイント要約・集約モジュール・レジストリを更新する
    Update {
        /// 更新を絞り込むルートパス (例: '/apikey/v2')。省略時はすべて。
        path: Option<String>,

        /// 要約を表示しない (エラーのみ)
        #[arg(short, long)]
        silent: bool,

        /// 詳細なログと書き換え差分を表示する
        #[arg(short, long)]
        verbose: bool,

        /// レジストリファイルを書き出さない
        #[arg(long = "no-output-file", visible_alias = "nof")]
        no_output_file: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_update_flags() {
        let cli = Cli::try_parse_from(["routesync", "update", "/api/v1", "-v", "--nof"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Update {
                path: Some("/api/v1".into()),
                silent: false,
                verbose: true,
                no_output_file: true,
            }
        );
        assert_eq!(cli.project_root, PathBuf::from("."));
    }

    #[test]
    fn parses_create_with_project_root() {
        let cli = Cli::try_parse_from(["routesync", "create", "users", "-r", "/srv/api"]).unwrap();
        assert_eq!(cli.command, Commands::Create { path: "users".into() });
        assert_eq!(cli.project_root, PathBuf::from("/srv/api"));
    }

    #[test]
    fn create_requires_path() {
        assert!(Cli::try_parse_from(["routesync", "create"]).is_err());
    }
}
