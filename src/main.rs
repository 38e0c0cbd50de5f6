// src/main.rs

use clap::Parser;
use std::process::ExitCode;

mod cli;

use cli::{Cli, Commands};
use routesync::logging::{self, Verbosity};
use routesync::resolver::resolve_project_root;
use routesync::scaffold::create_route;
use routesync::{Config, Outcome, SyncOptions, Synchronizer};

fn main() -> ExitCode {
    // 1) CLI 引数をパース
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> routesync::Result<ExitCode> {
    // 2) ログ出力の詳しさを決めて subscriber を設定
    let verbosity = match &cli.command {
        Commands::Update { silent, verbose, .. } => Verbosity::from_flags(*silent, *verbose),
        Commands::Create { .. } => Verbosity::Normal,
    };
    if let Err(e) = logging::init(verbosity) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    // 3) プロジェクトルートを絶対パス化し、設定を読む
    let project_root = resolve_project_root(&cli.project_root)?;
    let config = Config::load(&project_root)?;

    match cli.command {
        Commands::Create { path } => {
            let routes_dir = project_root.join(&config.routes_dir);
            let created = create_route(&routes_dir, &path, &config)?;
            for file in &created {
                println!("created {}", file.display());
            }
            if !created.is_empty() {
                println!("run `routesync update` to register the new route");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Update {
            path,
            silent,
            no_output_file,
            ..
        } => {
            // 4) 同期を実行し、要約を表示
            let sync = Synchronizer::new(&project_root, config)?;
            let report = sync.update(&SyncOptions {
                scope: path,
                persist_registry: !no_output_file,
            })?;
            if !silent {
                println!("{}", report.summary());
            }

            // 5) 終了コードは表示の有無に関係なく衝突・失敗を反映する
            Ok(match report.outcome() {
                Outcome::Failed => ExitCode::FAILURE,
                Outcome::Success | Outcome::SuccessWithWarnings => ExitCode::SUCCESS,
            })
        }
    }
}
