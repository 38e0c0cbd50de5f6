use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// 出力の詳しさ (`--silent` / 既定 / `--verbose`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Silent,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(silent: bool, verbose: bool) -> Self {
        match (silent, verbose) {
            (true, _) => Verbosity::Silent,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }

    /// `RUST_LOG` が無いときのフィルタ
    fn default_directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

/// stderr に出力する tracing subscriber を設定する。
///
/// `RUST_LOG` があればそれを優先し、無ければ `verbosity` に応じたレベルを使う。
/// 要約レポートは stdout に出すので混ざらない。2 回目以降の呼び出しは `Err`。
pub fn init(verbosity: Verbosity) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(verbosity.default_directive())?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity == Verbosity::Verbose)
                .without_time()
                .compact(),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_wins_over_verbose() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Silent);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn each_level_maps_to_a_valid_filter() {
        assert_eq!(Verbosity::Silent.default_directive(), "error");
        assert_eq!(Verbosity::default().default_directive(), "warn");
        assert_eq!(Verbosity::Verbose.default_directive(), "debug");
        for verbosity in [Verbosity::Silent, Verbosity::Normal, Verbosity::Verbose] {
            assert!(EnvFilter::try_new(verbosity.default_directive()).is_ok());
        }
    }

    #[test]
    fn subscriber_is_installed_only_once() {
        let _ = init(Verbosity::Normal);
        assert!(init(Verbosity::Verbose).is_err());
    }
}
