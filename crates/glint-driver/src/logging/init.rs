use std::sync::OnceLock;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "glint_driver=trace,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Route output through the test harness capture instead of stderr.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }

    /// Filter directives in effect: the configured ones, else `RUST_LOG`,
    /// else `None` for the `info` fallback.
    fn filters(&self) -> Option<String> {
        self.env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
    }

    fn builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        match self.filters() {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(log::LevelFilter::Info);
            }
        }
        builder.write_style(self.write_style).is_test(self.is_test);
        builder
    }
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Initializes the global logger once; later calls return the first outcome.
///
/// Returns `false` when another logger was installed before the first call,
/// in which case driver records go to that logger. Resource lifecycle events
/// are logged at `trace` and per-flush summaries at `debug`, so
/// `glint_driver=debug` is a useful setting while integrating an engine.
pub fn init_logging(config: LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        let installed = config.builder().try_init().is_ok();
        if installed {
            log::debug!("logging initialized");
        }
        installed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_filter_wins_over_environment() {
        let config = LoggingConfig::with_filter("glint_driver=trace");
        assert_eq!(config.filters().as_deref(), Some("glint_driver=trace"));

        let logger = config.builder().build();
        assert_eq!(logger.filter(), log::LevelFilter::Trace);
    }

    #[test]
    fn repeated_init_keeps_first_outcome() {
        let config = LoggingConfig {
            is_test: true,
            ..LoggingConfig::with_filter("glint_driver=debug")
        };
        let first = init_logging(config.clone());
        let second = init_logging(config);

        assert_eq!(first, second);
        if first {
            assert_eq!(log::max_level(), log::LevelFilter::Debug);
        }
    }
}
