//! Bridge from `hookscope_config::Config` to telemetry types.

use hookscope_config::Config;
use hookscope_telemetry::{LogConfig, LogFormat};

/// Convert the `[logging]` section to a [`LogConfig`].
///
/// An unrecognized format falls back to compact; validation has already
/// rejected those for loaded configs.
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}
