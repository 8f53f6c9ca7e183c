use std::{
    str::FromStr,
    sync::{Once, OnceLock},
};

use env_logger::{Builder, Env, Logger};
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::RwLock;

use crate::error::{EngineErr, Result};

static LOGGER: OnceLock<ReloadableLogger> = OnceLock::new();
static INSTALL: Once = Once::new();

/// The process logger, its filter is replaced on every reconfiguration.
#[derive(Default)]
struct ReloadableLogger {
    inner: RwLock<Option<Logger>>,
}

impl Log for ReloadableLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner
            .read()
            .as_ref()
            .is_some_and(|logger| logger.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        if let Some(logger) = self.inner.read().as_ref() {
            logger.log(record);
        }
    }

    fn flush(&self) {
        if let Some(logger) = self.inner.read().as_ref() {
            logger.flush();
        }
    }
}

/// Installs the process logger, honoring `RUST_LOG` when no level is given.
///
/// Later calls rebuild the filter, so they can both raise and lower the
/// verbosity.
///
/// # Arguments
/// * `level` - The maximum level to log, one of `off`, `error`, `warn`, `info`,
///   `debug` or `trace`.
///
/// # Returns
/// An `InvalidConfig` error if the level can't be parsed.
pub fn configure_logging(level: Option<&str>) -> Result<()> {
    let level = level
        .map(|l| {
            LevelFilter::from_str(l)
                .map_err(|_| EngineErr::invalid(format!("unknown log level {l}")))
        })
        .transpose()?;

    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }

    let logger = builder.build();
    let max_level = logger.filter();

    let reloadable = LOGGER.get_or_init(ReloadableLogger::default);
    *reloadable.inner.write() = Some(logger);

    // A logger installed by the host application takes precedence.
    INSTALL.call_once(|| {
        let _ = log::set_logger(reloadable);
    });
    log::set_max_level(max_level);

    Ok(())
}
