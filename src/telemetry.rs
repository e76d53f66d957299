//! Logging setup
//!
//! Console output in the configured format plus, when `log_dir` is set, a
//! daily rotated `areadb.log` file. `RUST_LOG` directives refine the
//! configured level.

use crate::config::{LogConfig, LogFormat};
use thiserror::Error;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to create log directory: {0}")]
    LogDir(#[from] std::io::Error),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber.
///
/// Fails if the log directory can not be created or a subscriber is
/// already installed.
pub fn init(config: &LogConfig) -> Result<(), TelemetryError> {
    let level = parse_level(&config.level);

    let console: BoxedLayer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .pretty()
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .compact()
            .boxed(),
        LogFormat::Json => fmt::layer().with_writer(std::io::stderr).json().boxed(),
    };

    let mut layers = vec![console];
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "areadb.log");
        layers.push(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()?;

    Ok(())
}

/// Parse a level name, falling back to `INFO`.
pub fn parse_level(level: &str) -> Level {
    level.parse::<Level>().unwrap_or(Level::INFO)
}

/// In-memory log sink for asserting on what was logged.
#[cfg(test)]
pub(crate) mod capture {
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }

        pub(crate) fn contains(&self, needle: &str) -> bool {
            self.text().contains(needle)
        }
    }

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Capture DEBUG and above on the current thread until the guard drops.
    pub(crate) fn install() -> (LogCapture, DefaultGuard) {
        let logs = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }
}
