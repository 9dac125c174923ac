use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard keeping the non-blocking file writer alive for the process lifetime.
pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialise logging. The default level is `info`; `debug` can be enabled via
/// the settings file, in which case `RUST_LOG` may override it further. With
/// `log_to_file` a daily-rolling log is written under `log_dir`.
pub fn init(debug: bool, log_to_file: bool, log_dir: &str) -> LogGuard {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        // Allow `RUST_LOG` to override the level when debug logging is enabled.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file_layer = if log_to_file {
        let appender = tracing_appender::rolling::daily(log_dir, "overkey.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Some((
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
            guard,
        ))
    } else {
        None
    };

    match file_layer {
        Some((layer, guard)) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(layer)
                .try_init();
            LogGuard {
                _file_guard: Some(guard),
            }
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init();
            LogGuard { _file_guard: None }
        }
    }
}
