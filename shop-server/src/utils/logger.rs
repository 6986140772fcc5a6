//! Logging Infrastructure
//!
//! Console output by default; daily rolling files under `LOG_DIR` when
//! set. `RUST_LOG` overrides the configured level.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber
pub fn init_logger(log_level: &str, json: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("shop_server={log_level},tower_http={log_level}"))
    });

    // Target stays on so `security` events are distinguishable
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    let result = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "shop-server");
            if json {
                builder.json().with_writer(file_appender).try_init()
            } else {
                builder.with_ansi(false).with_writer(file_appender).try_init()
            }
        }
        None if json => builder.json().try_init(),
        None => builder.try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logger: {e}"))
}

/// Security event on the `security` target
///
/// ```ignore
/// security_log!(WARN, "webhook_signature_rejected", gateway = "paystack");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Utc::now().to_rfc3339(),
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Utc::now().to_rfc3339(),
            $($arg)*
        );
    };
}
