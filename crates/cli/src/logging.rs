use markovrec_core::config::{LogFormat, LoggingConfig};
use markovrec_core::report::{ReportEvent, ReportOutcome, Reporter};
use tracing::Level;

/// Installs the global subscriber on stderr so stdout carries only the
/// command outcome. Later calls in the same process are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    let log_level = config.level.trim().parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Forwards run events to `tracing`; failures are logged at warn level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit(&self, event: ReportEvent) {
        let metadata = event
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");

        match event.outcome {
            ReportOutcome::Failed => tracing::warn!(
                event_name = %event.event_type,
                run_id = %event.run_id.0,
                category = ?event.category,
                outcome = ?event.outcome,
                "{metadata}"
            ),
            _ => tracing::info!(
                event_name = %event.event_type,
                run_id = %event.run_id.0,
                category = ?event.category,
                outcome = ?event.outcome,
                "{metadata}"
            ),
        }
    }
}
