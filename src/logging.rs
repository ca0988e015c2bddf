use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Operator-facing tracing formatter for the long-running daemon.
///
/// Each line carries a UTC timestamp (the refresh loop is all about
/// recency, so operators need to line log output up against record
/// timestamps), a level tag colored by severity, and the event fields.
pub struct DaemonFormatter;

impl<S, N> FormatEvent<S, N> for DaemonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let level = match *event.metadata().level() {
            Level::ERROR => "ERROR".red().bold(),
            Level::WARN => " WARN".yellow(),
            Level::INFO => " INFO".green(),
            Level::DEBUG => "DEBUG".blue(),
            Level::TRACE => "TRACE".purple(),
        };

        write!(writer, "{} {} ", timestamp, level)?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
