use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Compact formatter: level glyph, level and local time, then the fields
pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let timestamp = Local::now().format("%H:%M:%S");
        let (glyph, level_str) = level_label(event.metadata().level());

        write!(writer, "{} {} [{}]: ", glyph, level_str, timestamp)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_label(level: &Level) -> (&'static str, &'static str) {
    match *level {
        Level::TRACE => ("·", "TRACE"),
        Level::DEBUG => ("◦", "DEBUG"),
        Level::INFO => ("ℹ", "INFO"),
        Level::WARN => ("⚠", "WARN"),
        Level::ERROR => ("✖", "ERROR"),
    }
}

/// Default filter directive; `RUST_LOG` takes precedence
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "rpgtest=debug" } else { "rpgtest=warn" }
}

/// Install the global subscriber, writing to stderr
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A second install (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .event_format(CustomFormatter)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
