//! Line formats for named loggers.

use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineStyle {
    /// `[name - timestamp]   LEVEL message`
    Console,
    /// `timestamp - name - LEVEL - message`
    File,
}

/// Event formatter that stamps every line with the logger name.
pub(crate) struct NamedFormat {
    name: Arc<str>,
    style: LineStyle,
}

impl NamedFormat {
    pub(crate) fn new(name: Arc<str>, style: LineStyle) -> Self {
        Self { name, style }
    }
}

impl<S, N> FormatEvent<S, N> for NamedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
        let level = *event.metadata().level();

        match self.style {
            LineStyle::Console => {
                write!(writer, "[{} - {}]   ", self.name, now)?;
                if writer.has_ansi_escapes() {
                    write!(
                        writer,
                        "{}{:<5}{} ",
                        level_color(level),
                        level_name(level),
                        RESET
                    )?;
                } else {
                    write!(writer, "{:<5} ", level_name(level))?;
                }
            }
            LineStyle::File => {
                write!(writer, "{} - {} - {} - ", now, self.name, level_name(level))?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writer.write_char('\n')
    }
}

pub(crate) fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        _ => "TRACE",
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        _ => "\x1b[35m",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_name(Level::WARN), "WARN");
        assert_eq!(level_name(Level::TRACE), "TRACE");
    }
}
