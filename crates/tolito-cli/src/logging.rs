use std::{
    fmt::{self as stdfmt, Write as _},
    io::{self, Write},
};

use nu_ansi_term::Color::{self, Blue, DarkGray, Magenta, Red, Yellow};
use tracing::{
    field::{Field, Visit},
    Event, Level, Metadata, Subscriber,
};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
    EnvFilter,
};

use crate::{cli::Args, utils::Colored};

/// Collects the message and renders any structured fields as `key=value`.
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: String,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

fn level_prefix(level: &Level) -> Option<(Color, &'static str)> {
    match *level {
        Level::TRACE => Some((Magenta, "trace:")),
        Level::DEBUG => Some((Blue, "debug:")),
        Level::INFO => None,
        Level::WARN => Some((Yellow, "warning:")),
        Level::ERROR => Some((Red, "error:")),
    }
}

/// pacman-like lines: bare info messages, `warning:`/`error:` prefixes for everything else.
pub struct PacmanFormatter;

impl<S, N> FormatEvent<S, N> for PacmanFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let mut collected = FieldCollector::default();
        event.record(&mut collected);

        if let Some((color, prefix)) = level_prefix(event.metadata().level()) {
            write!(writer, "{} ", Colored(color, prefix))?;
        }
        write!(writer, "{}", collected.message)?;
        if !collected.fields.is_empty() {
            write!(writer, "{}", Colored(DarkGray, &collected.fields))?;
        }
        writeln!(writer)
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Holds one formatted event and emits it in a single write once the event is done,
/// with progress bars hidden for the duration.
struct LineWriter {
    stream: Stream,
    buffer: Vec<u8>,
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if self.buffer.last() != Some(&b'\n') {
            self.buffer.push(b'\n');
        }

        let buffer = std::mem::take(&mut self.buffer);
        let stream = self.stream;
        crate::progress::suspend(|| {
            let _ = match stream {
                Stream::Stdout => io::stdout().lock().write_all(&buffer),
                Stream::Stderr => io::stderr().lock().write_all(&buffer),
            };
        });
    }
}

/// Info goes to stdout, every other level to stderr.
struct SplitWriter;

impl<'a> MakeWriter<'a> for SplitWriter {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            stream: Stream::Stdout,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        let stream = if *meta.level() == Level::INFO {
            Stream::Stdout
        } else {
            Stream::Stderr
        };
        LineWriter {
            stream,
            buffer: Vec::new(),
        }
    }
}

fn filter_level(args: &Args) -> Level {
    match (args.quiet, args.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `-v`/`-q`.
pub fn setup_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tolito={}", filter_level(args))));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(SplitWriter)
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(PacmanFormatter).finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already set");
    }
}
