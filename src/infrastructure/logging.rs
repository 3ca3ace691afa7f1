use std::io::{self, Write};

use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(stdout_writer(config.unbuffered))
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(stdout_writer(config.unbuffered))
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }

    tracing::info!(
        unbuffered = config.unbuffered,
        "Logging initialized with level: {}",
        config.level
    );
}

fn stdout_writer(unbuffered: bool) -> BoxMakeWriter {
    if unbuffered {
        BoxMakeWriter::new(FlushingMakeWriter::new(io::stdout))
    } else {
        BoxMakeWriter::new(io::stdout)
    }
}

/// Wraps a `MakeWriter` so every event is flushed as soon as it is written.
///
/// The fmt layer asks for one writer per event and drops it afterwards,
/// so flushing on drop means nothing is held back between events.
#[derive(Debug, Clone)]
pub struct FlushingMakeWriter<M> {
    inner: M,
}

impl<M> FlushingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for FlushingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = FlushOnDrop<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        FlushOnDrop(self.inner.make_writer())
    }
}

/// Writer that flushes its inner writer when dropped
pub struct FlushOnDrop<W: Write>(W);

impl<W: Write> Write for FlushOnDrop<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Drop for FlushOnDrop<W> {
    fn drop(&mut self) {
        let _ = self.0.flush();
    }
}
