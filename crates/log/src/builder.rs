//! Subscriber assembly

use std::fmt;
use std::io;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{Config, Format, WriterConfig};
use crate::error::{LogError, LogResult};

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Fully assembled subscriber, not yet installed
pub type LocksmithSubscriber = Layered<BoxedLayer, Filtered>;

macro_rules! create_fmt_layer {
    ($format:ident, $display:expr, $writer:expr) => {{
        let layer = tracing_subscriber::fmt::layer()
            .$format()
            .with_writer($writer)
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids);

        if $display.time {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    }};
}

macro_rules! create_json_layer {
    ($display:expr, $writer:expr) => {{
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event($display.flatten)
            .with_writer($writer)
            .with_ansi(false)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids);

        if $display.time {
            layer.boxed()
        } else {
            layer.without_time().boxed()
        }
    }};
}

/// Builds the tracing subscriber from a [`Config`]
pub struct LoggerBuilder {
    config: Config,
    writer: Option<BoxMakeWriter>,
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("config", &self.config)
            .field("custom_writer", &self.writer.is_some())
            .finish()
    }
}

impl LoggerBuilder {
    /// Create builder from config
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            writer: None,
        }
    }

    /// Write to a custom destination instead of the configured one
    pub fn with_writer(mut self, writer: BoxMakeWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Assemble the subscriber without installing it
    ///
    /// # Errors
    ///
    /// * `LogError::Filter` if the level directive does not parse
    pub fn subscriber(self) -> LogResult<LocksmithSubscriber> {
        let filter = EnvFilter::try_new(&self.config.level).map_err(|e| LogError::Filter {
            filter: self.config.level.clone(),
            reason: e.to_string(),
        })?;

        let writer = self.writer.unwrap_or_else(|| match self.config.writer {
            WriterConfig::Stderr => BoxMakeWriter::new(io::stderr),
            WriterConfig::Stdout => BoxMakeWriter::new(io::stdout),
        });

        let display = self.config.display;
        let fmt_layer: BoxedLayer = match self.config.format {
            Format::Pretty => create_fmt_layer!(pretty, display, writer),
            Format::Compact => create_fmt_layer!(compact, display, writer),
            Format::Json => create_json_layer!(display, writer),
        };

        Ok(Registry::default().with(filter).with(fmt_layer))
    }

    /// Build the subscriber and install it as the global default
    ///
    /// # Errors
    ///
    /// * `LogError::Filter` if the level directive does not parse
    /// * `LogError::Init` if a global subscriber is already set
    pub fn build(self) -> LogResult<()> {
        self.subscriber()?
            .try_init()
            .map_err(|e| LogError::Init {
                reason: e.to_string(),
            })
    }
}
