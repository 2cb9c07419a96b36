//! Configuration options for the tracing decorator

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use apdu_trace_core::Error;

use crate::sink::LogStream;

/// Turns a transport error into a short human readable message
///
/// Returning `None` makes the trace fall back to a generic failure marker.
pub type ErrorTranslator = fn(&Error) -> Option<String>;

/// Opens the replay dump destination, once per connected session
pub type DumpFactory = Arc<dyn Fn() -> io::Result<Box<dyn Write + Send>> + Send + Sync>;

/// Configuration options for [`LoggingTerminal`](crate::LoggingTerminal)
pub struct TraceConfig {
    /// Live trace destination
    log: LogStream,

    /// Replay dump destination, if any
    dump: Option<DumpFactory>,

    /// Error translation used for failure lines
    translator: ErrorTranslator,
}

impl fmt::Debug for TraceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceConfig")
            .field("log", &self.log)
            .field("has_dump", &self.dump.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            log: LogStream::stdout(),
            dump: None,
            translator: Error::reason,
        }
    }
}

impl TraceConfig {
    /// Create a new default configuration: trace to stdout, no dump
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the live trace to `writer`
    pub fn with_log<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.log = LogStream::new(writer);
        self
    }

    /// Write the live trace to an existing, possibly shared, stream
    pub fn with_log_stream(mut self, log: LogStream) -> Self {
        self.log = log;
        self
    }

    /// Append the replay dump of every session to the file at `path`
    ///
    /// The file is created if missing and opened in append mode at each
    /// connect, so earlier sessions are never overwritten.
    pub fn with_dump_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.dump = Some(Arc::new(move || {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            Ok(Box::new(file) as Box<dyn Write + Send>)
        }));
        self
    }

    /// Open the replay dump of every session with `factory`
    pub fn with_dump<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> io::Result<Box<dyn Write + Send>> + Send + Sync + 'static,
    {
        self.dump = Some(Arc::new(factory));
        self
    }

    /// Set the error translation used for failure lines
    pub fn with_translator(mut self, translator: ErrorTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Split into the parts kept by the terminal
    pub(crate) fn into_parts(self) -> (LogStream, Option<DumpFactory>, ErrorTranslator) {
        (self.log, self.dump, self.translator)
    }
}
