//! Trace destinations: the live log and the per-session replay dump
//!
//! Both are flushed after every write so that the last line survives a
//! crash. Write failures are reported through `tracing` and otherwise
//! ignored: the traced operation must complete as if nothing was watching.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use tracing::warn;

use crate::config::DumpFactory;

/// Timestamp layout of the dump header, e.g. `Tue, 3 Mar 2026 14:05:09 +0100`
const DUMP_TIMESTAMP_FORMAT: &str = "%a, %-d %b %Y %H:%M:%S %z";

/// Line oriented UTF-8 trace stream, shared by a terminal and its sessions
#[derive(Clone)]
pub struct LogStream {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStream").finish_non_exhaustive()
    }
}

impl LogStream {
    /// Create a stream writing to `writer`
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Create a stream writing to the process standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write `text` followed by a newline
    pub(crate) fn line(&self, text: &str) {
        self.write(format_args!("{text}\n"));
    }

    /// Write `text` without ending the line
    ///
    /// Used in front of a blocking call whose outcome completes the line.
    pub(crate) fn begin(&self, text: &str) {
        self.write(format_args!("{text}"));
    }

    fn write(&self, args: fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_fmt(args).and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to write trace log");
        }
    }
}

/// Replay dump of one session
pub(crate) struct ReplayDump {
    out: Box<dyn Write + Send>,
}

impl fmt::Debug for ReplayDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayDump").finish_non_exhaustive()
    }
}

impl ReplayDump {
    /// Open a new dump through `factory`
    pub(crate) fn open(factory: &DumpFactory) -> io::Result<Self> {
        Ok(Self { out: factory()? })
    }

    /// Write the header block that precedes every exchange
    pub(crate) fn write_header(&mut self, terminal: &str, atr: &[u8], protocol: &str) {
        let generated = Local::now().format(DUMP_TIMESTAMP_FORMAT);
        self.write(format_args!(
            "# Generated on {generated} by {}/{}\n# Using {terminal}\n# ATR: {}\n# PROTOCOL: {protocol}\n#\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            hex::encode_upper(atr),
        ));
    }

    /// Record one command/response exchange
    pub(crate) fn write_exchange(&mut self, sent: &[u8], received: &[u8], elapsed: &str) {
        self.write(format_args!(
            "# Sent\n{}\n# Received in {elapsed}\n{}\n",
            hex::encode_upper(sent),
            hex::encode_upper(received),
        ));
    }

    /// Flush and release the destination
    pub(crate) fn close(mut self) {
        if let Err(e) = self.out.flush() {
            warn!(error = %e, "Failed to flush replay dump");
        }
    }

    fn write(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|()| self.out.flush()) {
            warn!(error = %e, "Failed to write replay dump");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_log_stream_lines() {
        let capture = Capture::default();
        let log = LogStream::new(capture.clone());

        log.begin("SCardConnect(\"Reader\", T=*)");
        log.line(" -> T=1, 3B00");
        log.line("SCardDisconnect(\"Reader\", false) tx:0/rx:0");

        assert_eq!(
            capture.text(),
            "SCardConnect(\"Reader\", T=*) -> T=1, 3B00\nSCardDisconnect(\"Reader\", false) tx:0/rx:0\n"
        );
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let log = LogStream::new(Broken);
        log.line("A>> T=1 (4+0000) 00A40400");

        let factory: DumpFactory = Arc::new(|| Ok(Box::new(Broken) as Box<dyn Write + Send>));
        let mut dump = ReplayDump::open(&factory).unwrap();
        dump.write_exchange(&[0x00], &[0x90, 0x00], "1ms");
        dump.close();
    }

    #[test]
    fn test_dump_layout() {
        let capture = Capture::default();
        let sink = capture.clone();
        let factory: DumpFactory =
            Arc::new(move || Ok(Box::new(sink.clone()) as Box<dyn Write + Send>));

        let mut dump = ReplayDump::open(&factory).unwrap();
        dump.write_header("Reader 0", &[0x3B, 0x65], "T=1");
        dump.write_exchange(&[0x00, 0xA4, 0x04, 0x00, 0x00], &[0x90, 0x00], "3ms");
        dump.close();

        let text = capture.text();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("# Generated on "));
        assert!(lines[0].ends_with(concat!(" by apdu-trace/", env!("CARGO_PKG_VERSION"))));
        assert_eq!(
            &lines[1..],
            &[
                "# Using Reader 0",
                "# ATR: 3B65",
                "# PROTOCOL: T=1",
                "#",
                "# Sent",
                "00A4040000",
                "# Received in 3ms",
                "9000",
            ]
        );
    }
}
