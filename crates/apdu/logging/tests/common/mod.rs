//! Common test utilities: a scripted in-memory reader and capture writers

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use apdu_trace_core::prelude::*;
use parking_lot::Mutex;

/// ATR reported by the mock card
pub const ATR: &[u8] = &[0x3B, 0x65, 0x00, 0x00, 0x9C, 0x02, 0x02, 0x01, 0x02];

/// Reader name reported by the mock terminal
pub const READER: &str = "Mock Reader 0";

/// Calls that reached the mock transport, in order
pub type Journal = Arc<Mutex<Vec<String>>>;

/// One scripted answer of the mock transport
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return these bytes
    Respond(Vec<u8>),
    /// Fail with this driver code
    Fail(u32),
}

/// Queue of answers shared by a mock card and its channels
pub type Script = Arc<Mutex<VecDeque<Reply>>>;

/// An in-memory reader with a scripted card
#[derive(Debug, Clone)]
pub struct MockTerminal {
    pub journal: Journal,
    pub script: Script,
    pub protocol: String,
    pub connect_error: Option<u32>,
    pub present: bool,
}

impl MockTerminal {
    pub fn new() -> Self {
        Self {
            journal: Journal::default(),
            script: Script::default(),
            protocol: "T=1".to_string(),
            connect_error: None,
            present: true,
        }
    }

    /// Fail every connect with `code`
    pub fn failing_connect(code: u32) -> Self {
        Self {
            connect_error: Some(code),
            ..Self::new()
        }
    }

    /// Queue the next answer
    pub fn reply(&self, reply: Reply) {
        self.script.lock().push_back(reply);
    }

    /// Queue a successful answer given as hex
    pub fn respond(&self, hex: &str) {
        self.reply(Reply::Respond(hex::decode(hex).unwrap()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

impl CardTerminal for MockTerminal {
    type Card = MockCard;

    fn name(&self) -> &str {
        READER
    }

    fn connect(&self, protocol: &str) -> Result<Self::Card> {
        self.journal.lock().push(format!("connect {protocol}"));
        if let Some(code) = self.connect_error {
            return Err(Error::driver(code));
        }
        Ok(MockCard {
            journal: Arc::clone(&self.journal),
            script: Arc::clone(&self.script),
            protocol: self.protocol.clone(),
        })
    }

    fn is_card_present(&self) -> Result<bool> {
        self.journal.lock().push("is_card_present".to_string());
        Ok(self.present)
    }

    fn wait_for_card_present(&self, timeout: Duration) -> Result<bool> {
        self.journal
            .lock()
            .push(format!("wait_for_card_present {}", timeout.as_millis()));
        Ok(self.present)
    }

    fn wait_for_card_absent(&self, timeout: Duration) -> Result<bool> {
        self.journal
            .lock()
            .push(format!("wait_for_card_absent {}", timeout.as_millis()));
        Ok(!self.present)
    }
}

#[derive(Debug)]
pub struct MockCard {
    journal: Journal,
    script: Script,
    protocol: String,
}

impl Card for MockCard {
    type Channel = MockChannel;

    fn atr(&self) -> &[u8] {
        ATR
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn basic_channel(&self) -> Self::Channel {
        MockChannel {
            journal: Arc::clone(&self.journal),
            script: Arc::clone(&self.script),
        }
    }

    fn open_logical_channel(&mut self) -> Result<Self::Channel> {
        self.journal.lock().push("open_logical_channel".to_string());
        Ok(self.basic_channel())
    }

    fn begin_exclusive(&mut self) -> Result<()> {
        self.journal.lock().push("begin_exclusive".to_string());
        Ok(())
    }

    fn end_exclusive(&mut self) -> Result<()> {
        self.journal.lock().push("end_exclusive".to_string());
        Ok(())
    }

    fn transmit_control_command(&mut self, code: u32, data: &[u8]) -> Result<Bytes> {
        self.journal
            .lock()
            .push(format!("control {code:x} {}", hex::encode_upper(data)));
        next_reply(&self.script).map(Bytes::from)
    }

    fn disconnect(self, reset: bool) -> Result<()> {
        self.journal.lock().push(format!("disconnect {reset}"));
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockChannel {
    journal: Journal,
    script: Script,
}

impl CardChannel for MockChannel {
    fn channel_number(&self) -> u8 {
        0
    }

    fn transmit(&mut self, command: &Command) -> Result<Response> {
        self.journal
            .lock()
            .push(format!("transmit {}", hex::encode_upper(command.to_bytes()?)));
        Response::from_bytes(next_reply(&self.script)?)
    }

    fn transmit_buffer(&mut self, command: &[u8], response: &mut BytesMut) -> Result<usize> {
        self.journal
            .lock()
            .push(format!("transmit_buffer {}", hex::encode_upper(command)));
        let reply = next_reply(&self.script)?;
        response.extend_from_slice(&reply);
        Ok(reply.len())
    }

    fn close(&mut self) -> Result<()> {
        self.journal.lock().push("close".to_string());
        Ok(())
    }
}

/// Pop the next scripted answer, `9000` when the script is exhausted
fn next_reply(script: &Script) -> Result<Vec<u8>> {
    match script.lock().pop_front() {
        Some(Reply::Respond(bytes)) => Ok(bytes),
        Some(Reply::Fail(code)) => Err(Error::driver(code)),
        None => Ok(vec![0x90, 0x00]),
    }
}

/// A writer whose contents can be inspected after being handed out
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A dump writer that counts how often it was opened and released
#[derive(Debug)]
pub struct CountingWriter {
    buffer: SharedBuffer,
    dropped: Arc<AtomicUsize>,
}

impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buffer.flush()
    }
}

impl Drop for CountingWriter {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dump destination backed by a [`SharedBuffer`], with open/close counters
#[derive(Debug, Clone, Default)]
pub struct DumpRecorder {
    pub buffer: SharedBuffer,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl DumpRecorder {
    /// A factory suitable for `TraceConfig::with_dump`
    pub fn factory(&self) -> impl Fn() -> io::Result<Box<dyn Write + Send>> + Send + Sync + 'static {
        let recorder = self.clone();
        move || {
            recorder.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingWriter {
                buffer: recorder.buffer.clone(),
                dropped: Arc::clone(&recorder.closed),
            }) as Box<dyn Write + Send>)
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}
