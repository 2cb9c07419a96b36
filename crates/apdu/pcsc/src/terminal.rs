//! PC/SC implementation of the transport traits

use std::ffi::CString;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use apdu_trace_core::prelude::*;
use parking_lot::Mutex;
use pcsc::{Context, Disposition, Protocol, Protocols, ReaderState, State};
use tracing::{debug, trace};

use crate::config::{PcscConfig, ResetMode, ShareMode};
use crate::error::PcscError;
use crate::reader::card_present;

/// Connection shared by a card and its channels, `None` once disconnected
type SharedCard = Arc<Mutex<Option<pcsc::Card>>>;

/// A PC/SC reader
pub struct PcscTerminal {
    context: Context,
    name: String,
    reader: CString,
    config: PcscConfig,
}

impl fmt::Debug for PcscTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTerminal")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PcscTerminal {
    pub(crate) fn new(context: Context, name: &str, config: PcscConfig) -> Result<Self, PcscError> {
        let reader =
            CString::new(name).map_err(|_| PcscError::InvalidReaderName(name.to_string()))?;
        Ok(Self {
            context,
            name: name.to_string(),
            reader,
            config,
        })
    }

    /// Current state of this reader, without waiting
    fn poll(&self) -> Result<ReaderState, PcscError> {
        let mut states = [ReaderState::new(self.reader.clone(), State::UNAWARE)];
        self.context.get_status_change(Some(Duration::ZERO), &mut states)?;
        let [state] = states;
        Ok(state)
    }

    /// Block until card presence equals `present`, `false` on timeout
    fn wait_for(&self, present: bool, timeout: Duration) -> Result<bool, PcscError> {
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let mut states = [self.poll()?];

        loop {
            if card_present(states[0].event_state()) == present {
                return Ok(true);
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(false);
                    }
                    Some(left)
                }
                None => None,
            };

            states[0].sync_current_state();
            match self.context.get_status_change(remaining, &mut states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl CardTerminal for PcscTerminal {
    type Card = PcscCard;

    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&self, protocol: &str) -> Result<Self::Card> {
        let (share_mode, protocols) = self.config.connection(protocol)?;
        let card = self
            .context
            .connect(&self.reader, share_mode, protocols)
            .map_err(PcscError::from)?;
        let status = card.status2_owned().map_err(PcscError::from)?;

        let atr = Bytes::copy_from_slice(status.atr());
        let negotiated = protocol_name(status.protocol2());
        debug!(reader = %self.name, protocol = negotiated, "Connected to card");

        Ok(PcscCard {
            card: Arc::new(Mutex::new(Some(card))),
            atr,
            protocol: negotiated.to_string(),
            protocols,
            share_mode: self.config.share_mode,
            reset_mode: self.config.reset_mode,
        })
    }

    fn is_card_present(&self) -> Result<bool> {
        Ok(card_present(self.poll()?.event_state()))
    }

    fn wait_for_card_present(&self, timeout: Duration) -> Result<bool> {
        Ok(self.wait_for(true, timeout)?)
    }

    fn wait_for_card_absent(&self, timeout: Duration) -> Result<bool> {
        Ok(self.wait_for(false, timeout)?)
    }
}

/// A connected PC/SC card
pub struct PcscCard {
    card: SharedCard,
    atr: Bytes,
    protocol: String,
    protocols: Protocols,
    share_mode: ShareMode,
    reset_mode: ResetMode,
}

impl fmt::Debug for PcscCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscCard")
            .field("atr", &self.atr)
            .field("protocol", &self.protocol)
            .field("connected", &self.card.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl PcscCard {
    /// Reconnect in `mode`, keeping the card powered
    fn reshare(&mut self, mode: ShareMode) -> Result<()> {
        let mut guard = self.card.lock();
        let card = guard.as_mut().ok_or(PcscError::NotConnected)?;
        card.reconnect(mode.into(), self.protocols, Disposition::LeaveCard)
            .map_err(PcscError::from)?;
        debug!(?mode, "Reconnected");
        Ok(())
    }
}

impl Card for PcscCard {
    type Channel = PcscChannel;

    fn atr(&self) -> &[u8] {
        &self.atr
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn basic_channel(&self) -> Self::Channel {
        PcscChannel {
            card: Arc::clone(&self.card),
        }
    }

    fn open_logical_channel(&mut self) -> Result<Self::Channel> {
        Err(Error::Unsupported("PC/SC logical channels"))
    }

    fn begin_exclusive(&mut self) -> Result<()> {
        self.reshare(ShareMode::Exclusive)
    }

    fn end_exclusive(&mut self) -> Result<()> {
        let mode = self.share_mode;
        self.reshare(mode)
    }

    fn transmit_control_command(&mut self, code: u32, data: &[u8]) -> Result<Bytes> {
        let guard = self.card.lock();
        let card = guard.as_ref().ok_or(PcscError::NotConnected)?;

        let mut buffer = vec![0u8; pcsc::MAX_BUFFER_SIZE];
        let result = card
            .control(code.into(), data, &mut buffer)
            .map_err(PcscError::from)?;
        Ok(Bytes::copy_from_slice(result))
    }

    fn disconnect(self, reset: bool) -> Result<()> {
        let Some(card) = self.card.lock().take() else {
            return Err(PcscError::NotConnected.into());
        };

        let disposition: Disposition = if reset {
            self.reset_mode.into()
        } else {
            Disposition::LeaveCard
        };
        card.disconnect(disposition)
            .map_err(|(_, e)| PcscError::from(e))?;
        debug!(reset, "Disconnected from card");
        Ok(())
    }
}

/// The basic channel of a PC/SC card
pub struct PcscChannel {
    card: SharedCard,
}

impl fmt::Debug for PcscChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscChannel")
            .field("connected", &self.card.lock().is_some())
            .finish()
    }
}

impl CardChannel for PcscChannel {
    fn channel_number(&self) -> u8 {
        0
    }

    fn transmit(&mut self, command: &Command) -> Result<Response> {
        let mut response = BytesMut::new();
        self.transmit_buffer(&command.to_bytes()?, &mut response)?;
        Response::from_bytes(response.freeze())
    }

    fn transmit_buffer(&mut self, command: &[u8], response: &mut BytesMut) -> Result<usize> {
        let guard = self.card.lock();
        let card = guard.as_ref().ok_or(PcscError::NotConnected)?;

        let mut buffer = vec![0u8; pcsc::MAX_BUFFER_SIZE_EXTENDED];
        let received = card
            .transmit(command, &mut buffer)
            .map_err(PcscError::from)?;
        trace!(
            command = %hex::encode_upper(command),
            response = %hex::encode_upper(received),
            "Exchanged APDU"
        );

        response.extend_from_slice(received);
        Ok(received.len())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Protocol name as reported to callers
fn protocol_name(protocol: Option<Protocol>) -> &'static str {
    match protocol {
        Some(Protocol::T0) => "T=0",
        Some(Protocol::T1) => "T=1",
        _ => "DIRECT",
    }
}
