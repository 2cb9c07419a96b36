//! Reader snapshot for PC/SC devices

use pcsc::{ReaderState, State};

/// A PC/SC reader as seen at listing time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcscReader {
    /// Name of the reader
    name: String,

    /// Answer To Reset of the inserted card, if any
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Create a new reader snapshot
    pub const fn new(name: String, atr: Option<Vec<u8>>) -> Self {
        Self { name, atr }
    }

    /// Reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a card was present
    pub const fn has_card(&self) -> bool {
        self.atr.is_some()
    }

    /// ATR of the card, if present
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    pub(crate) fn from_reader_state(state: &ReaderState) -> Self {
        let name = state.name().to_string_lossy().into_owned();
        let atr = card_present(state.event_state()).then(|| state.atr().to_vec());
        Self { name, atr }
    }
}

/// Whether `state` reports a card in the reader
pub(crate) fn card_present(state: State) -> bool {
    state.contains(State::PRESENT) && !state.contains(State::EMPTY)
}
