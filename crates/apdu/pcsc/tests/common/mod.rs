//! Common test utilities

#![allow(dead_code)]

use apdu_trace_pcsc::{PcscDeviceManager, PcscTerminal};

/// A PC/SC manager, if the service is running
pub fn get_manager() -> Option<PcscDeviceManager> {
    PcscDeviceManager::new().ok()
}

/// The first reader holding a card, if any
pub fn get_terminal_with_card() -> Option<PcscTerminal> {
    get_manager()?.first_with_card().ok().flatten()
}
