//! Tests against a live PC/SC service; skipped when none is available

use std::time::Duration;

use apdu_trace_core::prelude::*;

mod common;

#[test]
fn test_list_readers() {
    let Some(manager) = common::get_manager() else {
        println!("Skipping test, PC/SC not available");
        return;
    };

    let readers = manager.list_readers().unwrap();
    for reader in &readers {
        assert!(!reader.name().is_empty());
        assert_eq!(reader.has_card(), reader.atr().is_some());
    }
    assert_eq!(manager.terminals().unwrap().len(), readers.len());
}

#[test]
fn test_unknown_reader() {
    let Some(manager) = common::get_manager() else {
        println!("Skipping test, PC/SC not available");
        return;
    };

    let err = manager.terminal("No Such Reader 42").unwrap_err();
    assert!(matches!(
        err,
        apdu_trace_pcsc::PcscError::ReaderNotFound(name) if name == "No Such Reader 42"
    ));
}

#[test]
fn test_select_and_disconnect() {
    let Some(terminal) = common::get_terminal_with_card() else {
        println!("Skipping test, no card available");
        return;
    };

    assert!(terminal.is_card_present().unwrap());
    assert!(terminal.wait_for_card_present(Duration::from_millis(10)).unwrap());

    let card = terminal.connect("*").unwrap();
    assert!(!card.atr().is_empty());
    assert!(matches!(card.protocol(), "T=0" | "T=1"));

    // SELECT with empty AID; any status word is fine
    let response = card
        .basic_channel()
        .transmit(&Command::new_with_le(0x00, 0xA4, 0x04, 0x00, 256))
        .unwrap();
    println!("Status: {}", response.status());

    card.disconnect(false).unwrap();
}
