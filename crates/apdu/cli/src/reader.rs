//! Readers available to the command line tool

use apdu_trace_pcsc::{PcscDeviceManager, PcscTerminal};

/// Terminal for the reader with a specific name
pub(crate) fn find_terminal_by_name(
    manager: &PcscDeviceManager,
    reader_name: &str,
) -> Result<PcscTerminal, Box<dyn std::error::Error>> {
    Ok(manager.terminal(reader_name)?)
}

/// Terminal for the first reader with a card inserted
pub(crate) fn find_terminal_with_card(
    manager: &PcscDeviceManager,
) -> Result<PcscTerminal, Box<dyn std::error::Error>> {
    manager
        .first_with_card()?
        .ok_or_else(|| "No card found in any reader!".into())
}

/// List all available readers
pub(crate) fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(());
    }

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        match reader.atr() {
            Some(atr) => println!("{}. {} (ATR {})", i + 1, reader.name(), hex::encode_upper(atr)),
            None => println!("{}. {} (no card)", i + 1, reader.name()),
        }
    }

    Ok(())
}
