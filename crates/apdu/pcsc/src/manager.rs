//! Reader discovery

use std::fmt;
use std::time::Duration;

use pcsc::{Context, ReaderState, Scope, State};
use tracing::debug;

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::PcscReader;
use crate::terminal::PcscTerminal;

/// Entry point to the PC/SC service
///
/// Holds the service context and hands out [`PcscTerminal`]s that share it.
pub struct PcscDeviceManager {
    context: Context,
    config: PcscConfig,
}

impl fmt::Debug for PcscDeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscDeviceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PcscDeviceManager {
    /// Establish a user scoped context with the default configuration
    pub fn new() -> Result<Self, PcscError> {
        Self::with_config(PcscConfig::default())
    }

    /// Establish a user scoped context; terminals inherit `config`
    pub fn with_config(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        debug!("Established PC/SC context");
        Ok(Self { context, config })
    }

    /// Snapshot of every connected reader
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let names = match self.context.list_readers_owned() {
            Ok(names) => names,
            Err(pcsc::Error::NoReadersAvailable) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut states: Vec<ReaderState> = names
            .into_iter()
            .map(|name| ReaderState::new(name, State::UNAWARE))
            .collect();
        self.context
            .get_status_change(Some(Duration::ZERO), &mut states)?;

        let readers: Vec<PcscReader> = states.iter().map(PcscReader::from_reader_state).collect();
        debug!(count = readers.len(), "Listed readers");
        Ok(readers)
    }

    /// Terminal for the reader called `name`
    pub fn terminal(&self, name: &str) -> Result<PcscTerminal, PcscError> {
        if !self.list_readers()?.iter().any(|r| r.name() == name) {
            return Err(PcscError::ReaderNotFound(name.to_string()));
        }
        PcscTerminal::new(self.context.clone(), name, self.config.clone())
    }

    /// Terminals for every connected reader
    pub fn terminals(&self) -> Result<Vec<PcscTerminal>, PcscError> {
        self.list_readers()?
            .iter()
            .map(|r| PcscTerminal::new(self.context.clone(), r.name(), self.config.clone()))
            .collect()
    }

    /// Terminal for the first reader holding a card, if any
    pub fn first_with_card(&self) -> Result<Option<PcscTerminal>, PcscError> {
        self.list_readers()?
            .iter()
            .find(|r| r.has_card())
            .map(|r| PcscTerminal::new(self.context.clone(), r.name(), self.config.clone()))
            .transpose()
    }
}
