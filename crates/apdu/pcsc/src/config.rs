//! Configuration options for PC/SC terminals

use pcsc::{Disposition, Protocols as PcscProtocols, ShareMode as PcscShareMode};

use crate::error::PcscError;

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    Shared,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
        }
    }
}

/// What happens to the card when a session ends with a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Warm reset (default)
    Reset,
    /// Power the card down
    Unpower,
}

impl From<ResetMode> for Disposition {
    fn from(mode: ResetMode) -> Self {
        match mode {
            ResetMode::Reset => Self::ResetCard,
            ResetMode::Unpower => Self::UnpowerCard,
        }
    }
}

/// Configuration options for PC/SC terminals
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Sharing mode used outside of exclusive sections
    pub share_mode: ShareMode,

    /// Disposition applied by `disconnect(true)`
    pub reset_mode: ResetMode,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            reset_mode: ResetMode::Reset,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the disposition used when disconnecting with a reset
    pub const fn with_reset_mode(mut self, mode: ResetMode) -> Self {
        self.reset_mode = mode;
        self
    }

    /// Share mode and protocol mask for a requested protocol
    ///
    /// `DIRECT` talks to the reader itself and always uses direct sharing.
    pub(crate) fn connection(
        &self,
        protocol: &str,
    ) -> Result<(PcscShareMode, PcscProtocols), PcscError> {
        let protocols = match protocol {
            "*" => PcscProtocols::ANY,
            "T=0" => PcscProtocols::T0,
            "T=1" => PcscProtocols::T1,
            "DIRECT" => return Ok((PcscShareMode::Direct, PcscProtocols::UNDEFINED)),
            other => return Err(PcscError::UnsupportedProtocol(other.to_string())),
        };
        Ok((self.share_mode.into(), protocols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_mapping() {
        let config = PcscConfig::default();

        assert_eq!(
            config.connection("*").unwrap(),
            (PcscShareMode::Shared, PcscProtocols::ANY)
        );
        assert_eq!(
            config.connection("T=1").unwrap(),
            (PcscShareMode::Shared, PcscProtocols::T1)
        );
        assert_eq!(
            config.connection("DIRECT").unwrap(),
            (PcscShareMode::Direct, PcscProtocols::UNDEFINED)
        );
        assert!(matches!(
            config.connection("T=CL"),
            Err(PcscError::UnsupportedProtocol(p)) if p == "T=CL"
        ));
    }

    #[test]
    fn test_builder() {
        let config = PcscConfig::new()
            .with_share_mode(ShareMode::Exclusive)
            .with_reset_mode(ResetMode::Unpower);

        assert_eq!(config.share_mode, ShareMode::Exclusive);
        assert_eq!(config.reset_mode, ResetMode::Unpower);
        assert_eq!(
            config.connection("T=0").unwrap(),
            (PcscShareMode::Exclusive, PcscProtocols::T0)
        );
    }
}
