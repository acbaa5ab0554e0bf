use crate::error::Error;

/// Sequence-number width negotiated by RRC. Determines both the wire format
/// (`src/pdu/header.rs`, `src/pdu/status.rs`) and the window/modulus
/// arithmetic (`src/sn.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnWidth {
    Ten,
    Twelve,
    Eighteen,
}

impl SnWidth {
    pub fn bits(self) -> u8 {
        match self {
            SnWidth::Ten => 10,
            SnWidth::Twelve => 12,
            SnWidth::Eighteen => 18,
        }
    }

    pub fn is_lte(self) -> bool {
        matches!(self, SnWidth::Ten)
    }

    pub fn from_bits(bits: u8) -> Result<Self, Error> {
        match bits {
            10 => Ok(SnWidth::Ten),
            12 => Ok(SnWidth::Twelve),
            18 => Ok(SnWidth::Eighteen),
            other => Err(Error::InvalidSnWidth(other)),
        }
    }
}

/// RRC-supplied configuration for one AM bearer. See spec §6 "Configuration".
#[derive(Debug, Clone)]
pub struct Config {
    pub sn_width: SnWidth,
    pub t_poll_retx_ms: u64,
    pub t_reassembly_ms: u64,
    pub t_status_prohibit_ms: u64,
    pub poll_pdu: u32,
    pub poll_byte: u32,
    pub max_retx_thresh: u32,
    pub tx_queue_length: usize,
    /// LTE-only fail-safe periodicity (spec §4.5): when both `poll_pdu` and
    /// `poll_byte` are disabled, poll every `poll_periodicity` new PDUs.
    /// Ignored for NR.
    pub poll_periodicity: u32,
}

const MAX_TX_QUEUE_LEN: usize = 4096;

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.max_retx_thresh, 1 | 2 | 4 | 8 | 16 | 32) {
            return Err(Error::InvalidMaxRetxThresh(self.max_retx_thresh));
        }
        if self.tx_queue_length == 0 || self.tx_queue_length > MAX_TX_QUEUE_LEN {
            return Err(Error::InvalidTxQueueLength(self.tx_queue_length));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sn_width: SnWidth::Twelve,
            t_poll_retx_ms: 45,
            t_reassembly_ms: 35,
            t_status_prohibit_ms: 0,
            poll_pdu: 4,
            poll_byte: 0,
            max_retx_thresh: 4,
            tx_queue_length: 256,
            poll_periodicity: 16,
        }
    }
}
