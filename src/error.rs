use thiserror::Error;

/// Errors returned across the RRC/PDCP-facing boundary.
///
/// Internal discards (malformed PDU, out-of-window, duplicate, resource
/// exhaustion) are not modeled as errors — they are silent per the error
/// taxonomy and only produce a log line; see `src/tx.rs` and `src/rx.rs`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid sn_width {0}, must be 10, 12 or 18")]
    InvalidSnWidth(u8),
    #[error("invalid max_retx_thresh {0}, must be one of 1,2,4,8,16,32")]
    InvalidMaxRetxThresh(u32),
    #[error("invalid tx_queue_length {0}")]
    InvalidTxQueueLength(usize),
    #[error("tx sdu queue is full")]
    QueueFull,
    #[error("entity has been stopped")]
    Stopped,
}
