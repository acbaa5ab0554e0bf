//! External-interface traits (spec §6), modeling the PDCP/MAC/RRC
//! boundary the same way the teacher threads a narrow `Tun`-shaped
//! dependency through `segment_loop`/`on_segment` (`src/lib.rs`,
//! `src/tcp/tcb.rs`) rather than routing everything through one god object.

/// Rx → PDCP: delivery of fully reassembled SDUs, in strictly ascending
/// RLC-SN order.
pub trait PdcpRxSink {
    fn write_pdu(&mut self, sdu: Vec<u8>);
}

/// Tx → PDCP: delivery/failure notification, batched per spec §5 ("PDCP
/// notifications are issued after releasing the Tx mutex, with a
/// pre-accumulated vector").
pub trait PdcpTxSink {
    fn notify_delivery(&mut self, pdcp_sns: &[u32]);
    fn notify_failure(&mut self, pdcp_sns: &[u32]);
}

/// Entity → RRC.
pub trait RrcSink {
    fn max_retx_attempted(&mut self);
}

/// Optional async buffer-state push (spec §4.6 / §9's "registered
/// callback"); when absent, buffer-state is pull-only via
/// `AmTx::get_buffer_state`.
pub trait BufferStateSink {
    fn buffer_state_changed(&mut self, newtx_bytes: u32, prio_bytes: u32);
}
