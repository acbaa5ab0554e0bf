//! One AM bearer: paired Tx/Rx halves plus the external interface of §6.
//!
//! Grounded in the teacher's `NetStack` (`src/lib.rs`), which guards shared
//! state behind `Arc<Mutex<Manager>>` and exposes a small set of blocking
//! entry points; generalized per spec §5 into two independently-locked
//! halves so Tx never blocks behind Rx (and vice versa). The one place they
//! touch — Tx asking Rx to serialize a STATUS PDU — uses `Mutex::try_lock`,
//! exactly as spec §5 requires.

use std::sync::Mutex;
use std::time::Instant;

use crate::callbacks::{BufferStateSink, PdcpRxSink, PdcpTxSink, RrcSink};
use crate::config::Config;
use crate::error::Error;
use crate::rx::AmRx;
use crate::tx::AmTx;

pub struct AmEntity {
    tx: Mutex<AmTx>,
    rx: Mutex<AmRx>,
}

impl AmEntity {
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(AmEntity {
            tx: Mutex::new(AmTx::new(cfg.clone())?),
            rx: Mutex::new(AmRx::new(cfg)),
        })
    }

    /// RRC → entity (spec §6). Legal only prior to first use or after
    /// `reestablish`; callers are expected to have already called
    /// `reestablish` if the entity is already running.
    pub fn configure(&self, cfg: Config) -> Result<(), Error> {
        cfg.validate()?;
        self.tx.lock().unwrap().configure(cfg.clone())?;
        self.rx.lock().unwrap().configure(cfg);
        Ok(())
    }

    pub fn reestablish(&self) {
        self.tx.lock().unwrap().reestablish();
        self.rx.lock().unwrap().reestablish();
    }

    pub fn stop(&self) {
        self.tx.lock().unwrap().stop();
        self.rx.lock().unwrap().stop();
    }

    /// PDCP → Tx.
    pub fn write_sdu(&self, pdcp_sn: u32, bytes: Vec<u8>) -> Result<(), Error> {
        self.tx.lock().unwrap().write_sdu(pdcp_sn, bytes)
    }

    /// MAC → Tx. Tries to serialize a pending STATUS report from Rx first,
    /// via a non-blocking acquisition of the Rx mutex (spec §5): on
    /// contention, Tx proceeds as if no STATUS were pending rather than
    /// blocking.
    pub fn read_pdu(&self, n: usize, now: Instant) -> Vec<u8> {
        let status_bytes = self.try_build_status(n, now);
        self.tx.lock().unwrap().read_pdu(n, status_bytes, now)
    }

    fn try_build_status(&self, n: usize, now: Instant) -> Option<Vec<u8>> {
        match self.rx.try_lock() {
            Ok(mut rx) => {
                if !rx.status_pending() {
                    return None;
                }
                rx.build_status_pdu(n, now)
            }
            Err(_) => {
                log::trace!("entity: rx mutex contended, skipping status this opportunity");
                None
            }
        }
    }

    /// MAC → Tx.
    pub fn get_buffer_state(&self) -> (u32, u32) {
        self.tx.lock().unwrap().get_buffer_state()
    }

    /// MAC → Rx. PDCP notifications from Tx's control-PDU handling and the
    /// reassembled SDUs from Rx's handling are both issued with the
    /// respective lock already released, per spec §5.
    pub fn handle_data_pdu(&self, buf: &[u8], pdcp_rx: &mut impl PdcpRxSink, now: Instant) {
        self.rx.lock().unwrap().handle_data_pdu(buf, pdcp_rx, now);
    }

    /// Peer's STATUS report, dispatched by the caller after control-PDU
    /// parsing (spec §6 notes PDCP/MAC/RRC are the only upward/downward
    /// collaborators; dispatch of data vs. control PDU bytes is a MAC
    /// responsibility this entity does not reinterpret).
    pub fn handle_status_pdu(
        &self,
        buf: &[u8],
        rrc: &mut impl RrcSink,
        pdcp_tx: &mut impl PdcpTxSink,
    ) {
        self.tx.lock().unwrap().handle_status_pdu(buf, rrc, pdcp_tx);
    }

    /// Drives all three timers. Call periodically (e.g. from a timer task);
    /// cheap no-ops when nothing has expired.
    pub fn tick_timers(&self, now: Instant) {
        self.tx.lock().unwrap().poll_retx_timer_tick(now);
        let mut rx = self.rx.lock().unwrap();
        rx.reassembly_timer_tick(now);
        rx.status_prohibit_timer_tick(now);
    }

    /// Registers an asynchronous buffer-state push callback (spec §4.6),
    /// forwarded to the Tx half under its own mutex — `get_buffer_state`
    /// remains the pull-only alternative for callers that poll instead.
    pub fn set_buffer_state_callback(&self, cb: impl FnMut(u32, u32) + Send + 'static) {
        self.tx.lock().unwrap().set_buffer_state_callback(cb);
    }

    /// Convenience wrapper taking a `BufferStateSink` implementor instead of
    /// a bare closure.
    pub fn set_buffer_state_sink(&self, mut sink: impl BufferStateSink + Send + 'static) {
        self.set_buffer_state_callback(move |newtx, prio| sink.buffer_state_changed(newtx, prio));
    }
}
