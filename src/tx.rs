//! Tx half of an RLC AM entity (spec §4.3, §4.5).
//!
//! Counter names (`tx_next`, `tx_next_ack`, `poll_sn`, `pdu_without_poll`,
//! `byte_without_poll`) follow `rlc_am_lte.h`'s `vt_s`/`vt_a`/`poll_sn` and
//! `rlc_am_nr.h`'s `rlc_am_nr_tx_state_t`. The retransmission/backoff
//! control-flow shape (an owned queue drained from the front, counters
//! advanced as entries are acknowledged) follows `tcb.rs`'s
//! `on_tick`/`process_ack`, adapted from TCP's cumulative-ACK model to
//! RLC's NACK-driven retransmission selection.

use std::collections::VecDeque;
use std::time::Instant;

use crate::callbacks::{PdcpTxSink, RrcSink};
use crate::config::Config;
use crate::error::Error;
use crate::pdu::header::{self, DataPduHeader, SegmentationInfo};
use crate::pdu::status::{StatusPdu, SO_END_OF_SDU};
use crate::segment_pool::{SegmentHandle, SegmentPool};
use crate::sn;
use crate::timer::Timer;

#[derive(Debug, Clone)]
struct SduQueueEntry {
    pdcp_sn: u32,
    bytes: Vec<u8>,
}

/// `tx_window[sn]`: created when `sn` is first assigned, removed once the
/// SDU is fully acknowledged (spec §3 "Tx PDU record").
#[derive(Debug, Clone)]
struct TxPdu {
    pdcp_sn: u32,
    sdu: Vec<u8>,
    /// `None` == `RETX_COUNT_NOT_STARTED`.
    retx_count: Option<u32>,
    /// `(so, payload_len)` ranges ever emitted, in emission order.
    segments: Vec<(u32, u32)>,
    /// Pool descriptors backing `segments`, one per entry, released (both
    /// halves) once the SDU is fully acknowledged. Empty for SDUs sent
    /// whole (the full-SDU path never touches `segment_pool`).
    segment_handles: Vec<SegmentHandle>,
}

#[derive(Debug, Clone)]
struct RetxEntry {
    sn: u32,
    is_segment: bool,
    so_start: u32,
    current_so: u32,
    segment_length: u32,
}

pub struct AmTx {
    cfg: Config,
    tx_next: u32,
    tx_next_ack: u32,
    poll_sn: u32,
    pdu_without_poll: u32,
    byte_without_poll: u32,
    sdu_queue: VecDeque<SduQueueEntry>,
    tx_window: Vec<Option<TxPdu>>,
    retx_queue: VecDeque<RetxEntry>,
    sdu_under_segmentation_sn: Option<u32>,
    segment_pool: SegmentPool,
    poll_retx_timer: Timer,
    stopped: bool,
    buffer_state_cb: Option<Box<dyn FnMut(u32, u32) + Send>>,
}

impl AmTx {
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        let bits = cfg.sn_width.bits();
        let poll_retx_timer = Timer::new(cfg.t_poll_retx_ms);
        Ok(AmTx {
            tx_window: vec![None; sn::window_size(bits) as usize],
            tx_next: 0,
            tx_next_ack: 0,
            poll_sn: 0,
            pdu_without_poll: 0,
            byte_without_poll: 0,
            sdu_queue: VecDeque::new(),
            retx_queue: VecDeque::new(),
            sdu_under_segmentation_sn: None,
            segment_pool: SegmentPool::new(),
            poll_retx_timer,
            cfg,
            stopped: false,
            buffer_state_cb: None,
        })
    }

    /// Registers an asynchronous buffer-state sink (spec §4.6), mirroring
    /// the reference's optional `bsr_callback`. Invoked whenever
    /// `newtx_bytes`/`prio_bytes` may have changed; when absent,
    /// buffer-state reporting is pull-only via `get_buffer_state`.
    pub fn set_buffer_state_callback(&mut self, cb: impl FnMut(u32, u32) + Send + 'static) {
        self.buffer_state_cb = Some(Box::new(cb));
    }

    fn report_buffer_state(&mut self) {
        if let Some(cb) = &mut self.buffer_state_cb {
            let h = header::header_len(SegmentationInfo::FullSdu, self.cfg.sn_width) as u32;
            let mut newtx_bytes = 0u32;
            if let Some(sn) = self.sdu_under_segmentation_sn {
                let idx = (sn % sn::window_size(self.cfg.sn_width.bits())) as usize;
                if let Some(tx_pdu) = &self.tx_window[idx] {
                    let emitted: u32 = tx_pdu.segments.iter().map(|(_, l)| l).sum();
                    newtx_bytes += tx_pdu.sdu.len() as u32 - emitted;
                }
            }
            for entry in &self.sdu_queue {
                newtx_bytes += entry.bytes.len() as u32 + h;
            }
            let mut prio_bytes = 0u32;
            for retx in &self.retx_queue {
                let idx = (retx.sn % sn::window_size(self.cfg.sn_width.bits())) as usize;
                let len = self.tx_window[idx]
                    .as_ref()
                    .map(|p| if retx.is_segment { retx.segment_length } else { p.sdu.len() as u32 })
                    .unwrap_or(0);
                prio_bytes += len + h;
            }
            cb(newtx_bytes, prio_bytes);
        }
    }

    fn bits(&self) -> u8 {
        self.cfg.sn_width.bits()
    }

    fn idx(&self, sn: u32) -> usize {
        (sn % sn::window_size(self.bits())) as usize
    }

    fn window_full(&self) -> bool {
        let bits = self.bits();
        (self.tx_next + sn::modulus(bits) - self.tx_next_ack) % sn::modulus(bits)
            >= sn::window_size(bits)
    }

    pub fn configure(&mut self, cfg: Config) -> Result<(), Error> {
        cfg.validate()?;
        let bits = cfg.sn_width.bits();
        self.tx_window = vec![None; sn::window_size(bits) as usize];
        self.poll_retx_timer = Timer::new(cfg.t_poll_retx_ms);
        self.cfg = cfg;
        self.stopped = false;
        Ok(())
    }

    pub fn reestablish(&mut self) {
        self.tx_next = 0;
        self.tx_next_ack = 0;
        self.poll_sn = 0;
        self.pdu_without_poll = 0;
        self.byte_without_poll = 0;
        self.sdu_queue.clear();
        for slot in self.tx_window.iter_mut() {
            *slot = None;
        }
        self.retx_queue.clear();
        self.sdu_under_segmentation_sn = None;
        self.segment_pool = SegmentPool::new();
        self.poll_retx_timer.stop();
        log::debug!("tx: reestablished");
    }

    pub fn stop(&mut self) {
        self.reestablish();
        self.stopped = true;
        log::info!("tx: stopped");
    }

    pub fn write_sdu(&mut self, pdcp_sn: u32, bytes: Vec<u8>) -> Result<(), Error> {
        if self.stopped {
            return Err(Error::Stopped);
        }
        if self.sdu_queue.len() >= self.cfg.tx_queue_length {
            log::info!("tx: sdu queue full, refusing pdcp_sn={}", pdcp_sn);
            return Err(Error::QueueFull);
        }
        log::trace!("tx: queued sdu pdcp_sn={} len={}", pdcp_sn, bytes.len());
        self.sdu_queue.push_back(SduQueueEntry { pdcp_sn, bytes });
        self.report_buffer_state();
        Ok(())
    }

    fn compute_poll(&mut self, sn: u32, payload_len: u32, is_retx: bool, now: Instant) -> bool {
        if !is_retx {
            self.pdu_without_poll += 1;
            self.byte_without_poll += payload_len;
        }
        let mut poll = false;
        if !is_retx {
            if self.cfg.poll_pdu != 0 && self.pdu_without_poll >= self.cfg.poll_pdu {
                poll = true;
            }
            if self.cfg.poll_byte != 0 && self.byte_without_poll >= self.cfg.poll_byte {
                poll = true;
            }
        }
        let queue_drained = self.sdu_queue.is_empty()
            && self.retx_queue.is_empty()
            && self.sdu_under_segmentation_sn.is_none();
        if queue_drained || self.window_full() {
            poll = true;
        }
        if self.cfg.sn_width.is_lte()
            && self.cfg.poll_pdu == 0
            && self.cfg.poll_byte == 0
            && self.cfg.poll_periodicity != 0
            && self.tx_next % self.cfg.poll_periodicity == 0
        {
            poll = true;
        }
        if poll {
            self.pdu_without_poll = 0;
            self.byte_without_poll = 0;
            if !is_retx {
                self.poll_sn = sn;
            }
            self.poll_retx_timer.start(now);
            log::trace!("tx: poll bit set for sn={}", sn);
        }
        poll
    }

    /// On each MAC opportunity: STATUS (pre-fetched by the entity) > retx >
    /// in-progress segment > new SDU > empty (spec §4.3).
    pub fn read_pdu(
        &mut self,
        n: usize,
        status_bytes: Option<Vec<u8>>,
        now: Instant,
    ) -> Vec<u8> {
        let pdu = self.read_pdu_inner(n, status_bytes, now);
        self.report_buffer_state();
        pdu
    }

    fn read_pdu_inner(
        &mut self,
        n: usize,
        status_bytes: Option<Vec<u8>>,
        now: Instant,
    ) -> Vec<u8> {
        if self.stopped {
            return Vec::new();
        }
        if let Some(bytes) = status_bytes {
            if !bytes.is_empty() && bytes.len() <= n {
                return bytes;
            }
        }
        if !self.retx_queue.is_empty() {
            if let Some(pdu) = self.build_retx_pdu(n, now) {
                return pdu;
            }
        }
        if let Some(sn) = self.sdu_under_segmentation_sn {
            return self.build_continuation_segment(sn, n, now).unwrap_or_default();
        }
        if !self.sdu_queue.is_empty() && !self.window_full() {
            if let Some(pdu) = self.build_new_sdu_pdu(n, now) {
                return pdu;
            }
        }
        Vec::new()
    }

    fn build_new_sdu_pdu(&mut self, n: usize, now: Instant) -> Option<Vec<u8>> {
        let sn_width = self.cfg.sn_width;
        let h_full = header::header_len(SegmentationInfo::FullSdu, sn_width);
        let front_len = self.sdu_queue.front()?.bytes.len();

        if front_len + h_full <= n {
            let entry = self.sdu_queue.pop_front().unwrap();
            let sn = self.tx_next;
            self.tx_next = sn::add_mod(sn, 1, sn_width.bits());
            let len = entry.bytes.len() as u32;
            self.tx_window[self.idx(sn)] = Some(TxPdu {
                pdcp_sn: entry.pdcp_sn,
                sdu: entry.bytes.clone(),
                retx_count: None,
                segments: vec![(0, len)],
                segment_handles: Vec::new(),
            });
            let poll = self.compute_poll(sn, len, false, now);
            let header = DataPduHeader {
                poll,
                sn,
                si: SegmentationInfo::FullSdu,
                so: 0,
            };
            let mut out = Vec::with_capacity(h_full + entry.bytes.len());
            header::encode(&header, sn_width, &mut out);
            out.extend_from_slice(&entry.bytes);
            log::trace!("tx: built full-sdu pdu sn={} len={}", sn, out.len());
            return Some(out);
        }

        let h_first = header::header_len(SegmentationInfo::FirstSegment, sn_width);
        if n <= h_first || self.segment_pool.is_exhausted() {
            return None;
        }
        let payload_len = n - h_first;
        let entry = self.sdu_queue.pop_front().unwrap();
        let sn = self.tx_next;
        self.sdu_under_segmentation_sn = Some(sn);
        let handle = self.segment_pool.make(0, payload_len as u32);
        self.tx_window[self.idx(sn)] = Some(TxPdu {
            pdcp_sn: entry.pdcp_sn,
            sdu: entry.bytes.clone(),
            retx_count: None,
            segments: vec![(0, payload_len as u32)],
            segment_handles: handle.into_iter().collect(),
        });
        let poll = self.compute_poll(sn, payload_len as u32, false, now);
        let header = DataPduHeader {
            poll,
            sn,
            si: SegmentationInfo::FirstSegment,
            so: 0,
        };
        let mut out = Vec::with_capacity(n);
        header::encode(&header, sn_width, &mut out);
        out.extend_from_slice(&entry.bytes[0..payload_len]);
        log::trace!("tx: built first-segment pdu sn={} len={}", sn, out.len());
        Some(out)
    }

    fn build_continuation_segment(&mut self, sn: u32, n: usize, now: Instant) -> Option<Vec<u8>> {
        let sn_width = self.cfg.sn_width;
        let idx = self.idx(sn);
        let (emitted_so, total_len) = {
            let tx_pdu = self.tx_window[idx].as_ref()?;
            let emitted: u32 = tx_pdu.segments.iter().map(|(_, l)| l).sum();
            (emitted, tx_pdu.sdu.len() as u32)
        };
        let h_mid = header::header_len(SegmentationInfo::MiddleSegment, sn_width);
        if n <= h_mid || self.segment_pool.is_exhausted() {
            return None;
        }
        let capacity = (n - h_mid) as u32;
        let remaining = total_len - emitted_so;
        let (si, payload_len) = if capacity >= remaining {
            (SegmentationInfo::LastSegment, remaining)
        } else {
            (SegmentationInfo::MiddleSegment, capacity)
        };
        let handle = self.segment_pool.make(emitted_so, payload_len);
        {
            let tx_pdu = self.tx_window[idx].as_mut().unwrap();
            tx_pdu.segments.push((emitted_so, payload_len));
            tx_pdu.segment_handles.extend(handle);
        }
        if si.is_last() {
            self.sdu_under_segmentation_sn = None;
            self.tx_next = sn::add_mod(sn, 1, sn_width.bits());
        }
        let poll = self.compute_poll(sn, payload_len, false, now);
        let header = DataPduHeader {
            poll,
            sn,
            si,
            so: emitted_so,
        };
        let mut out = Vec::with_capacity(n);
        header::encode(&header, sn_width, &mut out);
        let tx_pdu = self.tx_window[idx].as_ref().unwrap();
        out.extend_from_slice(
            &tx_pdu.sdu[emitted_so as usize..(emitted_so + payload_len) as usize],
        );
        log::trace!(
            "tx: built {:?} pdu sn={} so={} len={}",
            si,
            sn,
            emitted_so,
            out.len()
        );
        Some(out)
    }

    fn build_retx_pdu(&mut self, n: usize, now: Instant) -> Option<Vec<u8>> {
        let sn_width = self.cfg.sn_width;
        loop {
            let retx = self.retx_queue.front()?.clone();
            if self.tx_window[self.idx(retx.sn)].is_none() {
                self.retx_queue.pop_front();
                continue;
            }
            let full_len = self.tx_window[self.idx(retx.sn)].as_ref().unwrap().sdu.len() as u32;
            let total_len = if retx.is_segment { retx.segment_length } else { full_len };
            let remaining = total_len.saturating_sub(retx.current_so - retx.so_start);
            let needs_so = retx.current_so != 0;
            let h_exp = header::header_len(
                if needs_so { SegmentationInfo::LastSegment } else { SegmentationInfo::FullSdu },
                sn_width,
            );

            if n >= h_exp + remaining as usize {
                let si = if !retx.is_segment && retx.current_so == 0 && remaining == full_len {
                    SegmentationInfo::FullSdu
                } else if retx.current_so == 0 {
                    SegmentationInfo::FirstSegment
                } else if retx.current_so + remaining == full_len {
                    SegmentationInfo::LastSegment
                } else {
                    SegmentationInfo::MiddleSegment
                };
                let poll = self.compute_poll(retx.sn, remaining, true, now);
                let header = DataPduHeader { poll, sn: retx.sn, si, so: retx.current_so };
                let mut out = Vec::with_capacity(h_exp + remaining as usize);
                header::encode(&header, sn_width, &mut out);
                let tx_pdu = self.tx_window[self.idx(retx.sn)].as_ref().unwrap();
                let start = retx.current_so as usize;
                out.extend_from_slice(&tx_pdu.sdu[start..start + remaining as usize]);
                self.retx_queue.pop_front();
                log::trace!("tx: retransmitted sn={} so={} len={}", retx.sn, retx.current_so, out.len());
                return Some(out);
            }

            if n <= h_exp {
                return None;
            }
            let capacity = (n - h_exp) as u32;
            let si = if retx.current_so == 0 {
                SegmentationInfo::FirstSegment
            } else {
                SegmentationInfo::MiddleSegment
            };
            let poll = self.compute_poll(retx.sn, capacity, true, now);
            let header = DataPduHeader { poll, sn: retx.sn, si, so: retx.current_so };
            let mut out = Vec::with_capacity(n);
            header::encode(&header, sn_width, &mut out);
            let tx_pdu = self.tx_window[self.idx(retx.sn)].as_ref().unwrap();
            let start = retx.current_so as usize;
            out.extend_from_slice(&tx_pdu.sdu[start..start + capacity as usize]);
            if let Some(front) = self.retx_queue.front_mut() {
                front.current_so += capacity;
            }
            log::trace!("tx: re-segmented retx sn={} so={} len={}", retx.sn, retx.current_so, out.len());
            return Some(out);
        }
    }

    fn valid_ack_sn(&self, ack_sn: u32) -> bool {
        let bits = self.bits();
        let w = sn::window_size(bits);
        let m = sn::modulus(bits);
        let diff = (ack_sn + m - self.tx_next_ack) % m;
        if diff == 0 || diff > w {
            return false;
        }
        !sn::lt_base(sn::add_mod(self.tx_next, 1, bits), ack_sn, bits)
    }

    /// STATUS PDU handling (spec §4.3.4), delivered via the entity's
    /// `handle_control_pdu`.
    pub fn handle_status_pdu(
        &mut self,
        buf: &[u8],
        rrc: &mut impl RrcSink,
        pdcp: &mut impl PdcpTxSink,
    ) {
        if self.stopped {
            return;
        }
        let sn_width = self.cfg.sn_width;
        let bits = sn_width.bits();
        let status = match StatusPdu::decode(sn_width, buf) {
            Some(s) => s,
            None => {
                log::info!("tx: discarding malformed STATUS PDU");
                return;
            }
        };
        if !self.valid_ack_sn(status.ack_sn) {
            log::info!("tx: discarding STATUS PDU, ack_sn {} out of window", status.ack_sn);
            return;
        }
        if sn::le_base(self.tx_next_ack, self.poll_sn, bits)
            && sn::lt_base(self.poll_sn, status.ack_sn, bits)
        {
            self.poll_retx_timer.stop();
        }

        self.retx_queue.clear();

        let first_nack_sn = status.nacks().first().map(|n| n.sn);
        let limit = match first_nack_sn {
            Some(nsn) if sn::lt_base(nsn, status.ack_sn, bits) => nsn,
            _ => status.ack_sn,
        };
        let mut delivered_pdcp_sns = Vec::new();
        while sn::lt_base(self.tx_next_ack, limit, bits) {
            let idx = self.idx(self.tx_next_ack);
            if self.tx_window[idx].is_none() {
                break;
            }
            let tx_pdu = self.tx_window[idx].take().unwrap();
            for h in tx_pdu.segment_handles {
                self.segment_pool.release_rlc(h);
                self.segment_pool.release_pdcp(h);
            }
            delivered_pdcp_sns.push(tx_pdu.pdcp_sn);
            self.tx_next_ack = sn::add_mod(self.tx_next_ack, 1, bits);
        }

        for nack in status.nacks() {
            let count = if nack.has_nack_range { nack.nack_range as u32 } else { 1 };
            for offset in 0..count {
                let sn = sn::add_mod(nack.sn, offset, bits);
                let idx = self.idx(sn);
                let queued = match self.tx_window[idx].as_ref() {
                    None => {
                        log::info!("tx: NACK for unknown sn={}", sn);
                        false
                    }
                    Some(tx_pdu) => {
                        if nack.has_so {
                            let so_start = nack.so_start as u32;
                            let so_end = if nack.so_end == SO_END_OF_SDU {
                                tx_pdu.sdu.len() as u32
                            } else {
                                nack.so_end as u32
                            };
                            let mut any = false;
                            for &(seg_so, seg_len) in &tx_pdu.segments {
                                if seg_so < so_end && seg_so + seg_len > so_start {
                                    if !self.retx_queue.iter().any(|r| r.sn == sn && r.so_start == seg_so) {
                                        self.retx_queue.push_back(RetxEntry {
                                            sn,
                                            is_segment: true,
                                            so_start: seg_so,
                                            current_so: seg_so,
                                            segment_length: seg_len,
                                        });
                                        any = true;
                                    }
                                }
                            }
                            any
                        } else if tx_pdu.segments.len() > 1 {
                            let mut any = false;
                            for &(seg_so, seg_len) in &tx_pdu.segments {
                                if !self.retx_queue.iter().any(|r| r.sn == sn && r.so_start == seg_so) {
                                    self.retx_queue.push_back(RetxEntry {
                                        sn,
                                        is_segment: true,
                                        so_start: seg_so,
                                        current_so: seg_so,
                                        segment_length: seg_len,
                                    });
                                    any = true;
                                }
                            }
                            any
                        } else {
                            if !self.retx_queue.iter().any(|r| r.sn == sn && !r.is_segment) {
                                self.retx_queue.push_back(RetxEntry {
                                    sn,
                                    is_segment: false,
                                    so_start: 0,
                                    current_so: 0,
                                    segment_length: 0,
                                });
                            }
                            true
                        }
                    }
                };
                if queued {
                    if let Some(tx_pdu) = self.tx_window[idx].as_mut() {
                        let new_count = tx_pdu.retx_count.map_or(0, |c| c + 1);
                        tx_pdu.retx_count = Some(new_count);
                        if new_count >= self.cfg.max_retx_thresh {
                            log::warn!("tx: max retx reached for sn={}", sn);
                            rrc.max_retx_attempted();
                            pdcp.notify_failure(&[tx_pdu.pdcp_sn]);
                        }
                    }
                }
            }
        }

        if !delivered_pdcp_sns.is_empty() {
            pdcp.notify_delivery(&delivered_pdcp_sns);
        }
        self.report_buffer_state();
    }

    /// On poll-retransmit timer expiry (spec §4.5).
    pub fn poll_retx_timer_tick(&mut self, now: Instant) {
        if self.poll_retx_timer.poll(now).is_none() {
            return;
        }
        self.poll_retx_timer.stop();
        log::debug!("tx: poll-retransmit timer expired");
        if !((self.sdu_queue.is_empty() && self.retx_queue.is_empty()) || self.window_full()) {
            return;
        }
        if !sn::lt_base(self.tx_next_ack, self.tx_next, self.bits()) {
            return;
        }
        let idx = self.idx(self.tx_next_ack);
        if let Some(tx_pdu) = self.tx_window[idx].as_ref() {
            if tx_pdu.segments.len() > 1 {
                for &(so, len) in &tx_pdu.segments {
                    self.retx_queue.push_back(RetxEntry {
                        sn: self.tx_next_ack,
                        is_segment: true,
                        so_start: so,
                        current_so: so,
                        segment_length: len,
                    });
                }
            } else {
                self.retx_queue.push_back(RetxEntry {
                    sn: self.tx_next_ack,
                    is_segment: false,
                    so_start: 0,
                    current_so: 0,
                    segment_length: 0,
                });
            }
        }
        self.report_buffer_state();
    }

    /// `(newtx_bytes, prio_bytes)` excluding any pending STATUS PDU — the
    /// entity adds that contribution since Tx has no direct access to Rx's
    /// state (spec §4.3.5, §5).
    pub fn get_buffer_state(&self) -> (u32, u32) {
        let sn_width = self.cfg.sn_width;
        let h = header::header_len(SegmentationInfo::FullSdu, sn_width) as u32;
        let mut newtx_bytes = 0u32;
        if let Some(sn) = self.sdu_under_segmentation_sn {
            if let Some(tx_pdu) = &self.tx_window[self.idx(sn)] {
                let emitted: u32 = tx_pdu.segments.iter().map(|(_, l)| l).sum();
                newtx_bytes += tx_pdu.sdu.len() as u32 - emitted;
            }
        }
        for entry in &self.sdu_queue {
            newtx_bytes += entry.bytes.len() as u32 + h;
        }
        let mut prio_bytes = 0u32;
        for retx in &self.retx_queue {
            let len = self.tx_window[self.idx(retx.sn)]
                .as_ref()
                .map(|p| if retx.is_segment { retx.segment_length } else { p.sdu.len() as u32 })
                .unwrap_or(0);
            prio_bytes += len + h;
        }
        (newtx_bytes, prio_bytes)
    }

    pub fn has_data(&self) -> bool {
        !self.sdu_queue.is_empty() || !self.retx_queue.is_empty() || self.sdu_under_segmentation_sn.is_some()
    }

    #[cfg(test)]
    pub fn tx_next(&self) -> u32 {
        self.tx_next
    }

    #[cfg(test)]
    pub fn tx_next_ack(&self) -> u32 {
        self.tx_next_ack
    }

    #[cfg(test)]
    pub fn window_holds(&self, sn: u32) -> bool {
        self.tx_window[self.idx(sn)].is_some()
    }

    #[cfg(test)]
    pub fn segment_pool_len_in_use(&self) -> usize {
        self.segment_pool.len_in_use()
    }
}
