//! Rx half of an RLC AM entity (spec §4.4).
//!
//! Counter names (`rx_next`, `rx_next_highest`, `rx_highest_status`,
//! `rx_next_status_trigger`) follow `rlc_am_lte.h`'s `vr_r`/`vr_mr`/`vr_x`/
//! `vr_ms`/`vr_h` and `rlc_am_nr.h`'s `rlc_am_nr_rx_state_t`. Per-SDU segment
//! bookkeeping (`fully_received`/`has_gap`, sorted-by-SO segment set) follows
//! `rlc_am_nr_packing.h`'s `rlc_amd_rx_sdu_nr_t`. `do_status` is modeled as
//! an `AtomicBool` directly per `rlc_am_lte.h`'s own note that it needs
//! lightweight access from the Tx entity (spec §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::callbacks::PdcpRxSink;
use crate::config::Config;
use crate::pdu::header::{self, DataPduHeader, SegmentationInfo};
use crate::pdu::status::{Nack, StatusPdu, SO_END_OF_SDU};
use crate::sn;
use crate::timer::Timer;

/// One received segment: payload bytes only, header already stripped.
#[derive(Debug, Clone)]
struct RxSegment {
    so: u32,
    payload: Vec<u8>,
}

/// `rx_window[sn]` (spec §3 "Rx SDU record").
#[derive(Debug, Clone)]
struct RxEntry {
    segments: Vec<RxSegment>,
    fully_received: bool,
    has_gap: bool,
    /// Set once a segment carrying `si = last_segment` (or the single
    /// `full_sdu` segment) has been received — `fully_received` additionally
    /// requires no gap among the segments seen so far.
    last_segment_seen: bool,
    /// Populated once `fully_received`.
    reassembled: Option<Vec<u8>>,
}

impl RxEntry {
    fn new() -> Self {
        RxEntry {
            segments: Vec::new(),
            fully_received: false,
            has_gap: false,
            last_segment_seen: false,
            reassembled: None,
        }
    }

    fn full_sdu(payload: Vec<u8>) -> Self {
        RxEntry {
            segments: vec![RxSegment { so: 0, payload: payload.clone() }],
            fully_received: true,
            has_gap: false,
            last_segment_seen: true,
            reassembled: Some(payload),
        }
    }

    /// Returns `true` if `[so, so+len)` overlaps any existing segment.
    fn overlaps(&self, so: u32, len: u32) -> bool {
        self.segments.iter().any(|s| {
            let s_end = s.so + s.payload.len() as u32;
            so < s_end && s.so < so + len
        })
    }

    /// Inserts the segment in SO order, recomputes `has_gap`/`fully_received`,
    /// and reassembles into `reassembled` if complete. `last_segment_received`
    /// indicates this particular insertion carried `si = last_segment`.
    fn insert(&mut self, so: u32, payload: Vec<u8>, last_segment_received: bool) {
        let pos = self.segments.iter().position(|s| s.so > so).unwrap_or(self.segments.len());
        self.segments.insert(pos, RxSegment { so, payload });
        if last_segment_received {
            self.last_segment_seen = true;
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.has_gap = false;
        let mut expected = 0u32;
        for seg in &self.segments {
            if seg.so != expected {
                self.has_gap = true;
            }
            expected = seg.so + seg.payload.len() as u32;
        }
        self.fully_received = !self.has_gap && self.last_segment_seen;
        if self.fully_received {
            let mut buf = Vec::new();
            for seg in &self.segments {
                buf.extend_from_slice(&seg.payload);
            }
            self.reassembled = Some(buf);
        }
    }
}

pub struct AmRx {
    cfg: Config,
    rx_next: u32,
    rx_next_highest: u32,
    rx_highest_status: u32,
    rx_next_status_trigger: u32,
    rx_window: Vec<Option<RxEntry>>,
    reassembly_timer: Timer,
    status_prohibit_timer: Timer,
    do_status: AtomicBool,
    stopped: bool,
}

impl AmRx {
    pub fn new(cfg: Config) -> Self {
        let bits = cfg.sn_width.bits();
        AmRx {
            rx_window: vec![None; sn::window_size(bits) as usize],
            rx_next: 0,
            rx_next_highest: 0,
            rx_highest_status: 0,
            rx_next_status_trigger: 0,
            reassembly_timer: Timer::new(cfg.t_reassembly_ms),
            status_prohibit_timer: Timer::new(cfg.t_status_prohibit_ms),
            do_status: AtomicBool::new(false),
            stopped: false,
            cfg,
        }
    }

    fn bits(&self) -> u8 {
        self.cfg.sn_width.bits()
    }

    fn idx(&self, sn: u32) -> usize {
        (sn % sn::window_size(self.bits())) as usize
    }

    pub fn configure(&mut self, cfg: Config) {
        let bits = cfg.sn_width.bits();
        self.rx_window = vec![None; sn::window_size(bits) as usize];
        self.reassembly_timer = Timer::new(cfg.t_reassembly_ms);
        self.status_prohibit_timer = Timer::new(cfg.t_status_prohibit_ms);
        self.cfg = cfg;
        self.stopped = false;
    }

    pub fn reestablish(&mut self) {
        self.rx_next = 0;
        self.rx_next_highest = 0;
        self.rx_highest_status = 0;
        self.rx_next_status_trigger = 0;
        for slot in self.rx_window.iter_mut() {
            *slot = None;
        }
        self.reassembly_timer.stop();
        self.status_prohibit_timer.stop();
        self.do_status.store(false, Ordering::Release);
        log::debug!("rx: reestablished");
    }

    pub fn stop(&mut self) {
        self.reestablish();
        self.stopped = true;
        log::info!("rx: stopped");
    }

    /// Cheap, lock-free test of whether a STATUS report is pending (spec §5).
    pub fn status_pending(&self) -> bool {
        self.do_status.load(Ordering::Acquire) && !self.status_prohibit_timer.is_running()
    }

    /// `handle_data_pdu` (spec §4.4).
    pub fn handle_data_pdu(&mut self, buf: &[u8], pdcp: &mut impl PdcpRxSink, now: Instant) {
        if self.stopped {
            return;
        }
        let sn_width = self.cfg.sn_width;
        let bits = sn_width.bits();
        let (header, consumed) = match header::decode(sn_width, buf) {
            Some(r) => r,
            None => {
                log::info!("rx: discarding malformed data pdu");
                return;
            }
        };
        let payload = &buf[consumed..];

        if header.poll {
            self.do_status.store(true, Ordering::Release);
        }

        if !sn::in_window(header.sn, self.rx_next, bits) {
            log::info!("rx: discarding out-of-window sn={}", header.sn);
            return;
        }

        let idx = self.idx(header.sn);
        if let Some(entry) = &self.rx_window[idx] {
            if entry.fully_received {
                log::trace!("rx: discarding duplicate sn={}", header.sn);
                return;
            }
            if entry.overlaps(header.so, payload.len() as u32) {
                log::info!("rx: discarding overlapping segment sn={}", header.sn);
                return;
            }
        }

        if header.si == SegmentationInfo::FullSdu {
            self.rx_window[idx] = Some(RxEntry::full_sdu(payload.to_vec()));
        } else {
            let entry = self.rx_window[idx].get_or_insert_with(RxEntry::new);
            entry.insert(header.so, payload.to_vec(), header.si.is_last());
        }

        if !sn::lt_base(header.sn, self.rx_next_highest, bits) {
            self.rx_next_highest = sn::add_mod(header.sn, 1, bits);
        }

        self.deliver_in_order(pdcp);
        self.recompute_rx_highest_status();
        self.maintain_reassembly_timer(now);
    }

    fn deliver_in_order(&mut self, pdcp: &mut impl PdcpRxSink) {
        let bits = self.bits();
        while sn::lt_base(self.rx_next, self.rx_next_highest, bits) {
            let idx = self.idx(self.rx_next);
            let ready = matches!(&self.rx_window[idx], Some(e) if e.fully_received);
            if !ready {
                break;
            }
            let entry = self.rx_window[idx].take().unwrap();
            pdcp.write_pdu(entry.reassembled.unwrap());
            log::trace!("rx: delivered sn={}", self.rx_next);
            self.rx_next = sn::add_mod(self.rx_next, 1, bits);
        }
    }

    fn recompute_rx_highest_status(&mut self) {
        let bits = self.bits();
        let mut sn = self.rx_next;
        while sn::lt_base(sn, self.rx_next_highest, bits) {
            let idx = self.idx(sn);
            let complete = matches!(&self.rx_window[idx], Some(e) if e.fully_received);
            if !complete {
                break;
            }
            sn = sn::add_mod(sn, 1, bits);
        }
        self.rx_highest_status = sn;
    }

    fn entry_has_gap(&self, sn: u32) -> bool {
        matches!(&self.rx_window[self.idx(sn)], Some(e) if e.has_gap)
    }

    fn maintain_reassembly_timer(&mut self, now: Instant) {
        let bits = self.bits();
        if self.reassembly_timer.is_running() {
            let trigger = self.rx_next_status_trigger;
            let outside_window = !sn::in_window(trigger, self.rx_next, bits)
                && trigger != sn::add_mod(self.rx_next, sn::window_size(bits), bits);
            let stop = trigger == self.rx_next
                || (trigger == sn::add_mod(self.rx_next, 1, bits) && !self.entry_has_gap(self.rx_next))
                || outside_window;
            if stop {
                self.reassembly_timer.stop();
            }
        }
        if !self.reassembly_timer.is_running() {
            let gap_ahead = sn::lt_base(sn::add_mod(self.rx_next, 1, bits), self.rx_next_highest, bits);
            let adjacent_gap = self.rx_next_highest == sn::add_mod(self.rx_next, 1, bits)
                && self.entry_has_gap(self.rx_next);
            if gap_ahead || adjacent_gap {
                self.reassembly_timer.start(now);
                self.rx_next_status_trigger = self.rx_next_highest;
                log::debug!("rx: reassembly timer started, trigger={}", self.rx_next_status_trigger);
            }
        }
    }

    /// On reassembly-timer expiry (spec §4.4).
    pub fn reassembly_timer_tick(&mut self, now: Instant) {
        if self.reassembly_timer.poll(now).is_none() {
            return;
        }
        self.reassembly_timer.stop();
        let bits = self.bits();
        let mut sn = self.rx_next_status_trigger;
        while sn::lt_base(sn, self.rx_next_highest, bits) {
            let complete = matches!(&self.rx_window[self.idx(sn)], Some(e) if e.fully_received);
            if !complete {
                break;
            }
            sn = sn::add_mod(sn, 1, bits);
        }
        self.rx_highest_status = sn;
        if sn::lt_base(sn::add_mod(self.rx_highest_status, 1, bits), self.rx_next_highest, bits) {
            self.reassembly_timer.start(now);
            self.rx_next_status_trigger = self.rx_next_highest;
        }
        self.do_status.store(true, Ordering::Release);
        log::debug!("rx: reassembly timer expired, rx_highest_status={}", self.rx_highest_status);
    }

    pub fn status_prohibit_timer_tick(&mut self, now: Instant) {
        // one-shot: expiry simply allows the next status_pending() check to
        // succeed again; nothing else to do.
        let _ = self.status_prohibit_timer.poll(now);
    }

    /// Serializes a STATUS PDU if one is pending, trimmed to `max_bytes`
    /// (spec §4.3 step 1, §4.4). Starts the status-prohibit timer on
    /// success. Returns `None` if no STATUS is pending or it cannot fit at
    /// all within `max_bytes`.
    pub fn build_status_pdu(&mut self, max_bytes: usize, now: Instant) -> Option<Vec<u8>> {
        if !self.do_status.load(Ordering::Acquire) || self.status_prohibit_timer.is_running() {
            return None;
        }
        let sn_width = self.cfg.sn_width;
        let bits = sn_width.bits();
        let mut status = StatusPdu::new(sn_width, self.rx_highest_status);
        let mut sn = self.rx_next;
        while sn::lt_base(sn, self.rx_highest_status, bits) {
            let idx = self.idx(sn);
            match &self.rx_window[idx] {
                Some(entry) if entry.fully_received => {}
                Some(entry) => {
                    for gap in missing_ranges(entry) {
                        status.push_nack(Nack::with_so(sn, gap.0 as u16, gap.1));
                    }
                }
                None => {
                    status.push_nack(Nack::simple(sn));
                }
            }
            sn = sn::add_mod(sn, 1, bits);
        }
        if !status.trim(max_bytes) {
            return None;
        }
        let bytes = status.encode();
        if bytes.len() > max_bytes {
            return None;
        }
        self.do_status.store(false, Ordering::Release);
        self.status_prohibit_timer.start(now);
        log::trace!("rx: built status pdu ack_sn={} len={}", status.ack_sn, bytes.len());
        Some(bytes)
    }

    #[cfg(test)]
    pub fn rx_next(&self) -> u32 {
        self.rx_next
    }

    #[cfg(test)]
    pub fn rx_next_highest(&self) -> u32 {
        self.rx_next_highest
    }

    #[cfg(test)]
    pub fn rx_highest_status(&self) -> u32 {
        self.rx_highest_status
    }

    #[cfg(test)]
    pub fn reassembly_timer_running(&self) -> bool {
        self.reassembly_timer.is_running()
    }
}

/// Byte ranges of `[0, last_end)` not yet covered by `entry`'s segments,
/// reported as `(so_start, so_end)` NACK ranges; the final gap (if the SDU
/// is still open-ended) is reported as `SO_END_OF_SDU`.
fn missing_ranges(entry: &RxEntry) -> Vec<(u32, u16)> {
    let mut ranges = Vec::new();
    let mut expected = 0u32;
    for seg in &entry.segments {
        if seg.so > expected {
            ranges.push((expected, seg.so as u16));
        }
        expected = seg.so + seg.payload.len() as u32;
    }
    if !entry.fully_received {
        ranges.push((expected, SO_END_OF_SDU));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnWidth;

    struct RecordingPdcp {
        delivered: Vec<Vec<u8>>,
    }
    impl PdcpRxSink for RecordingPdcp {
        fn write_pdu(&mut self, sdu: Vec<u8>) {
            self.delivered.push(sdu);
        }
    }

    fn cfg() -> Config {
        Config {
            sn_width: SnWidth::Twelve,
            t_poll_retx_ms: 45,
            t_reassembly_ms: 35,
            t_status_prohibit_ms: 0,
            poll_pdu: 4,
            poll_byte: 0,
            max_retx_thresh: 4,
            tx_queue_length: 16,
            poll_periodicity: 16,
        }
    }

    fn full_sdu_pdu(sn: u32, payload: &[u8]) -> Vec<u8> {
        let h = DataPduHeader { poll: false, sn, si: SegmentationInfo::FullSdu, so: 0 };
        let mut out = Vec::new();
        header::encode(&h, SnWidth::Twelve, &mut out);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn in_order_delivery() {
        let mut rx = AmRx::new(cfg());
        let mut pdcp = RecordingPdcp { delivered: Vec::new() };
        rx.handle_data_pdu(&full_sdu_pdu(0, b"hello"), &mut pdcp, Instant::now());
        assert_eq!(rx.rx_next(), 1);
        assert_eq!(pdcp.delivered, vec![b"hello".to_vec()]);
    }

    #[test]
    fn gap_then_fill_delivers_in_order() {
        let mut rx = AmRx::new(cfg());
        let mut pdcp = RecordingPdcp { delivered: Vec::new() };
        rx.handle_data_pdu(&full_sdu_pdu(0, b"a"), &mut pdcp, Instant::now());
        rx.handle_data_pdu(&full_sdu_pdu(2, b"c"), &mut pdcp, Instant::now());
        assert_eq!(pdcp.delivered.len(), 1); // sn=1 still missing
        assert_eq!(rx.rx_next(), 1);
        assert_eq!(rx.rx_next_highest(), 3);
        rx.handle_data_pdu(&full_sdu_pdu(1, b"b"), &mut pdcp, Instant::now());
        assert_eq!(rx.rx_next(), 3);
        assert_eq!(pdcp.delivered, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn poll_on_out_of_window_duplicate_still_triggers_status() {
        let mut rx = AmRx::new(cfg());
        let mut pdcp = RecordingPdcp { delivered: Vec::new() };
        rx.handle_data_pdu(&full_sdu_pdu(0, b"a"), &mut pdcp, Instant::now());
        let mut h = DataPduHeader { poll: true, sn: 0, si: SegmentationInfo::FullSdu, so: 0 };
        h.poll = true;
        let mut dup = Vec::new();
        header::encode(&h, SnWidth::Twelve, &mut dup);
        dup.extend_from_slice(b"a");
        rx.handle_data_pdu(&dup, &mut pdcp, Instant::now());
        assert!(rx.status_pending());
    }

    #[test]
    fn reassembly_timer_starts_on_gap_and_advances_status_on_expiry() {
        let mut rx = AmRx::new(cfg());
        let mut pdcp = RecordingPdcp { delivered: Vec::new() };
        let now = Instant::now();
        rx.handle_data_pdu(&full_sdu_pdu(0, b"a"), &mut pdcp, now);
        rx.handle_data_pdu(&full_sdu_pdu(1, b"b"), &mut pdcp, now);
        rx.handle_data_pdu(&full_sdu_pdu(3, b"d"), &mut pdcp, now); // sn=2 missing
        assert!(rx.reassembly_timer_running());
        assert_eq!(rx.rx_next(), 2);
        let later = now + std::time::Duration::from_millis(40);
        rx.reassembly_timer_tick(later);
        assert_eq!(rx.rx_highest_status(), 2);
        assert!(rx.status_pending());
    }

    fn segment_pdu(sn: u32, si: SegmentationInfo, so: u32, payload: &[u8]) -> Vec<u8> {
        let h = DataPduHeader { poll: false, sn, si, so };
        let mut out = Vec::new();
        header::encode(&h, SnWidth::Twelve, &mut out);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn disjoint_out_of_order_segments_are_not_discarded_as_overlapping() {
        // Existing segment (so=8, len=4) must not cause a later, genuinely
        // disjoint segment (so=0, len=4) to be discarded as "overlapping".
        let mut rx = AmRx::new(cfg());
        let mut pdcp = RecordingPdcp { delivered: Vec::new() };
        let now = Instant::now();
        rx.handle_data_pdu(
            &segment_pdu(0, SegmentationInfo::LastSegment, 8, b"ijkl"),
            &mut pdcp,
            now,
        );
        rx.handle_data_pdu(
            &segment_pdu(0, SegmentationInfo::FirstSegment, 0, b"abcd"),
            &mut pdcp,
            now,
        );
        rx.handle_data_pdu(
            &segment_pdu(0, SegmentationInfo::MiddleSegment, 4, b"efgh"),
            &mut pdcp,
            now,
        );
        assert_eq!(pdcp.delivered, vec![b"abcdefghijkl".to_vec()]);
    }
}
