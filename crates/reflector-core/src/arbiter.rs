//! Single-speaker transmission arbiter.
//!
//! Exactly one endpoint may hold the channel at a time. Expressing the
//! state as a two-variant sum type (`Idle` / `Active`) rather than a
//! boolean-plus-always-present-fields struct makes "Idle implies all
//! callsign fields are absent" a type-level invariant instead of a runtime
//! one that call sites could violate.

use std::net::SocketAddr;
use std::time::Duration;

use crate::blocklist::Blocklist;
use crate::callsign::Callsign;
use crate::clock::Timer;
use crate::frame::DataFrame;
use crate::transport::addrs_match;

/// Watchdog timeout: a transmission this long without a fresh frame is
/// forcibly closed.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_millis(1500);

/// The currently-active transmission, if any.
#[derive(Debug, Clone, Copy)]
struct Active {
    addr: SocketAddr,
    tag: Callsign,
    src: Callsign,
    dst: Callsign,
}

/// Arbiter state: idle, or actively holding the channel for one endpoint.
enum State {
    Idle,
    Active { current: Active, watchdog: Timer },
}

/// Identifying fields of a transmission, used in log messages and in the
/// watchdog-expiry event.
#[derive(Debug, Clone, Copy)]
pub struct TransmissionId {
    pub src: Callsign,
    pub tag: Callsign,
    pub dst: Callsign,
}

/// Result of handing a `YSFD` frame to the arbiter.
#[derive(Debug)]
pub enum Outcome {
    /// Dropped: the blocklist forbids this source (or, mid-transmission,
    /// forbids the already-active source).
    Blocked,
    /// Dropped: a different endpoint or stream is already active.
    Overlap,
    /// Accepted: forward the frame to the rest of the roster.
    /// `started` is true for a fresh Idle→Active transition.
    Accepted { started: bool },
}

/// The transmission arbiter.
pub struct Arbiter {
    state: State,
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Arbiter {
    /// A fresh, idle arbiter.
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Whether a transmission is currently active.
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    /// The address currently holding the channel, if active.
    pub fn active_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            State::Active { current, .. } => Some(current.addr),
            State::Idle => None,
        }
    }

    /// Advance the watchdog. Returns the identity of the transmission that
    /// was forcibly closed, if the watchdog just expired.
    pub fn tick(&mut self, elapsed: Duration) -> Option<TransmissionId> {
        let State::Active { current, watchdog } = &mut self.state else {
            return None;
        };
        watchdog.tick(elapsed);
        if !watchdog.expired() {
            return None;
        }
        let id = TransmissionId {
            src: current.src,
            tag: current.tag,
            dst: current.dst,
        };
        self.state = State::Idle;
        Some(id)
    }

    /// Apply §4.5's rules to an inbound `YSFD` frame.
    pub fn handle_data(&mut self, frame: &DataFrame<'_>, peer_addr: SocketAddr, blocklist: &Blocklist) -> Outcome {
        let frame_blocked = blocklist.check(&frame.src());
        let active_src_blocked = match &self.state {
            State::Active { current, .. } => blocklist.check(&current.src),
            State::Idle => false,
        };

        if frame_blocked || active_src_blocked {
            self.state = State::Idle;
            return Outcome::Blocked;
        }

        match &mut self.state {
            State::Idle => {
                let mut watchdog = Timer::new(WATCHDOG_TIMEOUT);
                watchdog.start();
                self.state = State::Active {
                    current: Active {
                        addr: peer_addr,
                        tag: frame.tag(),
                        src: frame.src(),
                        dst: frame.dst(),
                    },
                    watchdog,
                };
                Outcome::Accepted { started: true }
            }
            State::Active { current, .. } => {
                let same_tag = frame.tag() == current.tag;
                let same_peer = addrs_match(&peer_addr, &current.addr);
                if !same_tag || !same_peer {
                    return Outcome::Overlap;
                }
                if current.src.is_placeholder() {
                    current.src = frame.src();
                }
                if current.dst.is_placeholder() {
                    current.dst = frame.dst();
                }
                Outcome::Accepted { started: false }
            }
        }
    }

    /// The current (possibly placeholder-resolved) transmission identity,
    /// if active. Used after forwarding to render the "Transmission
    /// from..." / "Received end of transmission..." log lines.
    pub fn current_id(&self) -> Option<TransmissionId> {
        match &self.state {
            State::Active { current, .. } => Some(TransmissionId {
                src: current.src,
                tag: current.tag,
                dst: current.dst,
            }),
            State::Idle => None,
        }
    }

    /// Called after forwarding a frame whose end-of-transmission bit was
    /// set: transition to Idle and return the identity for logging.
    pub fn end_transmission(&mut self) -> Option<TransmissionId> {
        let id = self.current_id();
        if id.is_some() {
            self.state = State::Idle;
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    fn scratch_blocklist_file(contents: &str) -> std::path::PathBuf {
        let n = NEXT_TMP.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("reflector-core-arbiter-test-{}-{n}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn empty_blocklist() -> Blocklist {
        let path = scratch_blocklist_file("");
        let bl = Blocklist::load(&path, Duration::from_secs(300)).await.unwrap();
        std::fs::remove_file(&path).unwrap();
        bl
    }

    fn data<'a>(buf: &'a mut Vec<u8>, tag: &str, src: &str, dst: &str, end: bool) -> DataFrame<'a> {
        buf.clear();
        buf.extend_from_slice(b"YSFD");
        buf.extend_from_slice(Callsign::from_str_padded(tag).as_wire());
        buf.extend_from_slice(Callsign::from_str_padded(src).as_wire());
        buf.extend_from_slice(Callsign::from_str_padded(dst).as_wire());
        buf.push(if end { 0x01 } else { 0x00 });
        match crate::frame::classify(buf) {
            Some(crate::frame::Frame::Data(df)) => df,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn idle_to_active_is_accept_start() {
        let bl = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        let frame = data(&mut buf, "T1", "S1", "D1", false);
        let outcome = arb.handle_data(&frame, addr(1), &bl);
        assert!(matches!(outcome, Outcome::Accepted { started: true }));
        assert!(arb.is_active());
        assert_eq!(arb.active_addr(), Some(addr(1)));
    }

    #[tokio::test]
    async fn overlapping_peer_is_rejected_and_state_untouched() {
        let bl = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);

        let outcome = arb.handle_data(&data(&mut buf, "T2", "S2", "D2", false), addr(2), &bl);
        assert!(matches!(outcome, Outcome::Overlap));
        assert_eq!(arb.active_addr(), Some(addr(1)));
        assert_eq!(arb.current_id().unwrap().src.trimmed(), "S1");
    }

    #[tokio::test]
    async fn continuation_from_same_peer_and_tag_is_accepted() {
        let bl = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);
        let outcome = arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);
        assert!(matches!(outcome, Outcome::Accepted { started: false }));
    }

    #[tokio::test]
    async fn placeholder_src_and_dst_are_adopted_on_continuation() {
        let bl = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        arb.handle_data(&data(&mut buf, "T1", "??????????", "??????????", false), addr(1), &bl);
        arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);
        let id = arb.current_id().unwrap();
        assert_eq!(id.src.trimmed(), "S1");
        assert_eq!(id.dst.trimmed(), "D1");
    }

    #[tokio::test]
    async fn end_flag_closes_transmission() {
        let bl = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);
        let frame = data(&mut buf, "T1", "S1", "D1", true);
        assert!(frame.end_flag());
        let id = arb.end_transmission().unwrap();
        assert_eq!(id.src.trimmed(), "S1");
        assert!(!arb.is_active());
    }

    #[tokio::test]
    async fn watchdog_expiry_closes_transmission() {
        let bl = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);
        assert!(arb.tick(Duration::from_millis(1499)).is_none());
        let id = arb.tick(Duration::from_millis(1)).unwrap();
        assert_eq!(id.src.trimmed(), "S1");
        assert!(!arb.is_active());
    }

    #[tokio::test]
    async fn blocklisted_source_is_rejected_from_idle() {
        let path = scratch_blocklist_file("S1\n");
        let bl = Blocklist::load(&path, Duration::from_secs(300)).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        let outcome = arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl);
        assert!(matches!(outcome, Outcome::Blocked));
        assert!(!arb.is_active());
    }

    #[tokio::test]
    async fn blocklist_cuts_mid_stream() {
        let bl_no_block = empty_blocklist().await;
        let mut arb = Arbiter::new();
        let mut buf = Vec::new();
        arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl_no_block);
        assert!(arb.is_active());

        let path = scratch_blocklist_file("S1\n");
        let bl_blocked = Blocklist::load(&path, Duration::from_secs(300)).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let outcome = arb.handle_data(&data(&mut buf, "T1", "S1", "D1", false), addr(1), &bl_blocked);
        assert!(matches!(outcome, Outcome::Blocked));
        assert!(!arb.is_active());
    }
}
