//! The reflector event loop: couples roster, arbiter and blocklist state to
//! inbound datagrams and a handful of housekeeping timers.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::arbiter::{Arbiter, Outcome};
use crate::blocklist::Blocklist;
use crate::callsign::Callsign;
use crate::clock::Timer;
use crate::error::Result;
use crate::frame::{classify, Frame, MAX_FRAME_LEN};
use crate::roster::Roster;
use crate::transport::{display_addr, Transport};

/// Poll interval: every registered endpoint is sent a fresh `YSFP` on this
/// cadence, independent of whether it has sent anything.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Roster-dump interval: the full roster is logged on this cadence.
pub const DUMP_INTERVAL: Duration = Duration::from_secs(120);

/// If a loop iteration finishes faster than this, the loop yields for the
/// remainder rather than spinning, capping the idle rate at ~200 Hz.
const MIN_ITERATION: Duration = Duration::from_millis(5);

/// Assembles the leaf components into the running reflector.
pub struct Reflector {
    transport: Transport,
    roster: Roster,
    arbiter: Arbiter,
    blocklist: Blocklist,
    poll_timer: Timer,
    dump_timer: Timer,
}

impl Reflector {
    /// Build a reflector from its already-constructed collaborators. The
    /// poll and dump timers are started immediately, matching the upstream
    /// startup sequence.
    pub fn new(transport: Transport, blocklist: Blocklist) -> Self {
        let mut poll_timer = Timer::new(POLL_INTERVAL);
        poll_timer.start();
        let mut dump_timer = Timer::new(DUMP_INTERVAL);
        dump_timer.start();

        Self {
            transport,
            roster: Roster::new(),
            arbiter: Arbiter::new(),
            blocklist,
            poll_timer,
            dump_timer,
        }
    }

    /// Run until `shutdown` resolves. Shutdown is observed once per
    /// iteration, so latency is bounded by a single iteration.
    ///
    /// Per-iteration transport failures (a read, or a POLL reply send) are
    /// logged and do not stop the loop — only construction-time failures
    /// (binding the socket, the initial blocklist load) are fatal. This
    /// mirrors `forward`'s per-recipient error isolation below.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        self.transport.set_count(0);
        let mut buf = [0u8; MAX_FRAME_LEN];
        let mut stopwatch = Instant::now();

        loop {
            if shutdown.try_recv().is_ok() {
                break;
            }

            let elapsed = stopwatch.elapsed();
            stopwatch = Instant::now();

            match self.transport.read(&mut buf).await {
                Ok(Some((len, peer))) => self.handle_datagram(&buf[..len], peer).await,
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "datagram read failed"),
            }

            self.tick_poll(elapsed).await;
            self.tick_roster(elapsed);
            self.tick_watchdog(elapsed);
            self.tick_dump(elapsed);
            self.blocklist.tick(elapsed).await;

            let iteration = stopwatch.elapsed();
            if iteration < MIN_ITERATION {
                tokio::time::sleep(MIN_ITERATION - iteration).await;
            }
        }
        Ok(())
    }

    async fn handle_datagram(&mut self, buf: &[u8], peer: SocketAddr) {
        match classify(buf) {
            Some(Frame::Poll { callsign }) => self.handle_poll(peer, callsign).await,
            Some(Frame::Unlink) => self.handle_unlink(peer).await,
            Some(Frame::Data(frame)) => {
                if self.roster.find(peer).is_some() {
                    self.handle_data(&frame, peer).await;
                }
            }
            None => {}
        }
    }

    async fn handle_poll(&mut self, peer: SocketAddr, callsign: Callsign) {
        if self.roster.find(peer).is_none() {
            self.roster.insert(peer, callsign);
            self.transport.set_count(self.roster.len());
            tracing::info!("Adding {} ({})", callsign, display_addr(&peer));
        }
        self.roster.touch(peer);
        if let Err(e) = self.transport.write_poll(peer).await {
            tracing::warn!(peer = %display_addr(&peer), error = %e, "poll reply failed");
        }
    }

    async fn handle_unlink(&mut self, peer: SocketAddr) {
        if let Some(endpoint) = self.roster.remove_by_addr(peer) {
            tracing::info!("Removing {} ({}) unlinked", endpoint.callsign(), display_addr(&peer));
            self.transport.set_count(self.roster.len());
        }
    }

    async fn handle_data(&mut self, frame: &crate::frame::DataFrame<'_>, peer: SocketAddr) {
        let outcome = self.arbiter.handle_data(frame, peer, &self.blocklist);
        match outcome {
            Outcome::Blocked => {
                tracing::info!("Data from {} at {} blocked", frame.src(), frame.tag());
                return;
            }
            Outcome::Overlap => {
                tracing::info!("Ignoring overlapping TX from {}", frame.src());
                return;
            }
            Outcome::Accepted { started } => {
                if started {
                    if let Some(id) = self.arbiter.current_id() {
                        tracing::info!("Transmission from {} at {} to TG {}", id.src, id.tag, id.dst);
                    }
                }
                self.forward(frame.bytes(), peer).await;
            }
        }

        if frame.end_flag() {
            if let Some(id) = self.arbiter.end_transmission() {
                tracing::info!("Received end of transmission from {} at {} to TG {}", id.src, id.tag, id.dst);
            }
        }
    }

    /// Send `bytes` verbatim to every registered endpoint except `sender`.
    /// A single failed send is logged and does not stop the remaining
    /// fan-out.
    async fn forward(&self, bytes: &[u8], sender: SocketAddr) {
        for endpoint in self.roster.iter() {
            if crate::transport::addrs_match(&endpoint.addr(), &sender) {
                continue;
            }
            if let Err(e) = self.transport.send_to(bytes, endpoint.addr()).await {
                tracing::warn!(peer = %display_addr(&endpoint.addr()), error = %e, "forward failed");
            }
        }
    }

    async fn tick_poll(&mut self, elapsed: Duration) {
        self.poll_timer.tick(elapsed);
        if !self.poll_timer.expired() {
            return;
        }
        for endpoint in self.roster.iter() {
            if let Err(e) = self.transport.write_poll(endpoint.addr()).await {
                tracing::warn!(peer = %display_addr(&endpoint.addr()), error = %e, "periodic poll failed");
            }
        }
        self.poll_timer.start();
    }

    fn tick_roster(&mut self, elapsed: Duration) {
        self.roster.tick_all(elapsed);
        let mut evicted_any = false;
        self.roster.evict_expired(|endpoint| {
            tracing::info!("Removing {} ({}) disappeared", endpoint.callsign(), display_addr(&endpoint.addr()));
            evicted_any = true;
        });
        if evicted_any {
            self.transport.set_count(self.roster.len());
        }
    }

    fn tick_watchdog(&mut self, elapsed: Duration) {
        if let Some(id) = self.arbiter.tick(elapsed) {
            tracing::info!("Network watchdog has expired from {} at {} to TG {}", id.src, id.tag, id.dst);
        }
    }

    fn tick_dump(&mut self, elapsed: Duration) {
        self.dump_timer.tick(elapsed);
        if !self.dump_timer.expired() {
            return;
        }
        self.dump_timer.start();
        if self.roster.is_empty() {
            tracing::info!("No repeaters linked on TG 226");
            return;
        }
        tracing::info!("Currently linked repeaters on TG 226:");
        for endpoint in self.roster.iter() {
            tracing::info!(
                "    {}: {} {}/{}",
                endpoint.callsign(),
                display_addr(&endpoint.addr()),
                endpoint.silence_remaining().as_millis(),
                endpoint.silence_timeout().as_millis(),
            );
        }
    }
}
