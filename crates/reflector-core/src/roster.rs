//! The registered-endpoint roster.

use std::net::SocketAddr;
use std::time::Duration;

use crate::callsign::Callsign;
use crate::clock::Timer;
use crate::transport::addrs_match;

/// Silence timeout after which an endpoint is evicted for having gone quiet.
pub const SILENCE_TIMEOUT: Duration = Duration::from_secs(60);

/// A registered repeater: identity, address, and its silence watchdog.
#[derive(Debug)]
pub struct Endpoint {
    addr: SocketAddr,
    callsign: Callsign,
    silence: Timer,
}

impl Endpoint {
    fn new(addr: SocketAddr, callsign: Callsign) -> Self {
        let mut silence = Timer::new(SILENCE_TIMEOUT);
        silence.start();
        Self {
            addr,
            callsign,
            silence,
        }
    }

    /// The endpoint's peer address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The callsign adopted from this endpoint's first POLL.
    pub fn callsign(&self) -> Callsign {
        self.callsign
    }

    /// Milliseconds remaining before this endpoint's silence timer expires.
    pub fn silence_remaining(&self) -> Duration {
        self.silence.remaining()
    }

    /// The endpoint's configured silence timeout.
    pub fn silence_timeout(&self) -> Duration {
        self.silence.timeout()
    }
}

/// Insertion-ordered collection of registered endpoints, keyed by address.
///
/// Plain `Vec` storage, not a hash map: lookups are a linear scan over
/// typically tens of entries, and forwarding needs ordered iteration
/// without incurring an allocation per frame.
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<Endpoint>,
}

impl Roster {
    /// An empty roster.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Find the endpoint registered at `addr`, if any.
    pub fn find(&self, addr: SocketAddr) -> Option<&Endpoint> {
        self.entries.iter().find(|e| addrs_match(&e.addr, &addr))
    }

    /// Register a new endpoint. Caller must have verified `find(addr)`
    /// returned `None`; two endpoints never share an address.
    pub fn insert(&mut self, addr: SocketAddr, callsign: Callsign) {
        debug_assert!(self.find(addr).is_none(), "duplicate roster address");
        self.entries.push(Endpoint::new(addr, callsign));
    }

    /// Restart the silence timer for the endpoint at `addr`, if registered.
    pub fn touch(&mut self, addr: SocketAddr) {
        if let Some(e) = self.entries.iter_mut().find(|e| addrs_match(&e.addr, &addr)) {
            e.silence.start();
        }
    }

    /// Remove the endpoint at `addr`, returning it if it was present.
    pub fn remove_by_addr(&mut self, addr: SocketAddr) -> Option<Endpoint> {
        let idx = self.entries.iter().position(|e| addrs_match(&e.addr, &addr))?;
        Some(self.entries.remove(idx))
    }

    /// Advance every endpoint's silence timer.
    pub fn tick_all(&mut self, elapsed: Duration) {
        for e in &mut self.entries {
            e.silence.tick(elapsed);
        }
    }

    /// Remove every endpoint whose silence timer has expired, invoking
    /// `on_evict` for each one before it is dropped (for logging and
    /// `Transport::set_count`).
    pub fn evict_expired(&mut self, mut on_evict: impl FnMut(&Endpoint)) {
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].silence.expired() {
                let evicted = self.entries.remove(i);
                on_evict(&evicted);
            } else {
                i += 1;
            }
        }
    }

    /// Number of currently registered endpoints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no endpoints are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate endpoints in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn insert_then_find() {
        let mut roster = Roster::new();
        roster.insert(addr(1), Callsign::from_str_padded("A1"));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.find(addr(1)).unwrap().callsign().trimmed(), "A1");
        assert!(roster.find(addr(2)).is_none());
    }

    #[test]
    fn remove_by_addr_is_noop_when_absent() {
        let mut roster = Roster::new();
        assert!(roster.remove_by_addr(addr(1)).is_none());
    }

    #[test]
    fn eviction_during_iteration_is_safe() {
        let mut roster = Roster::new();
        roster.insert(addr(1), Callsign::from_str_padded("A1"));
        roster.insert(addr(2), Callsign::from_str_padded("A2"));
        roster.insert(addr(3), Callsign::from_str_padded("A3"));

        // Expire the middle entry only.
        roster.entries[1].silence.tick(SILENCE_TIMEOUT);

        let mut evicted = Vec::new();
        roster.evict_expired(|e| evicted.push(e.callsign().trimmed().to_string()));

        assert_eq!(evicted, vec!["A2"]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.find(addr(1)).unwrap().callsign().trimmed(), "A1");
        assert_eq!(roster.find(addr(3)).unwrap().callsign().trimmed(), "A3");
    }

    #[test]
    fn touch_restarts_silence_timer() {
        let mut roster = Roster::new();
        roster.insert(addr(1), Callsign::from_str_padded("A1"));
        roster.tick_all(Duration::from_secs(59));
        roster.touch(addr(1));
        roster.tick_all(Duration::from_secs(59));

        let mut evicted = 0;
        roster.evict_expired(|_| evicted += 1);
        assert_eq!(evicted, 0);
    }
}
