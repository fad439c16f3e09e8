//! UDP transport: bind/read/send plus the reflector's own POLL/count encoding.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::callsign::{Callsign, CALLSIGN_LEN};
use crate::error::Result;
use crate::frame::MAX_FRAME_LEN;

/// How long a single [`Transport::read`] call waits for a datagram before
/// returning `None`. Bounds loop-iteration latency so timers stay accurate.
const READ_WAIT: Duration = Duration::from_millis(5);

/// A bound UDP endpoint plus the reflector-specific POLL-reply encoding.
pub struct Transport {
    socket: UdpSocket,
    own_callsign: Callsign,
    count: u32,
}

impl Transport {
    /// Bind a UDP socket on `port` for the reflector identified by
    /// `own_callsign`.
    pub async fn open(port: u16, own_callsign: Callsign) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Self {
            socket,
            own_callsign,
            count: 0,
        })
    }

    /// Wait briefly for a datagram. Returns `Ok(None)` if nothing arrived
    /// within the bounded wait so the caller can go tick its timers.
    pub async fn read(&self, buf: &mut [u8; MAX_FRAME_LEN]) -> Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout(READ_WAIT, self.socket.recv_from(buf)).await {
            Ok(Ok((len, addr))) => Ok(Some((len, addr))),
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Send a datagram verbatim to one peer.
    pub async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(buf, addr).await?;
        Ok(())
    }

    /// Send a `YSFP` reply carrying the reflector's own callsign and, in
    /// the status tail, the current endpoint count (saturating at 255).
    pub async fn write_poll(&self, addr: SocketAddr) -> Result<()> {
        let mut buf = Vec::with_capacity(4 + CALLSIGN_LEN + 1);
        buf.extend_from_slice(b"YSFP");
        buf.extend_from_slice(self.own_callsign.as_wire());
        buf.push(self.count.min(u8::MAX as u32) as u8);
        self.send_to(&buf, addr).await
    }

    /// Update the endpoint count embedded in future POLL replies' status
    /// tail. Callers invoke this after every roster insertion/eviction.
    pub fn set_count(&mut self, n: usize) {
        self.count = n as u32;
    }

    /// The endpoint count last set via [`Transport::set_count`].
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Compare two peer addresses for equality, treating an IPv4-mapped IPv6
/// address as equal to its IPv4 form.
pub fn addrs_match(a: &SocketAddr, b: &SocketAddr) -> bool {
    a.ip().to_canonical() == b.ip().to_canonical() && a.port() == b.port()
}

/// Render a peer address for logging.
pub fn display_addr(addr: &SocketAddr) -> String {
    addr.to_string()
}
