//! Wire-format constants and parsing for the three YSF datagram kinds.

use crate::callsign::{Callsign, CALLSIGN_LEN};

/// Maximum frame size the reflector will read or forward.
pub const MAX_FRAME_LEN: usize = 200;

const MAGIC_LEN: usize = 4;
const TAG_OFFSET: usize = 4;
const SRC_OFFSET: usize = 14;
const DST_OFFSET: usize = 24;
const END_FLAG_OFFSET: usize = 34;
const DATA_HEADER_LEN: usize = END_FLAG_OFFSET + 1;

const MAGIC_POLL: &[u8; MAGIC_LEN] = b"YSFP";
const MAGIC_UNLINK: &[u8; MAGIC_LEN] = b"YSFU";
const MAGIC_DATA: &[u8; MAGIC_LEN] = b"YSFD";

/// A datagram classified by its 4-byte magic.
#[derive(Debug)]
pub enum Frame<'a> {
    /// `YSFP`: registration heartbeat, carries the sender's callsign.
    Poll { callsign: Callsign },
    /// `YSFU`: explicit de-registration.
    Unlink,
    /// `YSFD`: voice/data, forwarded verbatim to the rest of the roster.
    Data(DataFrame<'a>),
}

/// A parsed `YSFD` frame borrowing from the original datagram buffer so it
/// can be forwarded byte-for-byte without copying.
#[derive(Debug)]
pub struct DataFrame<'a> {
    raw: &'a [u8],
}

impl<'a> DataFrame<'a> {
    /// Stream tag used to distinguish a continuation from an overlapping,
    /// unrelated transmission.
    pub fn tag(&self) -> Callsign {
        Callsign::from_wire(self.raw[TAG_OFFSET..TAG_OFFSET + CALLSIGN_LEN].try_into().unwrap())
    }

    /// Source callsign.
    pub fn src(&self) -> Callsign {
        Callsign::from_wire(self.raw[SRC_OFFSET..SRC_OFFSET + CALLSIGN_LEN].try_into().unwrap())
    }

    /// Destination (talkgroup) callsign.
    pub fn dst(&self) -> Callsign {
        Callsign::from_wire(self.raw[DST_OFFSET..DST_OFFSET + CALLSIGN_LEN].try_into().unwrap())
    }

    /// Low bit of byte 34: end-of-transmission marker.
    pub fn end_flag(&self) -> bool {
        self.raw[END_FLAG_OFFSET] & 0x01 == 0x01
    }

    /// The original bytes, forwarded verbatim.
    pub fn bytes(&self) -> &'a [u8] {
        self.raw
    }
}

/// Classify a datagram by its magic and validate it has enough bytes for
/// its kind. Returns `None` for unknown magics or truncated bodies, which
/// the caller must drop silently (see error handling design: no log
/// amplification from scans).
pub fn classify(buf: &'_ [u8]) -> Option<Frame<'_>> {
    if buf.len() < MAGIC_LEN {
        return None;
    }
    let magic: &[u8; MAGIC_LEN] = buf[..MAGIC_LEN].try_into().unwrap();

    if magic == MAGIC_POLL {
        if buf.len() < TAG_OFFSET + CALLSIGN_LEN {
            return None;
        }
        let callsign = Callsign::from_wire(buf[TAG_OFFSET..TAG_OFFSET + CALLSIGN_LEN].try_into().unwrap());
        Some(Frame::Poll { callsign })
    } else if magic == MAGIC_UNLINK {
        Some(Frame::Unlink)
    } else if magic == MAGIC_DATA {
        if buf.len() < DATA_HEADER_LEN {
            return None;
        }
        Some(Frame::Data(DataFrame { raw: buf }))
    } else {
        None
    }
}
