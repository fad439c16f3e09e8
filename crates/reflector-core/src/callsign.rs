//! Fixed-width 10-byte ASCII callsign fields.

use std::fmt;

/// Width of a callsign field on the wire.
pub const CALLSIGN_LEN: usize = 10;

/// A 10-byte, space-padded ASCII callsign.
///
/// Wire frames carry three of these (tag, source, destination); the
/// all-`?` placeholder means "unknown, fill in later" and is adopted by
/// [`crate::arbiter::Arbiter`] once the real value arrives.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Callsign([u8; CALLSIGN_LEN]);

impl Callsign {
    /// The placeholder value used for src/dst fields that are not yet known.
    pub const PLACEHOLDER: Callsign = Callsign(*b"??????????");

    /// Build a callsign from exactly `CALLSIGN_LEN` wire bytes.
    pub fn from_wire(bytes: &[u8; CALLSIGN_LEN]) -> Self {
        Self(*bytes)
    }

    /// Build a callsign from a possibly-shorter/longer slice, truncating or
    /// space-padding on the right as needed. Used when parsing config and
    /// blocklist entries.
    pub fn from_str_padded(s: &str) -> Self {
        let mut buf = [b' '; CALLSIGN_LEN];
        let bytes = s.as_bytes();
        let n = bytes.len().min(CALLSIGN_LEN);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self(buf)
    }

    /// The raw 10-byte wire representation.
    pub fn as_wire(&self) -> &[u8; CALLSIGN_LEN] {
        &self.0
    }

    /// True if this callsign is the `??????????` placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.0 == Self::PLACEHOLDER.0
    }

    /// The callsign with trailing ASCII spaces trimmed, for comparisons
    /// against trimmed blocklist entries.
    pub fn trimmed(&self) -> &str {
        let text = std::str::from_utf8(&self.0).unwrap_or("");
        text.trim_end()
    }
}

impl fmt::Display for Callsign {
    /// Renders the full padded field, matching the stable log strings in
    /// the wire spec (e.g. `"Adding TESTCALL   (addr)"` keeps the padding).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => {
                for &b in &self.0 {
                    write!(f, "{}", if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callsign({:?})", self.trimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_strings() {
        let cs = Callsign::from_str_padded("TESTCALL");
        assert_eq!(cs.to_string(), "TESTCALL  ");
        assert_eq!(cs.trimmed(), "TESTCALL");
    }

    #[test]
    fn truncates_long_strings() {
        let cs = Callsign::from_str_padded("WAYTOOLONGCALLSIGN");
        assert_eq!(cs.as_wire().len(), CALLSIGN_LEN);
        assert_eq!(cs.trimmed(), "WAYTOOLONG");
    }

    #[test]
    fn placeholder_is_recognized() {
        assert!(Callsign::PLACEHOLDER.is_placeholder());
        assert!(!Callsign::from_str_padded("N0CALL").is_placeholder());
    }
}
