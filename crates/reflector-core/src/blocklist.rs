//! Periodically-reloaded set of forbidden source callsigns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::callsign::Callsign;
use crate::clock::Timer;
use crate::error::Result;

/// A set of blocked source callsigns, reloaded from disk on an interval.
pub struct Blocklist {
    path: PathBuf,
    set: HashSet<Callsign>,
    reload: Timer,
}

impl Blocklist {
    /// Load the blocklist from `path` and start the reload timer.
    ///
    /// A failure here is fatal (it mirrors a missing/invalid configuration
    /// file, not a transient condition) — callers should treat it like any
    /// other startup error.
    pub async fn load(path: impl AsRef<Path>, reload_interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let set = parse(&tokio::fs::read_to_string(&path).await?);
        let mut reload = Timer::new(reload_interval);
        reload.start();
        Ok(Self { path, set, reload })
    }

    /// Is `src` forbidden? Pure and side-effect-free.
    pub fn check(&self, src: &Callsign) -> bool {
        self.set.contains(src)
    }

    /// Advance the reload timer; on expiry, re-read the file and swap the
    /// set by value. A read failure during reload is logged and the
    /// existing set is kept (fail open on reload, never on initial load).
    /// Returns `true` if a reload attempt occurred.
    pub async fn tick(&mut self, elapsed: Duration) -> bool {
        self.reload.tick(elapsed);
        if !self.reload.expired() {
            return false;
        }
        self.reload.start();

        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => self.set = parse(&contents),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "blocklist reload failed, keeping previous set");
            }
        }
        true
    }

    /// Number of entries currently loaded.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// True if the blocklist is currently empty.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// One callsign per line; leading/trailing whitespace trimmed; blank and
/// `#`-comment lines ignored; duplicates collapsed via the `HashSet`.
fn parse(contents: &str) -> HashSet<Callsign> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Callsign::from_str_padded(&line.to_ascii_uppercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tmp(contents: &str) -> tempfile_path::TempPath {
        tempfile_path::TempPath::with_contents(contents)
    }

    // Minimal scratch-file helper: avoids pulling in a `tempfile` dependency
    // for what is otherwise a two-test module.
    mod tempfile_path {
        use std::fs;
        use std::path::PathBuf;
        use std::sync::atomic::{AtomicU64, Ordering};

        pub struct TempPath(pub PathBuf);

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        impl TempPath {
            pub fn with_contents(contents: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                let path = std::env::temp_dir().join(format!("reflector-core-blocklist-test-{}-{n}", std::process::id()));
                fs::write(&path, contents).unwrap();
                Self(path)
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = fs::remove_file(&self.0);
            }
        }
    }

    #[test]
    fn parse_trims_comments_and_blanks() {
        let set = parse("# comment\n\nAB1CDE\n  FG2HIJ  \n# another\n");
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Callsign::from_str_padded("AB1CDE")));
        assert!(set.contains(&Callsign::from_str_padded("FG2HIJ")));
    }

    #[test]
    fn parse_collapses_duplicates() {
        let set = parse("AB1CDE\nAB1CDE\n");
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn load_then_check() {
        let f = write_tmp("BLOCKED1\n");
        let bl = Blocklist::load(&f.0, Duration::from_secs(300)).await.unwrap();
        assert!(bl.check(&Callsign::from_str_padded("BLOCKED1")));
        assert!(!bl.check(&Callsign::from_str_padded("ALLOWED1")));
    }

    #[tokio::test]
    async fn reload_picks_up_changes() {
        let f = write_tmp("BLOCKED1\n");
        let mut bl = Blocklist::load(&f.0, Duration::from_millis(10)).await.unwrap();
        std::fs::write(&f.0, "BLOCKED2\n").unwrap();
        let reloaded = bl.tick(Duration::from_millis(15)).await;
        assert!(reloaded);
        assert!(!bl.check(&Callsign::from_str_padded("BLOCKED1")));
        assert!(bl.check(&Callsign::from_str_padded("BLOCKED2")));
    }
}
