use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

/// Process wide resource version counter.
///
/// Versions are a plain atomic sequence, never derived from wall clock time,
/// so successive calls always progress by exactly one.
#[derive(Debug, Default)]
pub struct VersionAssigner {
    last: AtomicI64,
}

impl VersionAssigner {
    /// The first call to [`next`](Self::next) returns `seed + 1`.
    pub fn new(seed: i64) -> Self {
        Self {
            last: AtomicI64::new(seed),
        }
    }

    pub fn next(&self) -> i64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last value handed out, or the seed
    pub fn current(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }
}
