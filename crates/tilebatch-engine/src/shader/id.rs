use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide source of shader identifiers.
///
/// Starts at 1 and only ever increments; there is no reset.
static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a shader instance, unique for the lifetime of the process.
///
/// Used for diagnostics and for callers that cache per-shader GPU state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderId(u64);

impl ShaderId {
    /// Allocates the next identifier.
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shader#{}", self.0)
    }
}
