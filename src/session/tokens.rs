use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic token source; only the most recently issued token is current.
///
/// Results produced for an older token belong to a superseded query and
/// must be discarded by the caller.
#[derive(Debug, Default)]
pub struct RequestTokens {
    last: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestToken {
        RequestToken(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.last.load(Ordering::SeqCst) == token.0
    }
}
