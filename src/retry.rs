//! Re-authentication budget for rate-limited media resolution.

/// Whether the single re-authenticate-and-retry cycle is still available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthRetry {
    Available,
    Exhausted,
}

impl ReauthRetry {
    /// A fresh budget of exactly one retry.
    pub fn once() -> Self {
        ReauthRetry::Available
    }

    /// Consume the retry. Returns `false` once it has been used.
    pub fn try_acquire(&mut self) -> bool {
        match self {
            ReauthRetry::Available => {
                *self = ReauthRetry::Exhausted;
                true
            }
            ReauthRetry::Exhausted => false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        *self == ReauthRetry::Exhausted
    }
}

impl Default for ReauthRetry {
    fn default() -> Self {
        Self::once()
    }
}
