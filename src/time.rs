use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction to allow testing/time injection.
pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the UNIX epoch.
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTimeProvider(pub u64);

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
