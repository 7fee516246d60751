use chrono::{DateTime, Duration, Utc};

/// Access scope carried by a [`ReadGrant`]. Fetch links are always
/// read-only; the variant exists so the scope is explicit at signing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    ReadOnly,
}

/// A time-bounded, read-only access grant for a single object.
///
/// Computed fresh on every fetch request, never cached or persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadGrant {
    pub expires_at: DateTime<Utc>,
    pub access: AccessLevel,
}

/// Policy producing read grants with a fixed lifetime.
///
/// The TTL is supplied once at storage construction; there is no per-call
/// override.
#[derive(Debug, Clone, Copy)]
pub struct SasPolicy {
    ttl: Duration,
}

impl SasPolicy {
    pub fn new(ttl: std::time::Duration) -> Self {
        // Grant lifetimes are bounded configuration values; saturate rather
        // than fail on absurd inputs.
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        Self { ttl }
    }

    /// Grant expiring `ttl` after the supplied instant.
    pub fn grant_at(&self, now: DateTime<Utc>) -> ReadGrant {
        ReadGrant {
            expires_at: now + self.ttl,
            access: AccessLevel::ReadOnly,
        }
    }

    /// Grant expiring `ttl` from the current wall clock.
    pub fn grant(&self) -> ReadGrant {
        self.grant_at(Utc::now())
    }
}
