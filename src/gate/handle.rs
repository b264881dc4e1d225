// Keyguard — Authorization handles
//
// A handle is the only proof the store accepts that a challenge already
// succeeded. It is not `Clone` and is consumed by value on read, so one
// handle can unlock at most one read.

use std::fmt;
use std::time::{Duration, Instant};

use uuid::Uuid;
use zeroize::Zeroizing;

use crate::platform::AuthContext;

/// Which kind of proof the caller wants the gate to produce.
pub enum PolicyKind {
    DeviceUnlockOnly,
    /// The password is compared by the platform keychain at read time.
    Password(Zeroizing<String>),
    Biometry,
}

impl fmt::Debug for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnlockOnly => write!(f, "DeviceUnlockOnly"),
            Self::Password(_) => write!(f, "Password([REDACTED])"),
            Self::Biometry => write!(f, "Biometry"),
        }
    }
}

/// Single-use proof of a successful authentication challenge.
pub struct AuthorizationHandle {
    id: Uuid,
    issued_at: Instant,
    context: AuthContext,
}

impl AuthorizationHandle {
    pub(crate) fn issue(context: AuthContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            issued_at: Instant::now(),
            context,
        }
    }

    /// Whether the handle is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.issued_at.elapsed() > ttl
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    /// Give up the handle, yielding the context the keychain evaluates.
    pub(crate) fn into_context(self) -> AuthContext {
        self.context
    }
}

impl fmt::Debug for AuthorizationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationHandle")
            .field("id", &self.id)
            .field("context", &self.context)
            .finish()
    }
}

/// Result of asking the gate for access.
#[derive(Debug)]
pub enum AuthorizationOutcome {
    Authorized(AuthorizationHandle),
    Declined(String),
    /// Biometrics not enrolled or disabled; no challenge was attempted.
    Unavailable,
}

impl AuthorizationOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// The handle, if authorization succeeded.
    pub fn into_handle(self) -> Option<AuthorizationHandle> {
        match self {
            Self::Authorized(handle) => Some(handle),
            _ => None,
        }
    }
}
