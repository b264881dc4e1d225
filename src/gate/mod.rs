// Keyguard — Gate Module
//
// Authentication gating in front of the secret store: availability checks,
// lockout recovery, and single-use authorization handles.

mod gatekeeper;
mod handle;

pub use gatekeeper::AuthenticationGate;
pub use handle::{AuthorizationHandle, AuthorizationOutcome, PolicyKind};
