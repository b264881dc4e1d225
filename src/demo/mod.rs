// Keyguard — Demo flows
//
// The three sample screens as plain async operations: password-gated
// entries, biometry-gated entries, and keys held by the key facility.
// Every operation returns the status line to show; failures end up in that
// line and never abort the caller. Blocking work goes through
// `dispatch::run_blocking` and state is only touched after it completes.

mod biometry;
mod password;
mod secured_key;

pub use biometry::BiometryDemo;
pub use password::PasswordDemo;
pub use secured_key::SecuredKeyDemo;

use crate::gate::AuthorizationOutcome;
use crate::store::StoreError;

/// Prompt shown for the sample entries.
pub const ACCESS_REASON: &str = "Access sample keychain entry";

/// Status line before anything has happened.
pub const IDLE_STATUS: &str = "---";

fn describe_outcome(outcome: &AuthorizationOutcome) -> String {
    match outcome {
        AuthorizationOutcome::Authorized(_) => "authorized".to_string(),
        AuthorizationOutcome::Declined(reason) => reason.clone(),
        AuthorizationOutcome::Unavailable => "biometry not available".to_string(),
    }
}

/// Platform failures keep the OSStatus form, e.g. `osstatus=-50`.
fn creation_failed(error: &StoreError) -> String {
    match error {
        StoreError::Platform { code, .. } => format!("Entry creation failed, osstatus={}", code),
        other => format!("Entry creation failed: {}", other),
    }
}

/// Uppercase hex bytes separated by spaces, e.g. `48 65 6C`.
pub fn hex_label(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    let mut out = String::with_capacity(encoded.len() + bytes.len());
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&String::from_utf8_lossy(pair));
    }
    out
}
