// Keyguard — Authentication Gate
//
// Decides whether a secret needs an interactive challenge before release,
// runs it, and hands back a single-use authorization handle.
//
// Biometric flow:
//   1. read availability (never cached)
//   2. Unavailable      -> give up, no challenge
//   3. TemporarilyLocked -> device-owner (passcode) challenge first; a locked
//      biometric sensor only recovers through the stronger factor
//   4. biometric challenge -> handle bound to the current enrollment

use std::sync::Arc;

use crate::platform::{AuthContext, AuthPolicy, AuthSubsystem, BiometryAvailability};

use super::handle::{AuthorizationHandle, AuthorizationOutcome, PolicyKind};

#[derive(Clone)]
pub struct AuthenticationGate {
    auth: Arc<dyn AuthSubsystem>,
}

impl AuthenticationGate {
    pub fn new(auth: Arc<dyn AuthSubsystem>) -> Self {
        Self { auth }
    }

    /// Current biometric availability. Cheap and side-effect free.
    pub fn check_availability(&self) -> BiometryAvailability {
        self.auth.biometry_state()
    }

    /// Authorize one access of the given policy kind.
    ///
    /// May block on user interaction; run it through `dispatch::run_blocking`
    /// when called from the interaction context.
    pub fn authorize(&self, kind: PolicyKind, reason: &str) -> AuthorizationOutcome {
        match kind {
            PolicyKind::DeviceUnlockOnly => {
                AuthorizationOutcome::Authorized(AuthorizationHandle::issue(AuthContext::Unlocked))
            }
            PolicyKind::Password(password) => {
                if password.is_empty() {
                    tracing::info!("Authorization declined: empty password");
                    return AuthorizationOutcome::Declined("password must not be empty".to_string());
                }
                AuthorizationOutcome::Authorized(AuthorizationHandle::issue(AuthContext::Password(
                    password,
                )))
            }
            PolicyKind::Biometry => self.authorize_biometry(reason),
        }
    }

    /// Steps 1-3 of the biometric flow: make sure a biometric challenge can
    /// be presented. `Err` carries the outcome to report instead.
    pub fn recover_biometry(&self, reason: &str) -> Result<(), AuthorizationOutcome> {
        let availability = self.check_availability();
        tracing::debug!(%availability, "Biometry availability checked");

        match availability {
            BiometryAvailability::Unavailable => Err(AuthorizationOutcome::Unavailable),
            BiometryAvailability::TemporarilyLocked => {
                if let Err(failure) = self.auth.evaluate(AuthPolicy::DeviceOwner, reason) {
                    tracing::info!(%failure, "Device unlock challenge failed");
                    return Err(AuthorizationOutcome::Declined(failure.to_string()));
                }
                tracing::info!("Biometric lockout cleared by device unlock");
                Ok(())
            }
            BiometryAvailability::Available => Ok(()),
        }
    }

    fn authorize_biometry(&self, reason: &str) -> AuthorizationOutcome {
        if let Err(outcome) = self.recover_biometry(reason) {
            return outcome;
        }

        if let Err(failure) = self.auth.evaluate(AuthPolicy::Biometrics, reason) {
            tracing::info!(%failure, "Biometric challenge failed");
            return AuthorizationOutcome::Declined(failure.to_string());
        }

        // Enrollment can vanish between the challenge and this read.
        match self.auth.enrollment() {
            Some(enrollment) => {
                let handle = AuthorizationHandle::issue(AuthContext::Biometric { enrollment });
                tracing::debug!(handle_id = %handle.id(), "Biometric authorization issued");
                AuthorizationOutcome::Authorized(handle)
            }
            None => AuthorizationOutcome::Unavailable,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{AuthFailure, SimulatedAuthenticator};
    use zeroize::Zeroizing;

    fn gate() -> (Arc<SimulatedAuthenticator>, AuthenticationGate) {
        let auth = Arc::new(SimulatedAuthenticator::new());
        let gate = AuthenticationGate::new(auth.clone());
        (auth, gate)
    }

    #[test]
    fn test_unavailable_never_prompts() {
        let (auth, gate) = gate();
        auth.set_availability(BiometryAvailability::Unavailable);

        let outcome = gate.authorize(PolicyKind::Biometry, "Access entry");
        assert!(matches!(outcome, AuthorizationOutcome::Unavailable));
        assert!(
            auth.prompts().is_empty(),
            "No challenge may be presented when biometry is unavailable"
        );
    }

    #[test]
    fn test_locked_unlocks_with_passcode_before_biometrics() {
        let (auth, gate) = gate();
        auth.set_availability(BiometryAvailability::TemporarilyLocked);

        let outcome = gate.authorize(PolicyKind::Biometry, "Access entry");
        assert!(outcome.is_authorized());
        assert_eq!(
            auth.prompts(),
            vec![AuthPolicy::DeviceOwner, AuthPolicy::Biometrics],
            "Device unlock must precede the biometric challenge"
        );
    }

    #[test]
    fn test_locked_with_failed_passcode_is_declined() {
        let (auth, gate) = gate();
        auth.set_availability(BiometryAvailability::TemporarilyLocked);
        auth.set_passcode_reply(Err(AuthFailure::Canceled));

        let outcome = gate.authorize(PolicyKind::Biometry, "Access entry");
        assert!(matches!(outcome, AuthorizationOutcome::Declined(_)));
        assert_eq!(auth.prompts(), vec![AuthPolicy::DeviceOwner]);
    }

    #[test]
    fn test_recover_biometry_presents_no_biometric_prompt() {
        let (auth, gate) = gate();
        auth.set_availability(BiometryAvailability::TemporarilyLocked);

        assert!(gate.recover_biometry("Access entry").is_ok());
        assert_eq!(auth.prompts(), vec![AuthPolicy::DeviceOwner]);
        assert_eq!(gate.check_availability(), BiometryAvailability::Available);
    }

    #[test]
    fn test_available_prompts_biometrics_only() {
        let (auth, gate) = gate();
        let outcome = gate.authorize(PolicyKind::Biometry, "Access entry");
        assert!(outcome.is_authorized());
        assert_eq!(auth.prompts(), vec![AuthPolicy::Biometrics]);
    }

    #[test]
    fn test_biometric_cancel_is_declined() {
        let (auth, gate) = gate();
        auth.set_biometric_reply(Err(AuthFailure::Canceled));
        let outcome = gate.authorize(PolicyKind::Biometry, "Access entry");
        assert!(matches!(outcome, AuthorizationOutcome::Declined(_)));
    }

    #[test]
    fn test_availability_is_not_cached() {
        let (auth, gate) = gate();
        assert_eq!(gate.check_availability(), BiometryAvailability::Available);
        auth.set_availability(BiometryAvailability::Unavailable);
        assert_eq!(gate.check_availability(), BiometryAvailability::Unavailable);
    }

    #[test]
    fn test_empty_password_is_declined() {
        let (_auth, gate) = gate();
        let outcome = gate.authorize(PolicyKind::Password(Zeroizing::new(String::new())), "x");
        assert!(matches!(outcome, AuthorizationOutcome::Declined(_)));
    }

    #[test]
    fn test_password_and_unlock_kinds_never_prompt() {
        let (auth, gate) = gate();
        assert!(gate
            .authorize(PolicyKind::Password(Zeroizing::new("pw".to_string())), "x")
            .is_authorized());
        assert!(gate.authorize(PolicyKind::DeviceUnlockOnly, "x").is_authorized());
        assert!(auth.prompts().is_empty());
    }
}
