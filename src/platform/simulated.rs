// Keyguard — Simulated authentication subsystem
//
// Scriptable `AuthSubsystem` for tests and in-process demos. Availability,
// enrollment and the answer to each kind of challenge are set by the caller;
// every challenge presented is recorded so tests can assert on ordering.

use std::sync::{Mutex, MutexGuard};

use super::auth::{
    AuthFailure, AuthPolicy, AuthSubsystem, BiometryAvailability, EnrollmentStamp,
};

/// Failed biometric matches tolerated before lockout.
pub const MAX_FAILED_BIOMETRIC_ATTEMPTS: u32 = 5;

struct SimState {
    enrolled: bool,
    disabled: bool,
    locked: bool,
    enrollment_generation: u64,
    failed_attempts: u32,
    biometric_reply: Result<(), AuthFailure>,
    passcode_reply: Result<(), AuthFailure>,
    password_reply: Result<String, AuthFailure>,
    prompts: Vec<AuthPolicy>,
}

pub struct SimulatedAuthenticator {
    state: Mutex<SimState>,
}

impl SimulatedAuthenticator {
    /// Enrolled, available, and every challenge succeeds.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                enrolled: true,
                disabled: false,
                locked: false,
                enrollment_generation: 1,
                failed_attempts: 0,
                biometric_reply: Ok(()),
                passcode_reply: Ok(()),
                password_reply: Err(AuthFailure::Canceled),
                prompts: Vec::new(),
            }),
        }
    }

    // Poisoning only happens if a test panicked mid-call; recover the state.
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Force the availability the subsystem reports.
    pub fn set_availability(&self, availability: BiometryAvailability) {
        let mut s = self.state();
        match availability {
            BiometryAvailability::Available => {
                s.enrolled = true;
                s.disabled = false;
                s.locked = false;
            }
            BiometryAvailability::TemporarilyLocked => {
                s.enrolled = true;
                s.disabled = false;
                s.locked = true;
            }
            BiometryAvailability::Unavailable => {
                s.disabled = true;
            }
        }
    }

    /// Simulate the user adding or removing a fingerprint/face.
    pub fn re_enroll(&self) {
        let mut s = self.state();
        s.enrolled = true;
        s.enrollment_generation += 1;
    }

    pub fn set_biometric_reply(&self, reply: Result<(), AuthFailure>) {
        self.state().biometric_reply = reply;
    }

    pub fn set_passcode_reply(&self, reply: Result<(), AuthFailure>) {
        self.state().passcode_reply = reply;
    }

    /// What the user "types" when the keychain prompts for a password.
    pub fn set_password_reply(&self, reply: Result<String, AuthFailure>) {
        self.state().password_reply = reply;
    }

    /// Every challenge presented so far, in order.
    pub fn prompts(&self) -> Vec<AuthPolicy> {
        self.state().prompts.clone()
    }

    fn availability(s: &SimState) -> BiometryAvailability {
        if !s.enrolled || s.disabled {
            BiometryAvailability::Unavailable
        } else if s.locked {
            BiometryAvailability::TemporarilyLocked
        } else {
            BiometryAvailability::Available
        }
    }
}

impl Default for SimulatedAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSubsystem for SimulatedAuthenticator {
    fn biometry_state(&self) -> BiometryAvailability {
        Self::availability(&self.state())
    }

    fn enrollment(&self) -> Option<EnrollmentStamp> {
        let s = self.state();
        if !s.enrolled || s.disabled {
            return None;
        }
        Some(EnrollmentStamp::from_domain_state(
            &s.enrollment_generation.to_le_bytes(),
        ))
    }

    fn evaluate(&self, policy: AuthPolicy, reason: &str) -> Result<(), AuthFailure> {
        let mut s = self.state();
        s.prompts.push(policy);
        tracing::debug!(?policy, reason, "Simulated challenge presented");

        match policy {
            AuthPolicy::DeviceOwner => {
                let reply = s.passcode_reply.clone();
                if reply.is_ok() {
                    s.locked = false;
                    s.failed_attempts = 0;
                }
                reply
            }
            AuthPolicy::Biometrics => match Self::availability(&s) {
                BiometryAvailability::Unavailable => Err(AuthFailure::NotEnrolled),
                BiometryAvailability::TemporarilyLocked => Err(AuthFailure::Lockout),
                BiometryAvailability::Available => {
                    let reply = s.biometric_reply.clone();
                    match reply {
                        Ok(()) => s.failed_attempts = 0,
                        Err(AuthFailure::Failed) => {
                            s.failed_attempts += 1;
                            if s.failed_attempts >= MAX_FAILED_BIOMETRIC_ATTEMPTS {
                                s.locked = true;
                            }
                        }
                        Err(_) => {}
                    }
                    reply
                }
            },
            AuthPolicy::ApplicationPassword => s.password_reply.clone().map(|_| ()),
        }
    }

    fn prompt_password(&self, reason: &str) -> Result<String, AuthFailure> {
        let mut s = self.state();
        s.prompts.push(AuthPolicy::ApplicationPassword);
        tracing::debug!(reason, "Simulated password prompt presented");
        s.password_reply.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_available_and_enrolled() {
        let auth = SimulatedAuthenticator::new();
        assert_eq!(auth.biometry_state(), BiometryAvailability::Available);
        assert!(auth.enrollment().is_some());
    }

    #[test]
    fn test_repeated_failures_lock_biometry() {
        let auth = SimulatedAuthenticator::new();
        auth.set_biometric_reply(Err(AuthFailure::Failed));
        for _ in 0..MAX_FAILED_BIOMETRIC_ATTEMPTS {
            let _ = auth.evaluate(AuthPolicy::Biometrics, "test");
        }
        assert_eq!(auth.biometry_state(), BiometryAvailability::TemporarilyLocked);
        assert_eq!(
            auth.evaluate(AuthPolicy::Biometrics, "test"),
            Err(AuthFailure::Lockout)
        );
    }

    #[test]
    fn test_passcode_clears_lockout() {
        let auth = SimulatedAuthenticator::new();
        auth.set_availability(BiometryAvailability::TemporarilyLocked);
        auth.evaluate(AuthPolicy::DeviceOwner, "unlock").unwrap();
        assert_eq!(auth.biometry_state(), BiometryAvailability::Available);
    }

    #[test]
    fn test_unavailable_has_no_enrollment() {
        let auth = SimulatedAuthenticator::new();
        auth.set_availability(BiometryAvailability::Unavailable);
        assert!(auth.enrollment().is_none());
        assert_eq!(
            auth.evaluate(AuthPolicy::Biometrics, "x"),
            Err(AuthFailure::NotEnrolled)
        );
    }

    #[test]
    fn test_re_enroll_changes_stamp() {
        let auth = SimulatedAuthenticator::new();
        let before = auth.enrollment().unwrap();
        auth.re_enroll();
        assert_ne!(before, auth.enrollment().unwrap());
    }
}
