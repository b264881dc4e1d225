// Keyguard — Console authentication subsystem
//
// Terminal stand-in for the platform authentication UI. Biometric and
// device-owner challenges are a y/N confirmation on stdin; application
// passwords are read without echo. Availability and enrollment come from
// the config file; a successful device-owner challenge clears a lockout.

use std::io::{self, BufRead, Write};
use std::sync::{Mutex, MutexGuard};

use crate::config::ConsoleAuthConfig;
use crate::platform::{
    AuthFailure, AuthPolicy, AuthSubsystem, BiometryAvailability, EnrollmentStamp,
};

pub struct ConsoleAuthenticator {
    availability: Mutex<BiometryAvailability>,
    enrollment_id: String,
}

impl ConsoleAuthenticator {
    pub fn new(config: &ConsoleAuthConfig) -> Self {
        Self {
            availability: Mutex::new(config.biometry),
            enrollment_id: config.enrollment_id.clone(),
        }
    }

    // A poisoned lock still holds a valid availability value.
    fn state(&self) -> MutexGuard<'_, BiometryAvailability> {
        self.availability.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Console authenticator state poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn current(&self) -> BiometryAvailability {
        *self.state()
    }

    fn confirm(label: &str, reason: &str) -> Result<(), AuthFailure> {
        eprint!("[{}] {} - confirm? [y/N] ", label, reason);
        io::stderr()
            .flush()
            .map_err(|e| AuthFailure::Other(e.to_string()))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AuthFailure::Other(e.to_string()))?;

        match line.trim() {
            "y" | "Y" | "yes" => Ok(()),
            _ => Err(AuthFailure::Canceled),
        }
    }
}

impl AuthSubsystem for ConsoleAuthenticator {
    fn biometry_state(&self) -> BiometryAvailability {
        self.current()
    }

    fn enrollment(&self) -> Option<EnrollmentStamp> {
        match self.current() {
            BiometryAvailability::Unavailable => None,
            _ => Some(EnrollmentStamp::from_domain_state(self.enrollment_id.as_bytes())),
        }
    }

    fn evaluate(&self, policy: AuthPolicy, reason: &str) -> Result<(), AuthFailure> {
        match policy {
            AuthPolicy::DeviceOwner => {
                Self::confirm("passcode", reason)?;
                let mut availability = self.state();
                if *availability == BiometryAvailability::TemporarilyLocked {
                    *availability = BiometryAvailability::Available;
                }
                Ok(())
            }
            AuthPolicy::Biometrics => match self.current() {
                BiometryAvailability::Unavailable => Err(AuthFailure::NotEnrolled),
                BiometryAvailability::TemporarilyLocked => Err(AuthFailure::Lockout),
                BiometryAvailability::Available => Self::confirm("biometrics", reason),
            },
            AuthPolicy::ApplicationPassword => self.prompt_password(reason).map(|_| ()),
        }
    }

    fn prompt_password(&self, reason: &str) -> Result<String, AuthFailure> {
        let password = rpassword::prompt_password(format!("{}\nPassword: ", reason))
            .map_err(|e| AuthFailure::Other(e.to_string()))?;
        if password.is_empty() {
            return Err(AuthFailure::Canceled);
        }
        Ok(password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console(biometry: BiometryAvailability) -> ConsoleAuthenticator {
        ConsoleAuthenticator::new(&ConsoleAuthConfig {
            biometry,
            enrollment_id: "test".to_string(),
        })
    }

    #[test]
    fn test_enrollment_follows_availability() {
        assert!(console(BiometryAvailability::Available).enrollment().is_some());
        assert!(console(BiometryAvailability::TemporarilyLocked)
            .enrollment()
            .is_some());
        assert!(console(BiometryAvailability::Unavailable).enrollment().is_none());
    }

    #[test]
    fn test_enrollment_is_stable_per_id() {
        let a = console(BiometryAvailability::Available);
        let b = console(BiometryAvailability::Available);
        assert_eq!(a.enrollment(), b.enrollment());

        let other = ConsoleAuthenticator::new(&ConsoleAuthConfig {
            biometry: BiometryAvailability::Available,
            enrollment_id: "other".to_string(),
        });
        assert_ne!(a.enrollment(), other.enrollment());
    }

    #[test]
    fn test_poisoned_state_keeps_last_availability() {
        let auth = std::sync::Arc::new(console(BiometryAvailability::TemporarilyLocked));
        let holder = auth.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.availability.lock().unwrap();
            panic!("panic while holding the console state");
        })
        .join();

        assert!(auth.availability.is_poisoned());
        assert_eq!(auth.biometry_state(), BiometryAvailability::TemporarilyLocked);
        assert!(auth.enrollment().is_some());
    }

    #[test]
    fn test_biometrics_refused_without_prompt_when_not_available() {
        assert_eq!(
            console(BiometryAvailability::Unavailable).evaluate(AuthPolicy::Biometrics, "x"),
            Err(AuthFailure::NotEnrolled)
        );
        assert_eq!(
            console(BiometryAvailability::TemporarilyLocked).evaluate(AuthPolicy::Biometrics, "x"),
            Err(AuthFailure::Lockout)
        );
    }
}
