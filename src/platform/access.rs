// Keyguard — Access control evaluation
//
// An `AccessControl` descriptor is attached to every keychain item at
// creation. The keychain seals it into a `Guard` (the persisted form) and
// checks the guard on every query. Application passwords are never stored:
// the guard keeps an Argon2id verifier derived from a random salt.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::auth::{AuthFailure, AuthPolicy, AuthSubsystem, EnrollmentStamp};
use super::keychain::{ItemQuery, UiMode};
use super::KeychainError;

const SALT_LEN: usize = 16;
const VERIFIER_LEN: usize = 32;

/// Prompt shown when the caller did not supply one.
pub const DEFAULT_PROMPT: &str = "Access protected keychain entry";

/// Access-control flags requested when an item is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessControl {
    /// Readable whenever the device is unlocked.
    WhenUnlocked,
    /// Gated by an application password supplied in the creation context.
    ApplicationPassword,
    /// Gated by biometrics, bound to the current enrollment set.
    BiometryCurrentSet,
}

/// Evaluated authentication state handed to the keychain with a query.
pub enum AuthContext {
    Unlocked,
    Password(Zeroizing<String>),
    Biometric { enrollment: EnrollmentStamp },
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "Unlocked"),
            Self::Password(_) => write!(f, "Password([REDACTED])"),
            Self::Biometric { enrollment } => f
                .debug_struct("Biometric")
                .field("enrollment", enrollment)
                .finish(),
        }
    }
}

/// Argon2id cost parameters for password verifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // m=19 MiB, t=2, p=1
        Self {
            m_cost: 19_456,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(VERIFIER_LEN))
            .map_err(|e| KeychainError::Param(format!("invalid Argon2 params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = Zeroizing::new(vec![0u8; VERIFIER_LEN]);
        argon2
            .hash_password_into(password, salt, &mut out)
            .map_err(|e| KeychainError::Backend(format!("Argon2id hash failed: {}", e)))?;
        Ok(out)
    }
}

/// Persisted protection of one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guard {
    Open,
    Password {
        salt: String,
        verifier: String,
        kdf: KdfParams,
    },
    Biometry {
        enrollment: EnrollmentStamp,
    },
}

impl Guard {
    /// Turn a creation request into the persisted guard.
    pub fn seal(
        access: AccessControl,
        context: Option<&AuthContext>,
        auth: &dyn AuthSubsystem,
        kdf: &KdfParams,
    ) -> Result<Self, KeychainError> {
        match access {
            AccessControl::WhenUnlocked => Ok(Self::Open),
            AccessControl::ApplicationPassword => {
                let password = match context {
                    Some(AuthContext::Password(pw)) => pw,
                    _ => {
                        return Err(KeychainError::Param(
                            "application password credential is required".to_string(),
                        ))
                    }
                };
                if password.is_empty() {
                    return Err(KeychainError::Param(
                        "application password must not be empty".to_string(),
                    ));
                }

                let mut salt = [0u8; SALT_LEN];
                rand::rng().fill_bytes(&mut salt);
                let verifier = kdf.derive(password.as_bytes(), &salt)?;

                Ok(Self::Password {
                    salt: hex::encode(salt),
                    verifier: hex::encode(verifier.as_slice()),
                    kdf: *kdf,
                })
            }
            AccessControl::BiometryCurrentSet => {
                let enrollment = auth.enrollment().ok_or(KeychainError::AuthUnavailable)?;
                Ok(Self::Biometry { enrollment })
            }
        }
    }

    /// Decide whether `query` may touch the guarded item.
    ///
    /// Prompts only when the query carries no context and allows UI.
    pub fn check(
        &self,
        query: &ItemQuery<'_>,
        auth: &dyn AuthSubsystem,
    ) -> Result<(), KeychainError> {
        match self {
            Self::Open => Ok(()),
            Self::Password {
                salt,
                verifier,
                kdf,
            } => {
                let candidate = match (query.context, query.ui) {
                    (Some(AuthContext::Password(pw)), _) => pw.clone(),
                    (Some(_), _) => {
                        return Err(KeychainError::AuthFailed(
                            "entry requires an application password".to_string(),
                        ))
                    }
                    (None, UiMode::Fail) => return Err(KeychainError::InteractionNotAllowed),
                    (None, UiMode::Allow) => {
                        let reason = query.prompt.unwrap_or(DEFAULT_PROMPT);
                        Zeroizing::new(auth.prompt_password(reason).map_err(from_auth_failure)?)
                    }
                };
                verify_password(&candidate, salt, verifier, kdf)
            }
            Self::Biometry { enrollment } => match (query.context, query.ui) {
                (Some(AuthContext::Biometric { enrollment: proof }), _) => {
                    ensure_enrollment_unchanged(enrollment, auth)?;
                    if proof != enrollment {
                        return Err(KeychainError::AuthFailed(
                            "authorization was issued for a different enrollment".to_string(),
                        ));
                    }
                    Ok(())
                }
                (Some(_), _) => Err(KeychainError::AuthFailed(
                    "entry requires biometric authentication".to_string(),
                )),
                (None, UiMode::Fail) => Err(KeychainError::InteractionNotAllowed),
                (None, UiMode::Allow) => {
                    ensure_enrollment_unchanged(enrollment, auth)?;
                    let reason = query.prompt.unwrap_or(DEFAULT_PROMPT);
                    auth.evaluate(AuthPolicy::Biometrics, reason)
                        .map_err(from_auth_failure)
                }
            },
        }
    }
}

fn verify_password(
    candidate: &str,
    salt: &str,
    verifier: &str,
    kdf: &KdfParams,
) -> Result<(), KeychainError> {
    if candidate.is_empty() {
        return Err(KeychainError::AuthFailed("empty password".to_string()));
    }
    let salt = hex::decode(salt)
        .map_err(|e| KeychainError::Backend(format!("corrupted salt: {}", e)))?;
    let expected = hex::decode(verifier)
        .map_err(|e| KeychainError::Backend(format!("corrupted verifier: {}", e)))?;

    let actual = kdf.derive(candidate.as_bytes(), &salt)?;
    if bool::from(actual.as_slice().ct_eq(expected.as_slice())) {
        Ok(())
    } else {
        Err(KeychainError::AuthFailed("wrong password".to_string()))
    }
}

fn ensure_enrollment_unchanged(
    sealed: &EnrollmentStamp,
    auth: &dyn AuthSubsystem,
) -> Result<(), KeychainError> {
    match auth.enrollment() {
        Some(current) if current == *sealed => Ok(()),
        Some(_) => Err(KeychainError::AuthFailed(
            "biometric enrollment changed; entry must be recreated".to_string(),
        )),
        None => Err(KeychainError::AuthUnavailable),
    }
}

/// Map an authentication-subsystem failure onto a keychain status.
pub fn from_auth_failure(failure: AuthFailure) -> KeychainError {
    match failure {
        AuthFailure::Canceled => KeychainError::UserCanceled,
        AuthFailure::NotEnrolled => KeychainError::AuthUnavailable,
        other => KeychainError::AuthFailed(other.to_string()),
    }
}
