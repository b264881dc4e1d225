// Keyguard — Password-gated entry demo

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::dispatch::run_blocking;
use crate::gate::{AuthenticationGate, AuthorizationOutcome, PolicyKind};
use crate::platform::AuthSubsystem;
use crate::store::{AccessPolicy, CredentialStore, SecretBlob, StoreError};

use super::{describe_outcome, ACCESS_REASON};

pub const ENTRY_NAME: &str = "test_entry_pass";
pub const ENTRY_CONTENTS: &str = "Hello!";
pub const ENTRY_PASSWORD: &str = "qwerty";

/// Outer `Err` is an authorization failure, inner is the read itself.
type ContextRead = Result<Result<SecretBlob, StoreError>, String>;

pub struct PasswordDemo {
    store: Arc<dyn CredentialStore>,
    gate: AuthenticationGate,
    auth: Arc<dyn AuthSubsystem>,
}

impl PasswordDemo {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        gate: AuthenticationGate,
        auth: Arc<dyn AuthSubsystem>,
    ) -> Self {
        Self { store, gate, auth }
    }

    /// Create the sample entry protected by the sample password.
    pub fn create(&self) -> String {
        let policy = AccessPolicy::password(ENTRY_PASSWORD);
        match self.store.store(ENTRY_NAME, ENTRY_CONTENTS.as_bytes(), &policy) {
            Ok(()) => "Entry successfully created!".to_string(),
            Err(e) => super::creation_failed(&e),
        }
    }

    /// Read and let the platform ask for the password itself.
    pub async fn read_inline(&self) -> String {
        let store = self.store.clone();
        let result = run_blocking("password.read_inline", move || {
            store.read_with_prompt(ENTRY_NAME, ACCESS_REASON)
        })
        .await;
        match result {
            Ok(read) => entry_status(read),
            Err(e) => format!("Failed to load keychain entry: {}", e),
        }
    }

    /// Ask for the password up front, authorize through the gate, then read
    /// with the resulting handle.
    pub async fn read_with_context(&self) -> String {
        let auth = self.auth.clone();
        let gate = self.gate.clone();
        let store = self.store.clone();

        let result = run_blocking("password.read_with_context", move || -> ContextRead {
            let password = auth
                .prompt_password(ACCESS_REASON)
                .map_err(|failure| failure.to_string())?;
            let outcome =
                gate.authorize(PolicyKind::Password(Zeroizing::new(password)), ACCESS_REASON);
            match outcome {
                AuthorizationOutcome::Authorized(handle) => {
                    Ok(store.read(ENTRY_NAME, Some(handle)))
                }
                other => Err(describe_outcome(&other)),
            }
        })
        .await;

        match result {
            Ok(Ok(read)) => entry_status(read),
            Ok(Err(reason)) => format!("Authorization failed: {}", reason),
            Err(e) => format!("Failed to load keychain entry: {}", e),
        }
    }

    /// Read with a password the user already typed; never prompts.
    pub async fn read_with_password(&self, typed: &str) -> String {
        let gate = self.gate.clone();
        let store = self.store.clone();
        let typed = Zeroizing::new(typed.to_string());

        let result = run_blocking("password.read_with_password", move || {
            match gate.authorize(PolicyKind::Password(typed), ACCESS_REASON) {
                AuthorizationOutcome::Authorized(handle) => store.read(ENTRY_NAME, Some(handle)),
                other => Err(StoreError::AuthenticationDeclined(describe_outcome(&other))),
            }
        })
        .await;

        match result {
            Ok(read) => entry_status(read),
            Err(e) => format!("Failed to load keychain entry: {}", e),
        }
    }
}

fn entry_status(result: Result<SecretBlob, StoreError>) -> String {
    match result {
        Ok(blob) => format!("Keychain entry contains: {}", blob.to_string_lossy()),
        Err(e) => {
            tracing::info!(key = ENTRY_NAME, error = %e, "Password entry not loaded");
            "Failed to load keychain entry".to_string()
        }
    }
}
