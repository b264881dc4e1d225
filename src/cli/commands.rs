// Keyguard — CLI Command Handlers
//
// Each function handles one CLI subcommand. They wire the config, the
// console authenticator, the OS-keyring keychain and the key facility into
// the demo flows and print the resulting status lines.

use std::sync::Arc;

use crate::config::Config;
use crate::demo::{BiometryDemo, PasswordDemo, SecuredKeyDemo};
use crate::enclave::SoftwareKeyFacility;
use crate::error::KeyguardError;
use crate::gate::AuthenticationGate;
use crate::platform::{AuthSubsystem, KeyringKeychain};
use crate::store::{CredentialStore, KeychainCredentialStore};

use super::console::ConsoleAuthenticator;
use super::{BioAction, Cli, Commands, PasswordAction};

struct Services {
    auth: Arc<dyn AuthSubsystem>,
    gate: AuthenticationGate,
    store: Arc<dyn CredentialStore>,
}

fn services(config: &Config) -> Services {
    let auth: Arc<dyn AuthSubsystem> = Arc::new(ConsoleAuthenticator::new(&config.console));
    let keychain = Arc::new(KeyringKeychain::new(
        &config.keyring_service,
        auth.clone(),
        config.kdf,
    ));
    Services {
        gate: AuthenticationGate::new(auth.clone()),
        store: Arc::new(KeychainCredentialStore::with_handle_ttl(
            keychain,
            config.handle_ttl(),
        )),
        auth,
    }
}

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), KeyguardError> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(service = %config.keyring_service, "Configuration ready");

    match cli.command {
        Commands::Password { action } => cmd_password(&config, action).await,
        Commands::Bio { action } => cmd_bio(&config, action).await,
        Commands::Key { bio } => cmd_key(&config, bio).await,
    }
    Ok(())
}

// ─── Password ────────────────────────────────────────────────────────────────

async fn cmd_password(config: &Config, action: PasswordAction) {
    let s = services(config);
    let demo = PasswordDemo::new(s.store, s.gate, s.auth);

    let status = match action {
        PasswordAction::Create => demo.create(),
        PasswordAction::ReadInline => demo.read_inline().await,
        PasswordAction::ReadContext => demo.read_with_context().await,
        PasswordAction::ReadPassword { password } => demo.read_with_password(&password).await,
    };
    println!("{}", status);
}

// ─── Biometry ────────────────────────────────────────────────────────────────

async fn cmd_bio(config: &Config, action: BioAction) {
    let s = services(config);
    let demo = BiometryDemo::new(s.store, s.gate);

    let status = match action {
        BioAction::State => demo.biometry_state_label(),
        BioAction::Create => demo.create(),
        BioAction::ReadInline => {
            println!("{}", demo.biometry_state_label());
            demo.read_inline().await
        }
        BioAction::ReadContext => {
            println!("{}", demo.biometry_state_label());
            demo.read_with_context().await
        }
        BioAction::Remove => demo.remove(),
        BioAction::Check => demo.check(),
    };
    println!("{}", status);
}

// ─── Key ─────────────────────────────────────────────────────────────────────

async fn cmd_key(config: &Config, bio: bool) {
    let auth: Arc<dyn AuthSubsystem> = Arc::new(ConsoleAuthenticator::new(&config.console));
    let mut demo = SecuredKeyDemo::new(Arc::new(SoftwareKeyFacility::new(auth)));
    demo.set_use_biometry(bio);

    println!("Key:  {}", demo.key_tag());
    println!("{}", demo.clear_text_label());
    println!("{}", demo.encrypt());
    println!("{}", demo.public_key_label());
    println!("{}", demo.decrypt().await);
    println!("{}", demo.sign_message().await);
    println!("{}", demo.verify());
    println!("{}", demo.sign_digest().await);
    println!("{}", demo.verify());
}
