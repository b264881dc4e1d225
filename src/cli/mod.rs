// Keyguard — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: password, bio, key.

mod commands;
mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;
pub use console::ConsoleAuthenticator;

/// Keyguard — policy-gated secrets and keys over the platform credential store.
#[derive(Parser, Debug)]
#[command(name = "keyguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON config file (default: <config_dir>/keyguard/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Password-protected sample entry.
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },

    /// Biometry-protected sample entry.
    Bio {
        #[command(subcommand)]
        action: BioAction,
    },

    /// Walk through encrypt, decrypt, sign and verify with a sample key.
    Key {
        /// Use the biometry-bound key.
        #[arg(long, default_value = "false")]
        bio: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordAction {
    /// Create the entry protected by the sample password.
    Create,

    /// Read, letting the platform ask for the password.
    ReadInline,

    /// Authorize first, then read with the authorization.
    ReadContext,

    /// Read with a password given on the command line.
    ReadPassword {
        /// The password to try.
        password: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum BioAction {
    /// Show the current biometry state.
    State,

    /// Create the biometry-protected entry.
    Create,

    /// Read, letting the platform present the biometric prompt.
    ReadInline,

    /// Authorize first, then read with the authorization.
    ReadContext,

    /// Remove the entry.
    Remove,

    /// Check whether the entry exists, without prompting.
    Check,
}
