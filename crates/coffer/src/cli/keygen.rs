//! the `keygen` subcommand - prints a fresh secret key.

use clap::Args;
use color_eyre::eyre::Result;

use crate::SecretCipher;

/// print a random 32-byte key, hex encoded, for `COFFER_SECRET_KEY`
#[derive(Args, Debug)]
pub struct KeygenCommand {}

impl KeygenCommand {
    /// run the keygen command
    pub fn run(self) -> Result<()> {
        println!("{}", SecretCipher::generate_key_hex().as_str());
        Ok(())
    }
}
