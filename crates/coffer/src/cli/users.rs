//! the `users` subcommand - manage users

use std::path::PathBuf;

use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result};
use coffer_types::Principal;

use super::{ConfigArgs, ensure_sqlite_dir, init_logging};
use crate::{Coffer, NewUser};

/// manage users
#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// register a user and create their personal vault
    Register(RegisterUserArgs),
}

/// register a user
#[derive(Args, Debug)]
pub struct RegisterUserArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// username
    name: String,

    /// email address (optional)
    #[arg(long)]
    email: Option<String>,

    /// file holding the user's public key (optional)
    #[arg(long)]
    public_key_file: Option<PathBuf>,
}

impl UsersCommand {
    /// run the users command
    pub async fn run(self) -> Result<()> {
        match self {
            UsersCommand::Register(args) => register_user(args).await,
        }
    }
}

async fn register_user(args: RegisterUserArgs) -> Result<()> {
    let config = args.config.into_config()?;
    init_logging(config.log_level.as_deref())?;
    ensure_sqlite_dir(&config)?;

    let public_key = match &args.public_key_file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read public key file: {:?}", path))?,
        None => Vec::new(),
    };

    let coffer = Coffer::from_config(&config)
        .await
        .context("failed to start coffer")?;
    let user = coffer
        .register_user(NewUser {
            name: args.name,
            email: args.email,
            public_key,
        })
        .await
        .context("failed to register user")?;
    let vault = coffer
        .personal_vault(&Principal::user(user.pid.clone()))
        .await
        .context("failed to load personal vault")?;

    println!("Registered user:");
    println!("  PID:            {}", user.pid);
    println!("  Name:           {}", user.name);
    if let Some(email) = &user.email {
        println!("  Email:          {}", email);
    }
    println!("  Personal vault: {}", vault.pid);

    Ok(())
}
