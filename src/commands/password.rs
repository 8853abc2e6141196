//! Hash a password for the `users` table of the site configuration

use anyhow::{bail, Result};

/// Cost used when none is given on the command line
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// bcrypt hash of `plaintext`
pub fn hash(plaintext: &str, cost: u32) -> Result<String> {
    if !(4..=31).contains(&cost) {
        bail!("bcrypt cost must be between 4 and 31, got {}", cost);
    }
    Ok(bcrypt::hash(plaintext, cost)?)
}

/// Print the hash as a ready-to-paste config line
pub fn run(plaintext: &str, cost: u32) -> Result<()> {
    let hashed = hash(plaintext, cost)?;
    println!("{}", hashed);
    tracing::debug!("Add it to site-config.yml as `users: {{ <name>: \"{}\" }}`", hashed);
    Ok(())
}
