//! Process environment access with `.env` seeding.

use std::env;
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Default `.env` location; only an explicitly given path has to exist.
pub const DEFAULT_ENV_FILE: &str = "./.env";

/// Seed the process environment from `path`. Variables already present in
/// the environment win over the file.
pub fn load(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(dotenvy::Error::Io(err))
            if err.kind() == ErrorKind::NotFound && path == Path::new(DEFAULT_ENV_FILE) =>
        {
            Ok(())
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed to read environment file {}", path.display())),
    }
}

/// Required variable; missing is a configuration error.
pub fn require(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} not set"))
}

#[must_use]
pub fn get(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Optional typed variable falling back to `default`.
pub fn get_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Ok(parsed),
            Err(err) => bail!("couldn't parse environ: {key}={val} ({err})"),
        },
        Err(_) => Ok(default),
    }
}
