//! Host file store
//!
//! Owns the generated DNS-redirect text files, one per host name, in a
//! flat directory. File names are the lowercased host name plus `.txt`;
//! every operation goes through the same canonicalization, so existence
//! checks are case-insensitive regardless of how the name was typed.
//! Artifact existence — not registry membership — is the authoritative
//! answer to "does this host exist".

use crate::errors::BotError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Redirect targets written for every host, one line per target.
/// The last entry is the literal signature line.
const HOST_TARGETS: [&str; 5] = [
    "www.growtopia1.com",
    "www.growtopia2.com",
    "growtopia1.com",
    "growtopia2.com",
    "YoruAkio",
];

static HOST_NAME_RE: OnceLock<Regex> = OnceLock::new();
static HOST_ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

/// Whether `name` is an acceptable host name (alphanumeric and `-`).
pub fn valid_host_name(name: &str) -> bool {
    HOST_NAME_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid host name pattern"))
        .is_match(name)
}

/// Whether `address` is an acceptable host address (alphanumeric and `.`).
pub fn valid_host_address(address: &str) -> bool {
    HOST_ADDRESS_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9.]+$").expect("Invalid host address pattern"))
        .is_match(address)
}

/// Render the file content for `address`: the address paired with each
/// redirect target, newline separated. Fixed template, no configuration.
pub fn generate_host_data(address: &str) -> String {
    HOST_TARGETS
        .iter()
        .map(|target| format!("{} {}", address, target))
        .collect::<Vec<_>>()
        .join("\n")
}

/// File name for a host, canonicalized to lowercase.
pub fn canonical_file_name(name: &str) -> String {
    format!("{}.txt", name.to_lowercase())
}

/// Flat directory of host files.
#[derive(Debug, Clone)]
pub struct HostStore {
    dir: PathBuf,
}

impl HostStore {
    /// Open the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, BotError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory the files live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk path for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(canonical_file_name(name))
    }

    /// Whether a file exists for `name` (case-insensitive).
    pub async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.path_for(name))
            .await
            .unwrap_or(false)
    }

    /// Write the generated content for `name`, overwriting any previous file.
    pub async fn write(&self, name: &str, address: &str) -> Result<(), BotError> {
        let content = generate_host_data(address);
        tokio::fs::write(self.path_for(name), content).await?;
        Ok(())
    }

    /// Read the content for `name`, or `None` when the file is missing.
    pub async fn read(&self, name: &str) -> Result<Option<String>, BotError> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the file for `name`.
    pub async fn remove(&self, name: &str) -> Result<(), BotError> {
        tokio::fs::remove_file(self.path_for(name)).await?;
        Ok(())
    }
}
