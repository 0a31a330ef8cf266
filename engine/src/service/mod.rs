//! Host registry service
//!
//! Pure logic over the user registry document and the host file store:
//! existence checks, pagination, host creation and removal, and the
//! consistency rules tying them together. A host name may exist at most
//! once globally (artifact existence is the authoritative check) and at
//! most once on any one user's list.

use crate::db::{registry, DocumentStore, Registry, UserRecord};
use crate::errors::BotError;
use crate::hosts::HostStore;
use std::path::Path;
use tracing::{debug, info};

/// Registry service over the persisted documents.
pub struct HostService {
    users: DocumentStore<Registry>,
    artifacts: HostStore,
}

impl HostService {
    /// Open the service over the registry document and host directory.
    pub async fn open(
        users_path: impl Into<std::path::PathBuf>,
        hosts_dir: impl Into<std::path::PathBuf>,
    ) -> Result<Self, BotError> {
        Ok(Self {
            users: DocumentStore::open(users_path).await?,
            artifacts: HostStore::open(hosts_dir).await?,
        })
    }

    /// Directory of the generated host files, for the static publisher.
    pub fn hosts_dir(&self) -> &Path {
        self.artifacts.dir()
    }

    /// Whether a user record exists for `username`.
    pub async fn user_exists(&self, username: &str) -> bool {
        self.users.read(|users| users.contains_key(username)).await
    }

    /// Create a user record with an empty host list if absent. Idempotent.
    ///
    /// Returns true when a new record was created.
    pub async fn ensure_user(&self, username: &str, chat_id: i64) -> Result<bool, BotError> {
        let created = self
            .users
            .mutate(|users| {
                if users.contains_key(username) {
                    false
                } else {
                    users.insert(username.to_string(), UserRecord::new(chat_id));
                    true
                }
            })
            .await?;

        if created {
            info!("Registered user {} (chat {})", username, chat_id);
        }

        Ok(created)
    }

    /// Whether a host artifact exists for `name`, case-insensitive.
    ///
    /// This is the authoritative global-uniqueness check; it holds even
    /// when no registry entry references the artifact.
    pub async fn host_exists(&self, name: &str) -> bool {
        self.artifacts.exists(name).await
    }

    /// Whether `username` owns `name` (case-sensitive list membership).
    /// Fails closed for unknown users.
    pub async fn user_owns_host(&self, username: &str, name: &str) -> bool {
        self.users
            .read(|users| {
                users
                    .get(username)
                    .map(|record| record.host_list.iter().any(|h| h == name))
                    .unwrap_or(false)
            })
            .await
    }

    /// Number of host-list pages for `username`, zero for unknown users.
    pub async fn total_pages(&self, username: &str) -> usize {
        self.users
            .read(|users| {
                users
                    .get(username)
                    .map(|record| registry::total_pages(&record.host_list))
                    .unwrap_or(0)
            })
            .await
    }

    /// The hosts on zero-based `page` of `username`'s list.
    /// Out-of-range pages and unknown users yield an empty list.
    pub async fn hosts_page(&self, username: &str, page: usize) -> Vec<String> {
        self.users
            .read(|users| {
                users
                    .get(username)
                    .map(|record| registry::page(&record.host_list, page).to_vec())
                    .unwrap_or_default()
            })
            .await
    }

    /// Create a host for `username`.
    ///
    /// Guards: the artifact must not exist anywhere, and the name must not
    /// already be on the user's list. The artifact is written before the
    /// registry so a failure can never leave a registry entry pointing at
    /// a missing file.
    pub async fn create_host(
        &self,
        username: &str,
        name: &str,
        address: &str,
    ) -> Result<(), BotError> {
        if self.host_exists(name).await {
            return Err(BotError::HostAlreadyExists(name.to_string()));
        }
        if self.user_owns_host(username, name).await {
            return Err(BotError::AlreadyOnUserList(name.to_string()));
        }

        self.artifacts.write(name, address).await?;

        self.users
            .mutate(|users| {
                users
                    .entry(username.to_string())
                    .or_default()
                    .host_list
                    .push(name.to_string());
            })
            .await?;

        info!("Created host {} for {}", name, username);
        Ok(())
    }

    /// Remove a host.
    ///
    /// Fails with `HostNotFound` when the artifact is absent. The name is
    /// filtered out of the user's list with a case-sensitive match, and
    /// the artifact is deleted even when the list never referenced it —
    /// artifact existence, not list membership, is authoritative, so an
    /// orphaned file from a stale flow is cleaned up here.
    pub async fn remove_host(&self, username: &str, name: &str) -> Result<(), BotError> {
        if !self.host_exists(name).await {
            return Err(BotError::HostNotFound(name.to_string()));
        }

        let owned = self
            .users
            .mutate(|users| match users.get_mut(username) {
                Some(record) => {
                    let before = record.host_list.len();
                    record.host_list.retain(|h| h != name);
                    record.host_list.len() != before
                }
                None => false,
            })
            .await?;

        if !owned {
            debug!("Removing orphaned host artifact {}", name);
        }

        self.artifacts.remove(name).await?;

        info!("Removed host {} for {}", name, username);
        Ok(())
    }
}
