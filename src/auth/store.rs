// Credential storage backed by cookie jars

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::types::{
    access_token_ttl, refresh_token_ttl, CredentialPair, StoredCookie, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};

/// Cookie-style storage for the credential pair
///
/// Expired entries must read as absent.
pub trait CredentialStore: Send + Sync {
    /// Read a cookie value
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Write a cookie with a lifetime, replacing any previous value
    fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete a cookie (no-op if absent)
    fn remove(&self, name: &str) -> Result<()>;

    fn access_token(&self) -> Result<Option<String>> {
        self.get(ACCESS_TOKEN_COOKIE)
    }

    fn refresh_token(&self) -> Result<Option<String>> {
        self.get(REFRESH_TOKEN_COOKIE)
    }

    /// Persist a freshly issued pair with the standard lifetimes
    fn store_pair(&self, pair: &CredentialPair) -> Result<()> {
        self.set(ACCESS_TOKEN_COOKIE, &pair.access_token, access_token_ttl())?;
        self.set(REFRESH_TOKEN_COOKIE, &pair.refresh_token, refresh_token_ttl())
    }

    /// Delete both credential cookies
    fn clear(&self) -> Result<()> {
        self.remove(ACCESS_TOKEN_COOKIE)?;
        self.remove(REFRESH_TOKEN_COOKIE)
    }
}

/// In-process cookie jar
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar pre-populated with a credential pair
    pub fn with_pair(pair: &CredentialPair) -> Result<Self> {
        let jar = Self::new();
        jar.store_pair(pair)?;
        Ok(jar)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredCookie>>> {
        self.cookies
            .lock()
            .map_err(|_| anyhow::anyhow!("Cookie jar lock poisoned"))
    }
}

impl CredentialStore for MemoryCookieJar {
    fn get(&self, name: &str) -> Result<Option<String>> {
        let mut cookies = self.lock()?;
        match cookies.get(name) {
            Some(cookie) if cookie.is_expired() => {
                cookies.remove(name);
                Ok(None)
            }
            Some(cookie) => Ok(Some(cookie.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<()> {
        self.lock()?
            .insert(name.to_string(), StoredCookie::new(value, ttl));
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.lock()?.remove(name);
        Ok(())
    }
}

/// Cookie jar persisted in a SQLite database
pub struct SqliteCookieJar {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteCookieJar {
    /// Open (or create) the jar at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cookie store directory: {}", parent.display())
                })?;
            }
        }

        let conn = rusqlite::Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;
        Self::init(conn)
    }

    /// Volatile jar, mainly for tests
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .context("Failed to open in-memory SQLite database")?;
        Self::init(conn)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cookies (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create cookies table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Cookie store lock poisoned"))
    }
}

impl CredentialStore for SqliteCookieJar {
    fn get(&self, name: &str) -> Result<Option<String>> {
        let conn = self.lock()?;

        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT value, expires_at FROM cookies WHERE name = ?",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to read cookie {}", name))?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if Utc::now() >= parse_datetime(&expires_at)? {
            conn.execute("DELETE FROM cookies WHERE name = ?", [name])
                .with_context(|| format!("Failed to purge expired cookie {}", name))?;
            return Ok(None);
        }

        Ok(Some(value))
    }

    fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = (Utc::now() + ttl).to_rfc3339();
        self.lock()?
            .execute(
                "INSERT INTO cookies (name, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                [name, value, expires_at.as_str()],
            )
            .with_context(|| format!("Failed to write cookie {}", name))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.lock()?
            .execute("DELETE FROM cookies WHERE name = ?", [name])
            .with_context(|| format!("Failed to delete cookie {}", name))?;
        Ok(())
    }
}

/// Parse an RFC 3339 timestamp, accepting a `Z` suffix
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Failed to parse datetime: {}", s))
}
