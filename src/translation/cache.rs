/*!
 * Translation caching.
 *
 * Two layers: a process-local map consulted first, and an optional SQLite
 * database that survives across jobs. Entries are keyed by a SHA-256 digest
 * of the source text, language pair and model, so a model change never
 * serves stale translations.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::RwLock;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

const DEFAULT_DB_FILENAME: &str = "translations.db";
const DEFAULT_DB_DIRNAME: &str = "pdflate";

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS translations (
            key TEXT PRIMARY KEY,
            source_text TEXT NOT NULL,
            translation TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            model TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("Failed to initialize cache schema")?;
    Ok(())
}

fn cache_key(text: &str, source: &str, target: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0]);
    hasher.update(source.as_bytes());
    hasher.update([0]);
    hasher.update(target.as_bytes());
    hasher.update([0]);
    hasher.update(model.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persistent SQLite layer. All queries run through `spawn_blocking`; the
/// connection itself is not async.
struct PersistentCache {
    connection: Arc<Mutex<Connection>>,
}

impl PersistentCache {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
        }
        info!("Opening translation cache at: {:?}", path);
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache database: {:?}", path))?;
        initialize_schema(&conn)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory cache")?;
        initialize_schema(&conn)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    async fn get(&self, key: String) -> Result<Option<String>> {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|e| anyhow::anyhow!("Cache lock poisoned: {}", e))?;
            conn.query_row(
                "SELECT translation FROM translations WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Cache lookup failed")
        })
        .await
        .context("Cache lookup task failed")?
    }

    async fn put(
        &self,
        key: String,
        source_text: String,
        translation: String,
        source_language: String,
        target_language: String,
        model: String,
    ) -> Result<()> {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let conn = connection
                .lock()
                .map_err(|e| anyhow::anyhow!("Cache lock poisoned: {}", e))?;
            conn.execute(
                "INSERT OR REPLACE INTO translations
                 (key, source_text, translation, source_language, target_language, model)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![key, source_text, translation, source_language, target_language, model],
            )
            .context("Cache insert failed")?;
            Ok(())
        })
        .await
        .context("Cache insert task failed")?
    }
}

/// Two-tier translation cache.
pub struct TranslationCache {
    memory: RwLock<HashMap<String, String>>,
    persistent: Option<PersistentCache>,
    enabled: bool,
}

impl TranslationCache {
    /// Open the cache at a path, or the per-user default location.
    pub fn open(enabled: bool, path: Option<&Path>) -> Result<Self> {
        let persistent = if enabled {
            let db_path = match path {
                Some(p) => p.to_path_buf(),
                None => Self::default_database_path()?,
            };
            Some(PersistentCache::open(db_path)?)
        } else {
            None
        };
        Ok(Self {
            memory: RwLock::new(HashMap::new()),
            persistent,
            enabled,
        })
    }

    /// In-memory only cache, for tests and one-shot jobs.
    pub fn in_memory(enabled: bool) -> Result<Self> {
        let persistent = if enabled {
            Some(PersistentCache::open_in_memory()?)
        } else {
            None
        };
        Ok(Self {
            memory: RwLock::new(HashMap::new()),
            persistent,
            enabled,
        })
    }

    /// Cache disabled entirely.
    pub fn disabled() -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            persistent: None,
            enabled: false,
        }
    }

    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::cache_dir()
            .or_else(dirs::data_local_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?;
        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Look up a translation.
    pub async fn get(
        &self,
        text: &str,
        source: &str,
        target: &str,
        model: &str,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let key = cache_key(text, source, target, model);
        if let Some(hit) = self.memory.read().get(&key).cloned() {
            debug!("Cache hit (memory) for {} -> {}", source, target);
            return Some(hit);
        }
        if let Some(persistent) = &self.persistent {
            match persistent.get(key.clone()).await {
                Ok(Some(hit)) => {
                    debug!("Cache hit (sqlite) for {} -> {}", source, target);
                    self.memory.write().insert(key, hit.clone());
                    return Some(hit);
                }
                Ok(None) => {}
                Err(e) => debug!("Cache lookup error: {}", e),
            }
        }
        None
    }

    /// Store a translation in both layers. Persistence errors are logged and
    /// swallowed; a broken cache never fails a job.
    pub async fn put(&self, text: &str, source: &str, target: &str, model: &str, translation: &str) {
        if !self.enabled {
            return;
        }
        let key = cache_key(text, source, target, model);
        self.memory
            .write()
            .insert(key.clone(), translation.to_string());
        if let Some(persistent) = &self.persistent {
            if let Err(e) = persistent
                .put(
                    key,
                    text.to_string(),
                    translation.to_string(),
                    source.to_string(),
                    target.to_string(),
                    model.to_string(),
                )
                .await
            {
                debug!("Cache insert error: {}", e);
            }
        }
    }
}
