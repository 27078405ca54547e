use std::{fs, path::Path, thread};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::KeyValueStore;

const SCHEMA_VERSION: i32 = 1;

const CREATE_ENTRIES: &str = "
    CREATE TABLE IF NOT EXISTS kv_entries (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    PRAGMA user_version = 1;
";

type Reply<T> = oneshot::Sender<Result<T>>;

enum Request {
    Get { key: String, reply: Reply<Option<String>> },
    Set { key: String, value: String, reply: Reply<()> },
    Remove { key: String, reply: Reply<()> },
}

/// SQLite-backed [`KeyValueStore`]. One thread owns the connection and
/// serves requests in order; it exits once every handle is dropped.
#[derive(Clone)]
pub struct SqliteStore {
    requests: mpsc::UnboundedSender<Request>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open SQLite store at {}", path.display()))?;
        prepare(&conn)?;

        let (requests, mut inbox) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("autoapply-store".into())
            .spawn(move || {
                while let Some(request) = inbox.blocking_recv() {
                    serve(&conn, request);
                }
                debug!("Store thread exiting");
            })
            .context("failed to spawn store thread")?;

        info!("Store opened at {}", path.display());
        Ok(Self { requests })
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(build(reply))
            .map_err(|_| anyhow!("store thread is no longer running"))?;
        response
            .await
            .map_err(|_| anyhow!("store thread dropped the request"))?
    }
}

/// Creates the entries table on a fresh file and refuses files written by a
/// newer schema.
fn prepare(conn: &Connection) -> Result<()> {
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Failed to enable WAL mode: {err}");
    }

    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read store schema version")?;
    match version {
        0 => conn
            .execute_batch(CREATE_ENTRIES)
            .context("failed to create kv_entries")?,
        SCHEMA_VERSION => {}
        newer => bail!("store schema version {newer} is newer than supported ({SCHEMA_VERSION})"),
    }
    Ok(())
}

fn serve(conn: &Connection, request: Request) {
    let delivered = match request {
        Request::Get { key, reply } => reply.send(read(conn, &key)).is_ok(),
        Request::Set { key, value, reply } => reply.send(write(conn, &key, &value)).is_ok(),
        Request::Remove { key, reply } => reply
            .send(
                conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                    .map(|_| ())
                    .with_context(|| format!("failed to remove key '{key}'")),
            )
            .is_ok(),
    };
    if !delivered {
        debug!("Store caller went away before its reply");
    }
}

fn read(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_entries WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read key '{key}'"))
}

fn write(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write key '{key}'"))?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw = self
            .request(|reply| Request::Get {
                key: key.to_string(),
                reply,
            })
            .await?;
        raw.map(|text| {
            serde_json::from_str(&text)
                .with_context(|| format!("stored value for '{key}' is not valid JSON"))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let value = serde_json::to_string(&value)?;
        self.request(|reply| Request::Set {
            key: key.to_string(),
            value,
            reply,
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.request(|reply| Request::Remove {
            key: key.to_string(),
            reply,
        })
        .await
    }
}
