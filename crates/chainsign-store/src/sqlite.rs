//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Chainsign. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use chainsign_core::{
    check_signature, resolve_root, ChainView, Cid, DocumentHash, EntryId, Identity, JournalEntry,
    JournalEvent, SignOutcome, SignRequest, Signatory,
};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{InsertResult, Store, StoreSnapshot};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Each mutation runs in its own
/// transaction while holding the mutex, so mutations are serialized.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened sqlite ledger");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the locked connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Read-only view over a connection or an open transaction.
struct SqliteView<'a> {
    conn: &'a Connection,
}

impl ChainView for SqliteView<'_> {
    type Error = rusqlite::Error;

    fn is_registered(&self, identity: &Identity) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM signatories WHERE identity = ?1)",
            params![identity.0.as_slice()],
            |row| row.get(0),
        )
    }

    fn link(&self, hash: &DocumentHash) -> rusqlite::Result<Option<DocumentHash>> {
        self.conn
            .query_row(
                "SELECT parent FROM links WHERE child = ?1",
                params![hash.0.as_slice()],
                |row| blob_array(row, 0, "parent").map(DocumentHash),
            )
            .optional()
    }

    fn has_endorsed(&self, root: &DocumentHash, signer: &Identity) -> rusqlite::Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM endorsements WHERE root = ?1 AND signer = ?2)",
            params![root.0.as_slice(), signer.0.as_slice()],
            |row| row.get(0),
        )
    }
}

// Helper to read a fixed-width blob column
fn blob_array<const N: usize>(
    row: &rusqlite::Row<'_>,
    index: usize,
    column: &str,
) -> rusqlite::Result<[u8; N]> {
    let bytes: Vec<u8> = row.get(index)?;
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(index, column.into(), Type::Blob))
}

fn read_journal_head(conn: &Connection) -> Result<Option<JournalEntry>> {
    let row: Option<(i64, [u8; 32], Vec<u8>)> = conn
        .query_row(
            "SELECT seq, entry_id, content FROM journal ORDER BY seq DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, blob_array(row, 1, "entry_id")?, row.get(2)?)),
        )
        .optional()?;

    row.map(|(seq, id, content)| decode_entry(seq, id, &content))
        .transpose()
}

fn decode_entry(seq: i64, id: [u8; 32], content: &[u8]) -> Result<JournalEntry> {
    let entry = JournalEntry::from_parts(content, EntryId::from_bytes(id))?;
    if entry.seq as i64 != seq {
        return Err(StoreError::InvalidData(format!(
            "journal row {} holds entry with seq {}",
            seq, entry.seq
        )));
    }
    Ok(entry)
}

fn read_journal_since(conn: &Connection, after_seq: u64) -> Result<Vec<JournalEntry>> {
    let mut stmt =
        conn.prepare("SELECT seq, entry_id, content FROM journal WHERE seq > ?1 ORDER BY seq")?;

    let rows = stmt
        .query_map(params![after_seq as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                blob_array::<32>(row, 1, "entry_id")?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(seq, id, content)| decode_entry(seq, id, &content))
        .collect()
}

/// Append the entry that follows the current head, inside `conn`'s
/// transaction.
fn append_journal(conn: &Connection, event: JournalEvent) -> Result<JournalEntry> {
    let head = read_journal_head(conn)?;
    let entry = JournalEntry::next(head.as_ref(), event)?;
    let content = entry.content_bytes()?;

    conn.execute(
        "INSERT INTO journal (seq, entry_id, content, recorded_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.seq as i64,
            entry.id.0.as_slice(),
            content,
            now_millis()
        ],
    )?;

    Ok(entry)
}

#[async_trait]
impl Store for SqliteStore {
    async fn register_signatory(&self, signatory: &Signatory) -> Result<InsertResult> {
        let signatory = signatory.clone();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let view = SqliteView { conn: &tx };
            if view.is_registered(&signatory.identity)? {
                return Ok(InsertResult::AlreadyExists);
            }

            tx.execute(
                "INSERT INTO signatories (identity, cid, registered_at) VALUES (?1, ?2, ?3)",
                params![
                    signatory.identity.0.as_slice(),
                    signatory.cid.as_bytes(),
                    now_millis()
                ],
            )?;
            append_journal(&tx, JournalEvent::Registered(signatory))?;

            tx.commit()?;
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_signatory(&self, identity: &Identity) -> Result<Option<Signatory>> {
        let identity = *identity;

        self.with_conn(move |conn| {
            let cid: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT cid FROM signatories WHERE identity = ?1",
                    params![identity.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            match cid {
                Some(bytes) => {
                    let cid =
                        Cid::new(bytes).map_err(|e| StoreError::InvalidData(e.to_string()))?;
                    Ok(Some(Signatory { identity, cid }))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn count_signatories(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM signatories", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn get_link(&self, hash: &DocumentHash) -> Result<Option<DocumentHash>> {
        let hash = *hash;
        self.with_conn(move |conn| Ok(SqliteView { conn: &*conn }.link(&hash)?))
            .await
    }

    async fn resolve_root(&self, hash: &DocumentHash) -> Result<DocumentHash> {
        let hash = *hash;
        self.with_conn(move |conn| Ok(resolve_root(&SqliteView { conn: &*conn }, &hash)?))
            .await
    }

    async fn endorsers_of(&self, hash: &DocumentHash) -> Result<Vec<Identity>> {
        let hash = *hash;

        self.with_conn(move |conn| {
            let root = resolve_root(&SqliteView { conn: &*conn }, &hash)?;

            let mut stmt = conn.prepare(
                "SELECT signer FROM endorsements WHERE root = ?1 ORDER BY position",
            )?;
            let signers = stmt
                .query_map(params![root.0.as_slice()], |row| {
                    blob_array(row, 0, "signer").map(Identity)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(signers)
        })
        .await
    }

    async fn apply_signature(&self, request: &SignRequest) -> Result<SignOutcome> {
        let request = *request;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let outcome = check_signature(&SqliteView { conn: &tx }, &request)?;
            let SignOutcome::Accepted(endorsement) = outcome else {
                // dropping tx rolls back; nothing was written
                return Ok(outcome);
            };

            let now = now_millis();
            tx.execute(
                "INSERT INTO links (child, parent, linked_at) VALUES (?1, ?2, ?3)",
                params![
                    endorsement.child.0.as_slice(),
                    endorsement.root.0.as_slice(),
                    now
                ],
            )?;

            let position: i64 = tx.query_row(
                "SELECT COUNT(*) FROM endorsements WHERE root = ?1",
                params![endorsement.root.0.as_slice()],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO endorsements (root, position, signer, child) VALUES (?1, ?2, ?3, ?4)",
                params![
                    endorsement.root.0.as_slice(),
                    position,
                    endorsement.signer.0.as_slice(),
                    endorsement.child.0.as_slice()
                ],
            )?;

            append_journal(&tx, JournalEvent::Signed(endorsement))?;

            tx.commit()?;
            Ok(SignOutcome::Accepted(endorsement))
        })
        .await
    }

    async fn journal_head(&self) -> Result<Option<JournalEntry>> {
        self.with_conn(|conn| read_journal_head(conn)).await
    }

    async fn journal_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>> {
        self.with_conn(move |conn| read_journal_since(conn, after_seq))
            .await
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        self.with_conn(|conn| {
            // one read transaction: every table as of the same commit
            let tx = conn.transaction()?;
            let journal = read_journal_since(&tx, 0)?;

            let mut stmt = tx.prepare("SELECT identity, cid FROM signatories")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        blob_array::<20>(row, 0, "identity")?,
                        row.get::<_, Vec<u8>>(1)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let signatories = rows
                .into_iter()
                .map(|(identity, cid)| -> Result<Signatory> {
                    let cid = Cid::new(cid).map_err(|e| StoreError::InvalidData(e.to_string()))?;
                    Ok(Signatory::new(Identity(identity), cid))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut stmt = tx.prepare("SELECT child, parent FROM links")?;
            let links = stmt
                .query_map([], |row| {
                    Ok((
                        DocumentHash(blob_array(row, 0, "child")?),
                        DocumentHash(blob_array(row, 1, "parent")?),
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut stmt =
                tx.prepare("SELECT root, signer FROM endorsements ORDER BY root, position")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        DocumentHash(blob_array(row, 0, "root")?),
                        Identity(blob_array(row, 1, "signer")?),
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut endorsements: Vec<(DocumentHash, Vec<Identity>)> = Vec::new();
            for (root, signer) in rows {
                if let Some((current, signers)) = endorsements.last_mut() {
                    if *current == root {
                        signers.push(signer);
                        continue;
                    }
                }
                endorsements.push((root, vec![signer]));
            }

            Ok(StoreSnapshot {
                journal,
                signatories,
                links,
                endorsements,
            })
        })
        .await
    }
}
