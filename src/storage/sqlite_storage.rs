use crate::{
    domain::{Board, BoardId, Card, CardId, Column, ColumnId, ColumnWithCards, NewCard},
    error::{KanbanError, Result},
    storage::{BoardRepository, CardRepository, ColumnRepository, Storage},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS boards (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS board_columns (
    id          TEXT PRIMARY KEY,
    board_id    TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id          TEXT PRIMARY KEY,
    board_id    TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    column_id   TEXT NOT NULL REFERENCES board_columns(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_board_columns_board ON board_columns(board_id, position);
CREATE INDEX IF NOT EXISTS idx_cards_column ON cards(column_id, position);
"#;

const COLUMN_FIELDS: &str = "id, board_id, name, position, created_at, updated_at";
const CARD_FIELDS: &str =
    "id, board_id, column_id, title, description, position, created_at, updated_at";

/// SQLite-backed storage.
///
/// A single connection is shared behind a mutex; every call runs on the
/// blocking thread pool so the async executor never waits on disk I/O.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and bootstraps the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        Self::from_connection(conn, path)
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| KanbanError::Storage("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| KanbanError::Storage(format!("storage task failed: {e}")))?
    }
}

struct BoardRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BoardRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    fn into_board(self) -> Result<Board> {
        Board::restore(self.id.into(), self.name, self.created_at, self.updated_at)
    }
}

struct ColumnRow {
    id: String,
    board_id: String,
    name: String,
    position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ColumnRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            board_id: row.get(1)?,
            name: row.get(2)?,
            position: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_column(self) -> Result<Column> {
        Column::restore(
            self.id.into(),
            self.board_id.into(),
            &self.name,
            self.position,
            self.created_at,
            self.updated_at,
        )
    }
}

struct CardRow {
    id: String,
    board_id: String,
    column_id: String,
    title: String,
    description: Option<String>,
    position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CardRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            board_id: row.get(1)?,
            column_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            position: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        Card::restore(
            self.id.into(),
            NewCard {
                board_id: self.board_id.into(),
                column_id: self.column_id.into(),
                title: self.title,
                description: self.description,
                position: self.position,
            },
            self.created_at,
            self.updated_at,
        )
    }
}

fn query_columns(conn: &Connection, board_id: &str) -> Result<Vec<Column>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMN_FIELDS} FROM board_columns WHERE board_id = ?1 ORDER BY position, created_at"
    ))?;
    let rows = stmt
        .query_map([board_id], ColumnRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ColumnRow::into_column).collect()
}

fn ensure_changed(changed: usize, resource: &'static str, id: &str) -> Result<()> {
    if changed == 0 {
        Err(KanbanError::not_found(resource, id))
    } else {
        Ok(())
    }
}

#[async_trait]
impl BoardRepository for SqliteStorage {
    async fn create_board(&self, board: &Board) -> Result<()> {
        let board = board.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO boards (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    board.id().as_str(),
                    board.name(),
                    board.created_at(),
                    board.updated_at()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_board(&self, id: &BoardId) -> Result<Option<Board>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, name, created_at, updated_at FROM boards WHERE id = ?1",
                [id.as_str()],
                BoardRow::read,
            )
            .optional()?
            .map(BoardRow::into_board)
            .transpose()
        })
        .await
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at, updated_at FROM boards ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], BoardRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(BoardRow::into_board).collect()
        })
        .await
    }

    async fn update_board(&self, board: &Board) -> Result<()> {
        let board = board.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE boards SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![board.name(), board.updated_at(), board.id().as_str()],
            )?;
            ensure_changed(changed, "Board", board.id().as_str())
        })
        .await
    }

    async fn delete_board(&self, id: &BoardId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM boards WHERE id = ?1", [id.as_str()])?;
            ensure_changed(changed, "Board", id.as_str())
        })
        .await
    }
}

#[async_trait]
impl ColumnRepository for SqliteStorage {
    async fn create_column(&self, column: &Column) -> Result<()> {
        let column = column.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!("INSERT INTO board_columns ({COLUMN_FIELDS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    column.id().as_str(),
                    column.board_id().as_str(),
                    column.name(),
                    column.position(),
                    column.created_at(),
                    column.updated_at()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_column(&self, id: &ColumnId) -> Result<Option<Column>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMN_FIELDS} FROM board_columns WHERE id = ?1"),
                [id.as_str()],
                ColumnRow::read,
            )
            .optional()?
            .map(ColumnRow::into_column)
            .transpose()
        })
        .await
    }

    async fn list_columns(&self, board_id: &BoardId) -> Result<Vec<Column>> {
        let board_id = board_id.clone();
        self.with_conn(move |conn| query_columns(conn, board_id.as_str()))
            .await
    }

    async fn list_columns_with_cards(&self, board_id: &BoardId) -> Result<Vec<ColumnWithCards>> {
        let board_id = board_id.clone();
        self.with_conn(move |conn| {
            let columns = query_columns(conn, board_id.as_str())?;

            let mut stmt = conn.prepare(
                "SELECT c.id, c.board_id, c.column_id, c.title, c.description, c.position, \
                        c.created_at, c.updated_at \
                 FROM cards c JOIN board_columns col ON col.id = c.column_id \
                 WHERE col.board_id = ?1 \
                 ORDER BY c.position, c.created_at",
            )?;
            let rows = stmt
                .query_map([board_id.as_str()], CardRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut by_column: HashMap<ColumnId, Vec<Card>> = HashMap::new();
            for row in rows {
                let card = row.into_card()?;
                by_column.entry(card.column_id().clone()).or_default().push(card);
            }

            Ok(columns
                .into_iter()
                .map(|column| {
                    let cards = by_column.remove(column.id()).unwrap_or_default();
                    ColumnWithCards::new(column, cards)
                })
                .collect())
        })
        .await
    }

    async fn update_column(&self, column: &Column) -> Result<()> {
        let column = column.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE board_columns SET name = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    column.name(),
                    column.position(),
                    column.updated_at(),
                    column.id().as_str()
                ],
            )?;
            ensure_changed(changed, "Column", column.id().as_str())
        })
        .await
    }

    async fn update_columns(&self, columns: &[Column]) -> Result<()> {
        let columns = columns.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "UPDATE board_columns SET position = ?1, updated_at = ?2 WHERE id = ?3",
                )?;
                for column in &columns {
                    let changed = stmt.execute(params![
                        column.position(),
                        column.updated_at(),
                        column.id().as_str()
                    ])?;
                    ensure_changed(changed, "Column", column.id().as_str())?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM board_columns WHERE id = ?1", [id.as_str()])?;
            ensure_changed(changed, "Column", id.as_str())
        })
        .await
    }
}

#[async_trait]
impl CardRepository for SqliteStorage {
    async fn create_card(&self, card: &Card) -> Result<()> {
        let card = card.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!("INSERT INTO cards ({CARD_FIELDS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    card.id().as_str(),
                    card.board_id().as_str(),
                    card.column_id().as_str(),
                    card.title(),
                    card.description(),
                    card.position(),
                    card.created_at(),
                    card.updated_at()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_card(&self, id: &CardId) -> Result<Option<Card>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {CARD_FIELDS} FROM cards WHERE id = ?1"),
                [id.as_str()],
                CardRow::read,
            )
            .optional()?
            .map(CardRow::into_card)
            .transpose()
        })
        .await
    }

    async fn list_cards(&self, column_id: &ColumnId) -> Result<Vec<Card>> {
        let column_id = column_id.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CARD_FIELDS} FROM cards WHERE column_id = ?1 ORDER BY position, created_at"
            ))?;
            let rows = stmt
                .query_map([column_id.as_str()], CardRow::read)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(CardRow::into_card).collect()
        })
        .await
    }

    async fn update_card(&self, card: &Card) -> Result<()> {
        let card = card.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE cards SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    card.title(),
                    card.description(),
                    card.updated_at(),
                    card.id().as_str()
                ],
            )?;
            ensure_changed(changed, "Card", card.id().as_str())
        })
        .await
    }

    async fn update_cards(&self, cards: &[Card]) -> Result<()> {
        let cards = cards.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "UPDATE cards SET column_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
                )?;
                for card in &cards {
                    let changed = stmt.execute(params![
                        card.column_id().as_str(),
                        card.position(),
                        card.updated_at(),
                        card.id().as_str()
                    ])?;
                    ensure_changed(changed, "Card", card.id().as_str())?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_card(&self, id: &CardId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM cards WHERE id = ?1", [id.as_str()])?;
            ensure_changed(changed, "Card", id.as_str())
        })
        .await
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
