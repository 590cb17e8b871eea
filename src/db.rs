use crate::models::{Locale, NewLocale, NewTranslation, Translation};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Persists locale rows keyed by code.
pub trait LocaleStore: Send + Sync {
    /// Fetch the locale with `new.code`, inserting it first if missing.
    ///
    /// Returns (locale, created) where `created` is true only if this call
    /// inserted the row.
    fn get_or_create_locale(&self, new: &NewLocale<'_>) -> Result<(Locale, bool)>;
}

/// Persists translation rows.
///
/// Root translations are unique per (locale, text); derived translations are
/// unique per (locale, parent).
pub trait TranslationStore: Send + Sync {
    /// Fetch the translation matching `new`'s natural key, inserting it first if
    /// missing. Returns (translation, created).
    fn get_or_create_translation(&self, new: &NewTranslation<'_>) -> Result<(Translation, bool)>;

    /// Find the rendering of `parent_id` in `locale_id`
    fn find_by_locale_and_parent(&self, locale_id: i64, parent_id: i64)
        -> Result<Option<Translation>>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS locales (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS translations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        locale_id INTEGER NOT NULL REFERENCES locales(id),
        translation_id INTEGER REFERENCES translations(id),
        translation TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_translations_root
        ON translations(locale_id, translation)
        WHERE translation_id IS NULL;

    CREATE UNIQUE INDEX IF NOT EXISTS idx_translations_derived
        ON translations(locale_id, translation_id)
        WHERE translation_id IS NOT NULL;
";

const TRANSLATION_COLUMNS: &str = "id, locale_id, translation, translation_id, created_at";

/// SQLite-backed locale and translation store
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at the given path and create tables
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .context(format!("Failed to open database at {}", database_path))?;

        let db = Self::init(conn)?;
        info!("Translation database opened at {}", database_path);
        Ok(db)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Other processes may share the file; wait out their write locks
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create translation tables")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Look up a locale by code without creating it
    pub fn find_locale(&self, code: &str) -> Result<Option<Locale>> {
        let conn = self.conn()?;
        Self::select_locale(&conn, code)
    }

    /// All translations stored under a locale, oldest first
    pub fn translations_for(&self, locale_id: i64) -> Result<Vec<Translation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM translations WHERE locale_id = ?1 ORDER BY id",
            TRANSLATION_COLUMNS
        ))?;

        let translations = stmt
            .query_map(params![locale_id], translation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(translations)
    }

    /// Get count of locale rows
    pub fn locale_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM locales", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get count of translation rows
    pub fn translation_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn select_locale(conn: &Connection, code: &str) -> Result<Option<Locale>> {
        let locale = conn
            .query_row(
                "SELECT id, code, name, created_at FROM locales WHERE code = ?1",
                params![code],
                |row| {
                    Ok(Locale {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("Failed to query locale")?;

        Ok(locale)
    }

    fn select_translation(conn: &Connection, new: &NewTranslation<'_>) -> Result<Option<Translation>> {
        let translation = match new.parent_id {
            Some(parent_id) => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM translations WHERE locale_id = ?1 AND translation_id = ?2",
                        TRANSLATION_COLUMNS
                    ),
                    params![new.locale_id, parent_id],
                    translation_from_row,
                )
                .optional(),
            None => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM translations
                         WHERE locale_id = ?1 AND translation_id IS NULL AND translation = ?2",
                        TRANSLATION_COLUMNS
                    ),
                    params![new.locale_id, new.text],
                    translation_from_row,
                )
                .optional(),
        }
        .context("Failed to query translation")?;

        Ok(translation)
    }
}

impl LocaleStore for Database {
    fn get_or_create_locale(&self, new: &NewLocale<'_>) -> Result<(Locale, bool)> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        // Concurrent creators race on the UNIQUE(code) constraint; losers insert nothing
        let inserted = conn
            .execute(
                "INSERT INTO locales (code, name, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                params![new.code, new.name, now],
            )
            .context("Failed to insert locale")?;

        let locale = Self::select_locale(&conn, new.code)?
            .with_context(|| format!("Locale '{}' missing after insert", new.code))?;

        if inserted > 0 {
            info!("Created locale {} ({})", locale.code, locale.name);
        }
        Ok((locale, inserted > 0))
    }
}

impl TranslationStore for Database {
    fn get_or_create_translation(&self, new: &NewTranslation<'_>) -> Result<(Translation, bool)> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let inserted = conn
            .execute(
                "INSERT INTO translations (locale_id, translation_id, translation, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT DO NOTHING",
                params![new.locale_id, new.parent_id, new.text, now],
            )
            .context("Failed to insert translation")?;

        let translation = Self::select_translation(&conn, new)?
            .context("Translation missing after insert")?;

        if inserted > 0 {
            debug!(
                id = translation.id,
                locale_id = translation.locale_id,
                parent_id = ?translation.parent_id,
                "Created translation"
            );
        }
        Ok((translation, inserted > 0))
    }

    fn find_by_locale_and_parent(
        &self,
        locale_id: i64,
        parent_id: i64,
    ) -> Result<Option<Translation>> {
        let conn = self.conn()?;
        Self::select_translation(
            &conn,
            &NewTranslation {
                locale_id,
                parent_id: Some(parent_id),
                text: "",
            },
        )
    }
}

fn translation_from_row(row: &Row<'_>) -> rusqlite::Result<Translation> {
    Ok(Translation {
        id: row.get(0)?,
        locale_id: row.get(1)?,
        text: row.get(2)?,
        parent_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}
