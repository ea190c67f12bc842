use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use serde::de::DeserializeOwned;

use crate::app::{OmniError, Result};
use crate::domain::{Category, CategoryFlags, Chapter, HistoryEntry, SourceRecord, Title};
use crate::query::{ChangeNotifier, Collection};
use crate::store::{PurgeReport, Store, WriteBatch};

const TITLE_COLUMNS: &str = "id, source_id, remote_id, url, title, author, artist, description, \
     genres, status, cover_url, favorite, in_library, categories, unread_count, added_at, \
     last_fetched_at, last_read_at";

const CHAPTER_COLUMNS: &str = "id, manga_id, source_id, remote_id, url, name, chapter_number, \
     volume_number, scanlator, read, bookmark, last_page_read, pages_count, uploaded_at, fetched_at";

const HISTORY_COLUMNS: &str = "id, manga_id, chapter_id, last_read_at, pages_read";

const CATEGORY_COLUMNS: &str =
    "id, name, sort_order, download_new_chapters, include_in_update, include_in_global_update";

const SOURCE_COLUMNS: &str = "id, name, lang, version, icon, supports_search, supports_popular, \
     supports_latest, enabled, installed_at";

const IN_CATEGORY: &str =
    "EXISTS (SELECT 1 FROM json_each(titles.categories) WHERE json_each.value = ?1)";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: ChangeNotifier,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            changes: ChangeNotifier::default(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-default-categories/up.sql")),
        ]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            OmniError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    /// Fixed-width so that text order matches time order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

fn opt_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| SqliteStore::parse_datetime(&s)))
}

fn datetime_or_now(row: &Row<'_>, idx: usize) -> DateTime<Utc> {
    row.get::<_, String>(idx)
        .ok()
        .and_then(|s| SqliteStore::parse_datetime(&s))
        .unwrap_or_else(Utc::now)
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn title_from_row(row: &Row<'_>) -> rusqlite::Result<Title> {
    Ok(Title {
        id: row.get(0)?,
        source_id: row.get(1)?,
        remote_id: row.get(2)?,
        url: row.get(3)?,
        title: row.get(4)?,
        author: row.get(5)?,
        artist: row.get(6)?,
        description: row.get(7)?,
        genres: json_column(row, 8)?,
        status: row.get::<_, String>(9)?.parse().unwrap_or_default(),
        cover_url: row.get(10)?,
        favorite: row.get(11)?,
        in_library: row.get(12)?,
        categories: json_column(row, 13)?,
        unread_count: row.get(14)?,
        added_at: opt_datetime(row, 15)?,
        last_fetched_at: opt_datetime(row, 16)?,
        last_read_at: opt_datetime(row, 17)?,
    })
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        manga_id: row.get(1)?,
        source_id: row.get(2)?,
        remote_id: row.get(3)?,
        url: row.get(4)?,
        name: row.get(5)?,
        chapter_number: row.get(6)?,
        volume_number: row.get(7)?,
        scanlator: row.get(8)?,
        read: row.get(9)?,
        bookmark: row.get(10)?,
        last_page_read: row.get(11)?,
        pages_count: row.get(12)?,
        uploaded_at: opt_datetime(row, 13)?,
        fetched_at: datetime_or_now(row, 14),
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        manga_id: row.get(1)?,
        chapter_id: row.get(2)?,
        last_read_at: datetime_or_now(row, 3),
        pages_read: row.get(4)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        order: row.get(2)?,
        flags: CategoryFlags {
            download_new_chapters: row.get(3)?,
            include_in_update: row.get(4)?,
            include_in_global_update: row.get(5)?,
        },
    })
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceRecord> {
    Ok(SourceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        lang: row.get(2)?,
        version: row.get(3)?,
        icon: row.get(4)?,
        supports_search: row.get(5)?,
        supports_popular: row.get(6)?,
        supports_latest: row.get(7)?,
        enabled: row.get(8)?,
        installed_at: datetime_or_now(row, 9),
    })
}

fn upsert_title(conn: &Connection, title: &Title) -> Result<()> {
    conn.execute(
        "INSERT INTO titles (id, source_id, remote_id, url, title, author, artist, description,
                             genres, status, cover_url, favorite, in_library, categories,
                             unread_count, added_at, last_fetched_at, last_read_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(id) DO UPDATE SET
             source_id = excluded.source_id,
             remote_id = excluded.remote_id,
             url = excluded.url,
             title = excluded.title,
             author = excluded.author,
             artist = excluded.artist,
             description = excluded.description,
             genres = excluded.genres,
             status = excluded.status,
             cover_url = excluded.cover_url,
             favorite = excluded.favorite,
             in_library = excluded.in_library,
             categories = excluded.categories,
             unread_count = excluded.unread_count,
             added_at = excluded.added_at,
             last_fetched_at = excluded.last_fetched_at,
             last_read_at = excluded.last_read_at",
        params![
            title.id,
            title.source_id,
            title.remote_id,
            title.url,
            title.title,
            title.author,
            title.artist,
            title.description,
            serde_json::to_string(&title.genres)?,
            title.status.as_str(),
            title.cover_url,
            title.favorite,
            title.in_library,
            serde_json::to_string(&title.categories)?,
            title.unread_count,
            title.added_at.as_ref().map(SqliteStore::format_datetime),
            title.last_fetched_at.as_ref().map(SqliteStore::format_datetime),
            title.last_read_at.as_ref().map(SqliteStore::format_datetime),
        ],
    )?;
    Ok(())
}

fn upsert_chapter(conn: &Connection, chapter: &Chapter) -> Result<()> {
    conn.execute(
        "INSERT INTO chapters (id, manga_id, source_id, remote_id, url, name, chapter_number,
                               volume_number, scanlator, read, bookmark, last_page_read,
                               pages_count, uploaded_at, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
         ON CONFLICT(id) DO UPDATE SET
             source_id = excluded.source_id,
             remote_id = excluded.remote_id,
             url = excluded.url,
             name = excluded.name,
             chapter_number = excluded.chapter_number,
             volume_number = excluded.volume_number,
             scanlator = excluded.scanlator,
             read = excluded.read,
             bookmark = excluded.bookmark,
             last_page_read = excluded.last_page_read,
             pages_count = excluded.pages_count,
             uploaded_at = excluded.uploaded_at,
             fetched_at = excluded.fetched_at",
        params![
            chapter.id,
            chapter.manga_id,
            chapter.source_id,
            chapter.remote_id,
            chapter.url,
            chapter.name,
            chapter.chapter_number,
            chapter.volume_number,
            chapter.scanlator,
            chapter.read,
            chapter.bookmark,
            chapter.last_page_read,
            chapter.pages_count,
            chapter.uploaded_at.as_ref().map(SqliteStore::format_datetime),
            SqliteStore::format_datetime(&chapter.fetched_at),
        ],
    )?;
    Ok(())
}

fn insert_history(conn: &Connection, entry: &HistoryEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO history (manga_id, chapter_id, last_read_at, pages_read)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.manga_id,
            entry.chapter_id,
            SqliteStore::format_datetime(&entry.last_read_at),
            entry.pages_read,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn upsert_category(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories (id, name, sort_order, download_new_chapters,
                                 include_in_update, include_in_global_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             sort_order = excluded.sort_order,
             download_new_chapters = excluded.download_new_chapters,
             include_in_update = excluded.include_in_update,
             include_in_global_update = excluded.include_in_global_update",
        params![
            category.id,
            category.name,
            category.order,
            category.flags.download_new_chapters,
            category.flags.include_in_update,
            category.flags.include_in_global_update,
        ],
    )?;
    Ok(())
}

fn title_exists(conn: &Connection, id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM titles WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// The title a stored chapter belongs to.
fn chapter_owner(conn: &Connection, chapter_id: &str) -> Result<Option<String>> {
    let owner = conn
        .query_row(
            "SELECT manga_id FROM chapters WHERE id = ?1",
            params![chapter_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(owner)
}

fn query_title(conn: &Connection, id: &str) -> Result<Option<Title>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM titles WHERE id = ?1", TITLE_COLUMNS),
            params![id],
            title_from_row,
        )
        .optional()?;
    Ok(result)
}

fn query_chapter(conn: &Connection, id: &str) -> Result<Option<Chapter>> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM chapters WHERE id = ?1", CHAPTER_COLUMNS),
            params![id],
            chapter_from_row,
        )
        .optional()?;
    Ok(result)
}

fn purge_in(conn: &Connection, id: &str) -> Result<Option<PurgeReport>> {
    if !title_exists(conn, id)? {
        return Ok(None);
    }

    let history = conn.execute("DELETE FROM history WHERE manga_id = ?1", params![id])?;
    let chapters = conn.execute("DELETE FROM chapters WHERE manga_id = ?1", params![id])?;
    conn.execute("DELETE FROM titles WHERE id = ?1", params![id])?;

    Ok(Some(PurgeReport { chapters, history }))
}

impl SqliteStore {
    fn query_titles(&self, sql: &str, param: Option<&str>) -> Result<Vec<Title>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = match param {
            Some(value) => stmt.query_map(params![value], title_from_row)?,
            None => stmt.query_map([], title_from_row)?,
        };
        let titles = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(titles)
    }
}

impl Store for SqliteStore {
    fn changes(&self) -> &ChangeNotifier {
        &self.changes
    }

    fn get_title(&self, id: &str) -> Result<Option<Title>> {
        let conn = self.conn()?;
        query_title(&conn, id)
    }

    fn get_all_titles(&self) -> Result<Vec<Title>> {
        self.query_titles(
            &format!("SELECT {} FROM titles ORDER BY title, id", TITLE_COLUMNS),
            None,
        )
    }

    fn get_library_titles(&self) -> Result<Vec<Title>> {
        self.query_titles(
            &format!(
                "SELECT {} FROM titles WHERE in_library = 1
                 ORDER BY last_read_at IS NULL, last_read_at DESC, title",
                TITLE_COLUMNS
            ),
            None,
        )
    }

    fn get_favorite_titles(&self) -> Result<Vec<Title>> {
        self.query_titles(
            &format!(
                "SELECT {} FROM titles WHERE favorite = 1 ORDER BY title",
                TITLE_COLUMNS
            ),
            None,
        )
    }

    fn get_titles_by_category(&self, category_id: &str) -> Result<Vec<Title>> {
        self.query_titles(
            &format!(
                "SELECT {} FROM titles WHERE {} ORDER BY title",
                TITLE_COLUMNS, IN_CATEGORY
            ),
            Some(category_id),
        )
    }

    fn get_titles_by_source(&self, source_id: &str) -> Result<Vec<Title>> {
        self.query_titles(
            &format!(
                "SELECT {} FROM titles WHERE source_id = ?1 ORDER BY title",
                TITLE_COLUMNS
            ),
            Some(source_id),
        )
    }

    fn put_title(&self, title: &Title) -> Result<()> {
        {
            let conn = self.conn()?;
            upsert_title(&conn, title)?;
        }
        self.changes.emit(Collection::Titles, [title.id.clone()]);
        Ok(())
    }

    fn put_titles(&self, titles: &[Title]) -> Result<usize> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            for title in titles {
                upsert_title(&tx, title)?;
            }
            tx.commit()?;
        }
        self.changes
            .emit(Collection::Titles, titles.iter().map(|t| t.id.clone()));
        Ok(titles.len())
    }

    fn purge_title(&self, id: &str) -> Result<Option<PurgeReport>> {
        let report = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let report = purge_in(&tx, id)?;
            tx.commit()?;
            report
        };

        if report.is_some() {
            self.changes.emit(Collection::History, []);
            self.changes.emit(Collection::Chapters, []);
            self.changes.emit(Collection::Titles, [id.to_string()]);
        }
        Ok(report)
    }

    fn get_chapter(&self, id: &str) -> Result<Option<Chapter>> {
        let conn = self.conn()?;
        query_chapter(&conn, id)
    }

    fn get_chapters_by_title(&self, manga_id: &str) -> Result<Vec<Chapter>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chapters WHERE manga_id = ?1
             ORDER BY chapter_number IS NULL, chapter_number DESC, name",
            CHAPTER_COLUMNS
        ))?;

        let chapters = stmt
            .query_map(params![manga_id], chapter_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(chapters)
    }

    fn count_unread(&self, manga_id: &str) -> Result<u32> {
        let conn = self.conn()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM chapters WHERE manga_id = ?1 AND read = 0",
            params![manga_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn put_chapter(&self, chapter: &Chapter) -> Result<()> {
        self.put_chapters(std::slice::from_ref(chapter)).map(|_| ())
    }

    fn put_chapters(&self, chapters: &[Chapter]) -> Result<usize> {
        self.commit(&WriteBatch {
            chapters: chapters.to_vec(),
            ..Default::default()
        })?;
        Ok(chapters.len())
    }

    fn add_history(&self, entry: &HistoryEntry) -> Result<i64> {
        let id = {
            let conn = self.conn()?;
            insert_history(&conn, entry)?
        };
        self.changes.emit(Collection::History, [id.to_string()]);
        Ok(id)
    }

    fn get_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM history ORDER BY last_read_at DESC, id DESC LIMIT ?1",
            HISTORY_COLUMNS
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![limit], history_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn get_history_by_title(&self, manga_id: &str) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM history WHERE manga_id = ?1 ORDER BY last_read_at DESC, id DESC",
            HISTORY_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![manga_id], history_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn get_recent_reads(&self, limit: usize) -> Result<Vec<(String, DateTime<Utc>)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT manga_id, MAX(last_read_at) AS latest FROM history
             GROUP BY manga_id ORDER BY latest DESC, manga_id LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let reads = stmt
            .query_map(params![limit], |row| {
                Ok((row.get::<_, String>(0)?, datetime_or_now(row, 1)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(reads)
    }

    fn delete_history_entry(&self, id: i64) -> Result<bool> {
        let deleted = {
            let conn = self.conn()?;
            conn.execute("DELETE FROM history WHERE id = ?1", params![id])?
        };
        if deleted > 0 {
            self.changes.emit(Collection::History, [id.to_string()]);
        }
        Ok(deleted > 0)
    }

    fn clear_title_history(&self, manga_id: &str) -> Result<usize> {
        let deleted = {
            let conn = self.conn()?;
            conn.execute("DELETE FROM history WHERE manga_id = ?1", params![manga_id])?
        };
        self.changes.emit(Collection::History, []);
        Ok(deleted)
    }

    fn clear_history(&self) -> Result<()> {
        {
            let conn = self.conn()?;
            conn.execute("DELETE FROM history", [])?;
        }
        self.changes.emit_all(Collection::History);
        Ok(())
    }

    fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS),
                params![id],
                category_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn get_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    fn put_category(&self, category: &Category) -> Result<()> {
        self.put_categories(std::slice::from_ref(category))
    }

    fn put_categories(&self, categories: &[Category]) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            for category in categories {
                upsert_category(&tx, category)?;
            }
            tx.commit()?;
        }
        self.changes
            .emit(Collection::Categories, categories.iter().map(|c| c.id.clone()));
        Ok(())
    }

    fn delete_category(&self, id: &str) -> Result<Option<Vec<String>>> {
        let affected = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM categories WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Ok(None);
            }

            let members: Vec<(String, String)> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT id, categories FROM titles WHERE {}",
                    IN_CATEGORY
                ))?;
                let rows = stmt
                    .query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            for (title_id, raw) in &members {
                let mut categories: BTreeSet<String> = serde_json::from_str(raw)?;
                categories.remove(id);
                tx.execute(
                    "UPDATE titles SET categories = ?1 WHERE id = ?2",
                    params![serde_json::to_string(&categories)?, title_id],
                )?;
            }
            tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
            tx.commit()?;

            members.into_iter().map(|(title_id, _)| title_id).collect::<Vec<_>>()
        };

        if !affected.is_empty() {
            self.changes.emit(Collection::Titles, affected.iter().cloned());
        }
        self.changes.emit(Collection::Categories, [id.to_string()]);
        Ok(Some(affected))
    }

    fn get_source_record(&self, id: &str) -> Result<Option<SourceRecord>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM sources WHERE id = ?1", SOURCE_COLUMNS),
                params![id],
                source_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn get_source_records(&self) -> Result<Vec<SourceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sources ORDER BY name, id",
            SOURCE_COLUMNS
        ))?;

        let records = stmt
            .query_map([], source_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn insert_source_record(&self, record: &SourceRecord) -> Result<bool> {
        let inserted = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT OR IGNORE INTO sources (id, name, lang, version, icon, supports_search,
                                                supports_popular, supports_latest, enabled,
                                                installed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.name,
                    record.lang,
                    record.version,
                    record.icon,
                    record.supports_search,
                    record.supports_popular,
                    record.supports_latest,
                    record.enabled,
                    Self::format_datetime(&record.installed_at),
                ],
            )?
        };

        if inserted > 0 {
            self.changes.emit(Collection::Sources, [record.id.clone()]);
        }
        Ok(inserted > 0)
    }

    fn set_source_enabled(&self, id: &str, enabled: bool) -> Result<bool> {
        let updated = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE sources SET enabled = ?1 WHERE id = ?2",
                params![enabled, id],
            )?
        };

        if updated > 0 {
            self.changes.emit(Collection::Sources, [id.to_string()]);
        }
        Ok(updated > 0)
    }

    fn commit(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            for title in &batch.titles {
                upsert_title(&tx, title)?;
            }
            for chapter in &batch.chapters {
                let in_batch = batch.titles.iter().any(|t| t.id == chapter.manga_id);
                if !in_batch && !title_exists(&tx, &chapter.manga_id)? {
                    return Err(OmniError::ReferentialIntegrity {
                        chapter_id: chapter.id.clone(),
                        manga_id: chapter.manga_id.clone(),
                    });
                }
                if let Some(owner) = chapter_owner(&tx, &chapter.id)? {
                    if owner != chapter.manga_id {
                        return Err(OmniError::ChapterOwnership {
                            chapter_id: chapter.id.clone(),
                            owner,
                            manga_id: chapter.manga_id.clone(),
                        });
                    }
                }
                upsert_chapter(&tx, chapter)?;
            }
            for entry in &batch.history {
                insert_history(&tx, entry)?;
            }

            tx.commit()?;
        }

        if !batch.titles.is_empty() {
            self.changes
                .emit(Collection::Titles, batch.titles.iter().map(|t| t.id.clone()));
        }
        if !batch.chapters.is_empty() {
            self.changes
                .emit(Collection::Chapters, batch.chapters.iter().map(|c| c.id.clone()));
        }
        if !batch.history.is_empty() {
            self.changes.emit(Collection::History, []);
        }
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM history", [])?;
            tx.execute("DELETE FROM chapters", [])?;
            tx.execute("DELETE FROM titles", [])?;
            tx.execute("DELETE FROM categories", [])?;
            tx.execute("DELETE FROM sources", [])?;
            tx.commit()?;
        }

        for collection in [
            Collection::History,
            Collection::Chapters,
            Collection::Titles,
            Collection::Categories,
            Collection::Sources,
        ] {
            self.changes.emit_all(collection);
        }
        Ok(())
    }
}
