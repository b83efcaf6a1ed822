use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use crate::attendance::{date_key, AttendanceError, SessionStore, Student};

pub const DB_FILE: &str = "attendance.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            display_name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id),
            UNIQUE(class_id, roll_number)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class_sort ON students(class_id, sort_order)",
        [],
    )?;

    // One opaque JSON record per (class, date). The record never names the
    // date; the key does.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_sessions(
            class_id TEXT NOT NULL,
            date TEXT NOT NULL,
            record TEXT NOT NULL,
            PRIMARY KEY(class_id, date),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    ensure_attendance_sessions_saved_at(&conn)?;

    Ok(conn)
}

fn ensure_attendance_sessions_saved_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "attendance_sessions", "saved_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE attendance_sessions ADD COLUMN saved_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A class with the counts shown next to it in the class picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    pub id: String,
    pub name: String,
    pub student_count: i64,
    pub saved_session_count: i64,
}

pub fn list_classes(conn: &Connection) -> rusqlite::Result<Vec<ClassRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name,
           (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id),
           (SELECT COUNT(*) FROM attendance_sessions a WHERE a.class_id = c.id)
         FROM classes c
         ORDER BY c.name, c.rowid",
    )?;
    stmt.query_map([], |r| {
        Ok(ClassRow {
            id: r.get(0)?,
            name: r.get(1)?,
            student_count: r.get(2)?,
            saved_session_count: r.get(3)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}

pub fn insert_class(conn: &Connection, id: &str, name: &str) -> rusqlite::Result<()> {
    conn.execute("INSERT INTO classes(id, name) VALUES(?, ?)", (id, name))?;
    Ok(())
}

pub fn class_exists(conn: &Connection, class_id: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

/// The class roster in display order.
pub fn list_roster(conn: &Connection, class_id: &str) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, roll_number, display_name
         FROM students
         WHERE class_id = ?
         ORDER BY sort_order, rowid",
    )?;
    stmt.query_map([class_id], |r| {
        Ok(Student {
            id: r.get(0)?,
            roll_number: r.get(1)?,
            display_name: r.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}

pub fn roll_number_taken(
    conn: &Connection,
    class_id: &str,
    roll_number: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM students WHERE class_id = ? AND roll_number = ?",
        (class_id, roll_number),
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
}

pub fn next_sort_order(conn: &Connection, class_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM students WHERE class_id = ?",
        [class_id],
        |r| r.get(0),
    )
}

#[derive(Debug, Clone)]
pub struct SavedSessionRow {
    pub date: String,
    pub record: String,
    pub saved_at: Option<String>,
}

/// Every stored session for a class, newest date first.
pub fn list_saved_sessions(
    conn: &Connection,
    class_id: &str,
) -> rusqlite::Result<Vec<SavedSessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT date, record, saved_at
         FROM attendance_sessions
         WHERE class_id = ?
         ORDER BY date DESC",
    )?;
    stmt.query_map([class_id], |r| {
        Ok(SavedSessionRow {
            date: r.get(0)?,
            record: r.get(1)?,
            saved_at: r.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
}

/// Session store scoped to one class; the key seen by the engine is the date.
pub struct SqliteSessionStore<'a> {
    conn: &'a Connection,
    class_id: &'a str,
}

impl<'a> SqliteSessionStore<'a> {
    pub fn new(conn: &'a Connection, class_id: &'a str) -> Self {
        Self { conn, class_id }
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn get(&self, date: NaiveDate) -> Result<Option<String>, AttendanceError> {
        let record = self
            .conn
            .query_row(
                "SELECT record FROM attendance_sessions WHERE class_id = ? AND date = ?",
                (self.class_id, date_key(date)),
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(record)
    }

    fn set(&mut self, date: NaiveDate, record: &str) -> Result<(), AttendanceError> {
        let saved_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO attendance_sessions(class_id, date, record, saved_at)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(class_id, date) DO UPDATE SET
               record = excluded.record,
               saved_at = excluded.saved_at",
            (self.class_id, date_key(date), record, &saved_at),
        )?;
        Ok(())
    }
}
