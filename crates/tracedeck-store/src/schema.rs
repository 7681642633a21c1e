use rusqlite::Connection;

/// Create tables and indexes if missing. Timestamps are RFC 3339 text;
/// opaque values are serialized JSON text. `steps.seq` and
/// `tool_calls.position` record submission order (`seq` breaks ties between
/// equal step indexes).
pub(crate) fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS runs (
            id TEXT PRIMARY KEY,
            name TEXT,
            framework TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            metadata TEXT
        );

        CREATE TABLE IF NOT EXISTS steps (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            idx INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            name TEXT,
            kind TEXT,
            input TEXT,
            output TEXT,
            error TEXT,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            FOREIGN KEY (run_id) REFERENCES runs(id)
        );

        CREATE TABLE IF NOT EXISTS tool_calls (
            id TEXT PRIMARY KEY,
            step_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            input TEXT,
            output TEXT,
            error TEXT,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            FOREIGN KEY (step_id) REFERENCES steps(id)
        );

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS run_tags (
            run_id TEXT NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (run_id, tag_id),
            FOREIGN KEY (run_id) REFERENCES runs(id),
            FOREIGN KEY (tag_id) REFERENCES tags(id)
        );

        CREATE INDEX IF NOT EXISTS idx_steps_run ON steps(run_id);
        CREATE INDEX IF NOT EXISTS idx_tool_calls_step ON tool_calls(step_id);
        CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at);
        CREATE INDEX IF NOT EXISTS idx_run_tags_tag ON run_tags(tag_id);
        ",
    )
}
