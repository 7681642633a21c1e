use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use tracedeck_core::model::{
    Framework, NewRun, RunId, RunRecord, RunStatus, RunSummary, StepKind, StepRecord, StepStatus,
    Tag, ToolCallRecord, ToolStatus,
};

use crate::error::StoreError;
use crate::schema;

/// Options for listing runs.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub status: Option<RunStatus>,
    pub framework: Option<Framework>,
    /// Free-text token matched case-insensitively against run id, run name,
    /// and tag names (OR across the three).
    pub query: Option<String>,
    pub limit: Option<usize>,
}

/// The main storage interface for trace operations.
pub struct TraceStore {
    conn: Connection,
}

impl TraceStore {
    /// Open (and initialize if needed) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory store, used by tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self { conn })
    }

    /// Persist a normalized run graph in one transaction.
    ///
    /// Either the whole graph (run, steps, tool calls, tag associations) is
    /// visible after this call or none of it is. Tag resolution is an atomic
    /// get-or-create on the unique name: concurrent ingestion of the same tag
    /// name resolves to reuse, never a duplicate or an error.
    pub fn create_run(&mut self, run: &NewRun) -> Result<RunId, StoreError> {
        let metadata = encode_json(&run.metadata)?;
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (id, name, framework, status, started_at, ended_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.id.as_str(),
                run.name,
                run.framework.as_str(),
                run.status.as_str(),
                encode_ts(&run.started_at),
                run.ended_at.as_ref().map(encode_ts),
                metadata,
            ],
        )?;

        for tag in &run.tags {
            tx.execute(
                "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                params![tag],
            )?;
            let tag_id: i64 = tx.query_row(
                "SELECT id FROM tags WHERE name = ?1",
                params![tag],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO run_tags (run_id, tag_id) VALUES (?1, ?2)",
                params![run.id.as_str(), tag_id],
            )?;
        }

        for (seq, step) in run.steps.iter().enumerate() {
            tx.execute(
                "INSERT INTO steps
                 (id, run_id, idx, seq, name, kind, input, output, error, status, started_at, ended_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    step.id,
                    run.id.as_str(),
                    step.index,
                    seq as i64,
                    step.name,
                    step.kind.map(|k| k.as_str()),
                    encode_json(&step.input)?,
                    encode_json(&step.output)?,
                    step.error,
                    step.status.as_str(),
                    encode_ts(&step.started_at),
                    step.ended_at.as_ref().map(encode_ts),
                ],
            )?;

            for (position, call) in step.tool_calls.iter().enumerate() {
                tx.execute(
                    "INSERT INTO tool_calls
                     (id, step_id, position, name, input, output, error, status, started_at, ended_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        call.id,
                        step.id,
                        position as i64,
                        call.name,
                        encode_json(&call.input)?,
                        encode_json(&call.output)?,
                        call.error,
                        call.status.as_str(),
                        encode_ts(&call.started_at),
                        call.ended_at.as_ref().map(encode_ts),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(run.id.clone())
    }

    /// Read a run with its full owned subgraph.
    pub fn get_run(&self, id: &str) -> Result<RunRecord, StoreError> {
        let header = self
            .conn
            .query_row(
                "SELECT id, name, framework, status, started_at, ended_at, metadata
                 FROM runs WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let tags = self.run_tags(id)?;
        let steps = self.run_steps(id)?;

        Ok(RunRecord {
            id: RunId::from(header.0),
            name: header.1,
            framework: Framework::parse(&header.2)?,
            status: RunStatus::parse(&header.3)?,
            started_at: decode_ts(&header.4)?,
            ended_at: decode_opt_ts(header.5)?,
            metadata: decode_json(header.6)?,
            tags,
            steps,
        })
    }

    /// List run summaries, most recently started first.
    pub fn list_runs(&self, opts: &ListOptions) -> Result<Vec<RunSummary>, StoreError> {
        let needle = opts.query.as_ref().map(|q| q.to_lowercase());
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.framework, r.status, r.started_at, r.ended_at,
                    (SELECT COUNT(*) FROM steps s WHERE s.run_id = r.id)
             FROM runs r
             WHERE (?1 IS NULL OR r.status = ?1)
               AND (?2 IS NULL OR r.framework = ?2)
               AND (?3 IS NULL
                    OR instr(lower(r.id), ?3) > 0
                    OR instr(lower(coalesce(r.name, '')), ?3) > 0
                    OR EXISTS (SELECT 1 FROM run_tags rt
                               JOIN tags t ON t.id = rt.tag_id
                               WHERE rt.run_id = r.id AND instr(lower(t.name), ?3) > 0))
             ORDER BY r.started_at DESC",
        )?;

        type RawSummary = (
            String,
            Option<String>,
            String,
            String,
            String,
            Option<String>,
            i64,
        );
        let raw: Vec<RawSummary> = stmt
            .query_map(
                params![
                    opts.status.map(|s| s.as_str()),
                    opts.framework.map(|f| f.as_str()),
                    needle,
                ],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )?
            .collect::<Result<_, _>>()?;

        let mut summaries = Vec::with_capacity(raw.len());
        for (id, name, framework, status, started_at, ended_at, step_count) in raw {
            let decoded = (|| -> Result<RunSummary, StoreError> {
                let tags = self.run_tags(&id)?.into_iter().map(|t| t.name).collect();
                Ok(RunSummary {
                    id: RunId::from(id.clone()),
                    name,
                    framework: Framework::parse(&framework)?,
                    status: RunStatus::parse(&status)?,
                    started_at: decode_ts(&started_at)?,
                    ended_at: decode_opt_ts(ended_at)?,
                    tags,
                    step_count,
                })
            })();
            match decoded {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::warn!("Skipping unreadable run {id}: {e}");
                }
            }
        }

        if let Some(limit) = opts.limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }

    /// Delete a run and everything it owns. Shared tags are left in place.
    pub fn delete_run(&mut self, id: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM tool_calls
             WHERE step_id IN (SELECT id FROM steps WHERE run_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM steps WHERE run_id = ?1", params![id])?;
        tx.execute("DELETE FROM run_tags WHERE run_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM runs WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        tx.commit()?;
        Ok(())
    }

    fn run_tags(&self, run_id: &str) -> Result<Vec<Tag>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name FROM tags t
             JOIN run_tags rt ON rt.tag_id = t.id
             WHERE rt.run_id = ?1
             ORDER BY t.id",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut tags = Vec::new();
        for tag in rows {
            tags.push(tag?);
        }
        Ok(tags)
    }

    fn run_steps(&self, run_id: &str) -> Result<Vec<StepRecord>, StoreError> {
        // Steps come back ascending by index; equal indexes keep
        // submission order via seq.
        let mut stmt = self.conn.prepare(
            "SELECT id, idx, name, kind, input, output, error, status, started_at, ended_at
             FROM steps WHERE run_id = ?1
             ORDER BY idx ASC, seq ASC",
        )?;
        type RawStep = (
            String,
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            String,
            Option<String>,
        );
        let raw: Vec<RawStep> = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            })?
            .collect::<Result<_, _>>()?;

        let mut steps = Vec::with_capacity(raw.len());
        for (id, index, name, kind, input, output, error, status, started_at, ended_at) in raw {
            let tool_calls = self.step_tool_calls(&id)?;
            steps.push(StepRecord {
                id,
                index,
                name,
                kind: kind.as_deref().map(StepKind::parse).transpose()?,
                input: decode_json(input)?,
                output: decode_json(output)?,
                error,
                status: StepStatus::parse(&status)?,
                started_at: decode_ts(&started_at)?,
                ended_at: decode_opt_ts(ended_at)?,
                tool_calls,
            });
        }
        Ok(steps)
    }

    fn step_tool_calls(&self, step_id: &str) -> Result<Vec<ToolCallRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, input, output, error, status, started_at, ended_at
             FROM tool_calls WHERE step_id = ?1
             ORDER BY position ASC",
        )?;
        type RawCall = (
            String,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            String,
            Option<String>,
        );
        let raw: Vec<RawCall> = stmt
            .query_map(params![step_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })?
            .collect::<Result<_, _>>()?;

        let mut calls = Vec::with_capacity(raw.len());
        for (id, name, input, output, error, status, started_at, ended_at) in raw {
            calls.push(ToolCallRecord {
                id,
                name,
                input: decode_json(input)?,
                output: decode_json(output)?,
                error,
                status: ToolStatus::parse(&status)?,
                started_at: decode_ts(&started_at)?,
                ended_at: decode_opt_ts(ended_at)?,
            });
        }
        Ok(calls)
    }
}

/// Fixed-width RFC 3339 so lexicographic order matches chronological order.
fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("bad timestamp {s:?}: {e}")))
}

fn decode_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    s.as_deref().map(decode_ts).transpose()
}

fn encode_json(value: &Option<serde_json::Value>) -> Result<Option<String>, StoreError> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Into::into)
}

fn decode_json(s: Option<String>) -> Result<Option<serde_json::Value>, StoreError> {
    s.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Decode(format!("bad stored JSON: {e}")))
    })
    .transpose()
}
