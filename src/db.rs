use crate::engine::Plan;
use crate::error::{ConvertError, Result, SCHEMA_VERSION};
use crate::progress::Progress;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Writes an empty-schema database stamped with the expected version.
pub fn create_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("template already exists: {}", path.to_string_lossy());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("failed to create {}", path.to_string_lossy()))?;
    conn.execute_batch(SCHEMA_SQL)
        .context("failed to create schema")?;
    conn.execute("INSERT INTO tDBVersion (Version) VALUES (?1)", [SCHEMA_VERSION])?;
    Ok(())
}

/// Copies the template over the target, replacing any existing file.
pub fn prepare_target(template: &Path, target: &Path) -> Result<()> {
    if same_file(template, target) {
        return Err(ConvertError::TargetIsTemplate(target.to_path_buf()));
    }
    copy_template(template, target).map_err(ConvertError::Template)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn copy_template(template: &Path, target: &Path) -> anyhow::Result<()> {
    if !template.is_file() {
        anyhow::bail!("template not found: {}", template.to_string_lossy());
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    if target.exists() {
        std::fs::remove_file(target)
            .with_context(|| format!("failed to replace {}", target.to_string_lossy()))?;
    }
    std::fs::copy(template, target).with_context(|| {
        format!(
            "failed to copy {} to {}",
            template.to_string_lossy(),
            target.to_string_lossy()
        )
    })?;
    Ok(())
}

pub fn open_target(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    Ok(conn)
}

pub fn schema_version(conn: &Connection) -> Result<Option<String>> {
    let version = conn
        .query_row("SELECT Version FROM tDBVersion", [], |r| r.get::<_, String>(0))
        .optional()?;
    Ok(version)
}

pub fn check_schema_version(conn: &Connection) -> Result<()> {
    let found = match schema_version(conn) {
        Ok(v) => v.unwrap_or_default(),
        Err(ConvertError::Database(e)) if is_missing_table(&e) => String::new(),
        Err(e) => return Err(e),
    };
    if found != SCHEMA_VERSION {
        return Err(ConvertError::SchemaVersion {
            expected: SCHEMA_VERSION.to_string(),
            found,
        });
    }
    Ok(())
}

fn is_missing_table(e: &rusqlite::Error) -> bool {
    e.to_string().contains("no such table")
}

/// Runs every group in one transaction. Nothing is committed unless every
/// statement succeeds.
pub fn execute_plan(
    conn: &mut Connection,
    plan: &Plan,
    progress: &mut dyn Progress,
) -> Result<()> {
    let tx = conn.transaction()?;
    for group in &plan.groups {
        tracing::debug!(
            section = group.section,
            statements = group.statements.len(),
            "executing group"
        );
        progress.range(group.statements.len());
        progress.message(group.section);
        for (i, sql) in group.statements.iter().enumerate() {
            tx.execute(sql, []).map_err(|source| ConvertError::Statement {
                sql: sql.clone(),
                source,
            })?;
            progress.advance(i + 1);
        }
        progress.range(0);
    }
    tx.commit()?;
    Ok(())
}

/// Row count of one destination table.
pub fn count_rows(conn: &Connection, table: &str) -> anyhow::Result<i64> {
    let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(n)
}
