//! End-to-end conversion runs.

use crate::config::ConvertOptions;
use crate::db;
use crate::engine::{Engine, Plan};
use crate::error::{ConvertError, Result};
use crate::model::Collection;
use crate::progress::Progress;
use crate::source::load_collection;
use crate::sql::Dialect;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub section: &'static str,
    pub statements: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertSummary {
    pub profiles: usize,
    pub skipped_profiles: usize,
    pub groups: Vec<GroupSummary>,
    pub statements: usize,
    pub high_water_id: i64,
    pub digest: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCount {
    pub kind: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectSummary {
    pub profiles: usize,
    pub valid_profiles: usize,
    pub skipped_profiles: usize,
    pub entities: Vec<EntityCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub statements: usize,
    pub high_water_id: i64,
    pub digest: String,
}

/// Both passes, no database involved.
pub fn plan(collection: &Collection, options: &ConvertOptions) -> Result<Plan> {
    let plan = Engine::new(options.dialect, options.plugin_class_ids.clone())?
        .translate(collection)?;
    tracing::info!(
        groups = plan.groups.len(),
        statements = plan.statement_count(),
        high_water = plan.high_water,
        digest = %plan.digest(),
        "plan built"
    );
    Ok(plan)
}

fn load(source: &Path) -> Result<Collection> {
    let collection = load_collection(source)?;
    let valid = collection.profiles.iter().filter(|p| p.is_valid()).count();
    tracing::info!(
        source = %source.display(),
        profiles = collection.profiles.len(),
        valid,
        "collection loaded"
    );
    Ok(collection)
}

/// Converts `source` into a fresh copy of the template at `target`.
///
/// On any failure after the target was created, the transaction is rolled
/// back, the target is removed and the error text goes to `progress`.
pub fn convert(
    source: &Path,
    target: &Path,
    options: &ConvertOptions,
    progress: &mut dyn Progress,
) -> Result<ConvertSummary> {
    let started = Instant::now();
    match run(source, target, options, progress, started) {
        Ok(summary) => {
            tracing::info!(
                path = %target.display(),
                statements = summary.statements,
                elapsed_ms = summary.elapsed_ms as u64,
                "conversion finished"
            );
            Ok(summary)
        }
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "conversion failed");
            progress.message(&format!("Error: {e}"));
            Err(e)
        }
    }
}

fn run(
    source: &Path,
    target: &Path,
    options: &ConvertOptions,
    progress: &mut dyn Progress,
    started: Instant,
) -> Result<ConvertSummary> {
    // Nothing touches the target until the whole plan is known.
    let collection = load(source)?;
    let plan = plan(&collection, options)?;

    let template = options
        .resolve_template()
        .context("failed to locate template")
        .map_err(ConvertError::Template)?;
    db::prepare_target(&template, target)?;

    if let Err(e) = populate(target, &plan, progress) {
        remove_partial(target);
        return Err(e);
    }

    let profiles = collection.profiles.len();
    let valid = collection.profiles.iter().filter(|p| p.is_valid()).count();
    Ok(ConvertSummary {
        profiles,
        skipped_profiles: profiles - valid,
        groups: plan
            .groups
            .iter()
            .map(|g| GroupSummary {
                section: g.section,
                statements: g.statements.len(),
            })
            .collect(),
        statements: plan.statement_count(),
        high_water_id: plan.high_water,
        digest: plan.digest(),
        elapsed_ms: started.elapsed().as_millis(),
    })
}

fn populate(target: &Path, plan: &Plan, progress: &mut dyn Progress) -> Result<()> {
    let mut conn = db::open_target(target)?;
    db::check_schema_version(&conn)?;
    db::execute_plan(&mut conn, plan, progress)?;
    conn.close().map_err(|(_, e)| ConvertError::Database(e))?;
    Ok(())
}

fn remove_partial(target: &Path) {
    if let Err(e) = std::fs::remove_file(target) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %target.display(), error = %e, "failed to remove partial target");
        }
    }
}

pub fn inspect(source: &Path, options: &ConvertOptions) -> Result<InspectSummary> {
    let collection = load(source)?;
    let scanned =
        Engine::new(options.dialect, options.plugin_class_ids.clone())?.scan(&collection)?;
    let registry = scanned.registry();
    let profiles = collection.profiles.len();
    let skipped_profiles = collection.profiles.iter().filter(|p| !p.is_valid()).count();
    Ok(InspectSummary {
        profiles,
        valid_profiles: profiles - skipped_profiles,
        skipped_profiles,
        entities: registry
            .counts()
            .into_iter()
            .map(|(kind, count)| EntityCount { kind, count })
            .collect(),
    })
}

/// Writes the planned statements as a script file.
pub fn export_sql(
    source: &Path,
    out: &Path,
    dialect: Dialect,
    options: &ConvertOptions,
) -> Result<ExportSummary> {
    let collection = load(source)?;
    let options = ConvertOptions {
        dialect,
        ..options.clone()
    };
    let plan = plan(&collection, &options)?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, plan.script())?;
    Ok(ExportSummary {
        statements: plan.statement_count(),
        high_water_id: plan.high_water,
        digest: plan.digest(),
    })
}
