use crate::emit::plugins::PluginClassIds;
use crate::sql::Dialect;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const TEMPLATE_ENV: &str = "DVDPROFILER_TEMPLATE";
pub const TEMPLATE_FILE_NAME: &str = "DVDProfiler.sqlite3";
pub const DEFAULT_PROGRESS_EVERY: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertOptions {
    pub template_path: Option<PathBuf>,
    pub dialect: Dialect,
    pub plugin_class_ids: PluginClassIds,
    pub progress_every: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            template_path: None,
            dialect: Dialect::default(),
            plugin_class_ids: PluginClassIds::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl ConvertOptions {
    /// Explicit path, then the environment, then the file next to the binary.
    pub fn resolve_template(&self) -> anyhow::Result<PathBuf> {
        if let Some(p) = &self.template_path {
            return Ok(p.clone());
        }
        if let Some(p) = std::env::var_os(TEMPLATE_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(p));
        }
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(TEMPLATE_FILE_NAME))
    }
}
