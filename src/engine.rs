//! The per-run translation engine: scan, then emit.

use crate::emit::plugins::PluginClassIds;
use crate::emit::{CommandGroup, Emitter};
use crate::error::Result;
use crate::intern::IdCounter;
use crate::model::Collection;
use crate::scan::{Registry, Scanner};
use crate::sql::Dialect;
use sha2::{Digest, Sha256};

/// Owns the id counter and interning tables of a single run.
#[derive(Debug)]
pub struct Engine {
    dialect: Dialect,
    plugin_ids: PluginClassIds,
    counter: IdCounter,
    registry: Registry,
}

/// An engine whose tables are complete. Emission is only reachable from here.
#[derive(Debug)]
pub struct Scanned {
    engine: Engine,
}

/// Every statement of a run, grouped and ordered for execution.
#[derive(Debug, Clone)]
pub struct Plan {
    pub groups: Vec<CommandGroup>,
    /// Highest surrogate id handed out.
    pub high_water: i64,
}

impl Engine {
    pub fn new(dialect: Dialect, plugin_ids: PluginClassIds) -> Result<Self> {
        let mut counter = IdCounter::default();
        let registry = Registry::new(&mut counter)?;
        Ok(Self {
            dialect,
            plugin_ids,
            counter,
            registry,
        })
    }

    pub fn scan(mut self, collection: &Collection) -> Result<Scanned> {
        Scanner::new(&mut self.registry, &mut self.counter).scan(collection)?;
        tracing::info!(
            valid = self.registry.valid_ids.len(),
            persons = self.registry.persons.len(),
            users = self.registry.users.len(),
            ids = self.counter.high_water(),
            "scan finished"
        );
        Ok(Scanned { engine: self })
    }

    /// Both passes over the same collection.
    pub fn translate(self, collection: &Collection) -> Result<Plan> {
        self.scan(collection)?.emit(collection)
    }
}

impl Scanned {
    pub fn registry(&self) -> &Registry {
        &self.engine.registry
    }

    pub fn emit(self, collection: &Collection) -> Result<Plan> {
        let Engine {
            dialect,
            plugin_ids,
            mut counter,
            registry,
        } = self.engine;

        let mut emitter = Emitter::new(&registry, &mut counter, dialect, &plugin_ids);
        let mut groups = emitter.base_groups();
        groups.extend(emitter.profile_groups(&collection.profiles)?);
        groups.extend(
            emitter
                .box_set_groups(&collection.profiles)
                .into_iter()
                .filter(|g| !g.is_empty()),
        );

        Ok(Plan {
            groups,
            high_water: counter.high_water(),
        })
    }
}

impl Plan {
    pub fn statement_count(&self) -> usize {
        self.groups.iter().map(|g| g.statements.len()).sum()
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.statements.iter().map(String::as_str))
    }

    /// The plan as a script, one `;`-terminated statement per line.
    pub fn script(&self) -> String {
        let mut out = String::new();
        for statement in self.statements() {
            out.push_str(statement);
            out.push_str(";\n");
        }
        out
    }

    /// Hex SHA-256 of `script()`.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.script().as_bytes());
        hash.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn group(&self, section: &str) -> Option<&CommandGroup> {
        self.groups.iter().find(|g| g.section == section)
    }
}
