//! Box-set parent pointers and child associations.

use super::{CommandGroup, Emitter};
use crate::model::Profile;
use crate::sql::{self, Insert};

impl Emitter<'_> {
    /// Needs the complete set of valid ids, so it runs after every profile
    /// group. References to unknown or id-less profiles are dropped.
    pub fn box_set_groups(&mut self, profiles: &[Profile]) -> Vec<CommandGroup> {
        let valid = &self.registry.valid_ids;
        let mut parents = Vec::new();
        let mut children = Vec::new();

        for profile in profiles.iter().filter(|p| p.is_valid()) {
            let parent = &profile.box_set.parent;
            if !parent.is_empty() && valid.contains(parent) {
                parents.push(format!(
                    "UPDATE tDVD SET ParentDVDId = {} WHERE Id = {}",
                    sql::text(parent),
                    sql::text(&profile.id)
                ));
            }

            for child in &profile.box_set.contents {
                if child.is_empty() || !valid.contains(child) {
                    continue;
                }
                let row = Insert::new("tDVDxDVD", self.dialect)
                    .id(self.counter.next_id())
                    .text(&profile.id)
                    .text(child);
                children.push(row.finish());
            }
        }

        vec![
            CommandGroup::new("BoxSetParent", parents),
            CommandGroup::new("BoxSetChildren", children),
        ]
    }
}
