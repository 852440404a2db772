//! Cast and crew rows with divider context.

use super::Emitter;
use crate::error::Result;
use crate::keys::PersonKey;
use crate::model::{CastEntry, CrewEntry, Divider, DividerKind, Profile};
use crate::sql::Insert;

/// Captions in effect for the members that follow. One per list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DividerState {
    pub episode: Option<String>,
    pub group: Option<String>,
}

impl DividerState {
    pub fn apply(&mut self, divider: &Divider) {
        match divider.kind {
            DividerKind::Episode => {
                self.episode = Some(divider.caption.clone());
                self.group = None;
            }
            DividerKind::Group => {
                self.group = Some(divider.caption.clone());
            }
            DividerKind::EndDiv => {
                if self.group.is_some() {
                    self.group = None;
                } else {
                    self.episode = None;
                }
            }
        }
    }
}

impl Emitter<'_> {
    pub(super) fn cast(&mut self, profile: &Profile, out: &mut Vec<String>) -> Result<()> {
        let mut state = DividerState::default();
        for entry in &profile.cast {
            match entry {
                CastEntry::Divider(divider) => state.apply(divider),
                CastEntry::Member(member) => {
                    let person_id = self
                        .registry
                        .persons
                        .lookup(&PersonKey::of(&member.person))?;
                    let row = Insert::new("tDVDxCast", self.dialect)
                        .id(self.counter.next_id())
                        .text(&profile.id)
                        .id(person_id)
                        .opt_text(&member.role)
                        .opt_text(&member.credited_as)
                        .boolean(member.voice)
                        .boolean(member.uncredited)
                        .boolean(member.puppeteer)
                        .maybe_text(state.episode.as_deref())
                        .maybe_text(state.group.as_deref());
                    out.push(row.finish());
                }
            }
        }
        Ok(())
    }

    pub(super) fn crew(&mut self, profile: &Profile, out: &mut Vec<String>) -> Result<()> {
        let mut state = DividerState::default();
        let mut last_credit_type: Option<&str> = None;
        for entry in &profile.crew {
            match entry {
                CrewEntry::Divider(divider) => state.apply(divider),
                CrewEntry::Member(member) => {
                    // A group never carries over into a new credit type, the
                    // first one included.
                    if last_credit_type != Some(member.credit_type.as_str()) {
                        state.group = None;
                        last_credit_type = Some(&member.credit_type);
                    }

                    let person_id = self
                        .registry
                        .persons
                        .lookup(&PersonKey::of(&member.person))?;
                    let row = Insert::new("tDVDxCrew", self.dialect)
                        .id(self.counter.next_id())
                        .text(&profile.id)
                        .id(person_id)
                        .text(&member.credit_type)
                        .opt_text(&member.credit_subtype)
                        .opt_text(&member.credited_as)
                        .maybe_text(state.episode.as_deref())
                        .maybe_text(state.group.as_deref())
                        .maybe_text(member.custom_role.as_deref());
                    out.push(row.finish());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divider(kind: DividerKind, caption: &str) -> Divider {
        Divider {
            caption: caption.into(),
            kind,
        }
    }

    #[test]
    fn episode_then_group_then_end() {
        let mut s = DividerState::default();
        s.apply(&divider(DividerKind::Episode, "E1"));
        assert_eq!(s.episode.as_deref(), Some("E1"));
        s.apply(&divider(DividerKind::Group, "G1"));
        assert_eq!(s.group.as_deref(), Some("G1"));

        s.apply(&divider(DividerKind::EndDiv, ""));
        assert_eq!(s.group, None);
        assert_eq!(s.episode.as_deref(), Some("E1"));

        s.apply(&divider(DividerKind::EndDiv, ""));
        assert_eq!(s, DividerState::default());
    }

    #[test]
    fn new_episode_clears_group() {
        let mut s = DividerState::default();
        s.apply(&divider(DividerKind::Group, "G1"));
        s.apply(&divider(DividerKind::Episode, "E2"));
        assert_eq!(s.group, None);
        assert_eq!(s.episode.as_deref(), Some("E2"));
    }
}
