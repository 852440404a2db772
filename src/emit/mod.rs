//! Second pass: statements per destination table.

mod boxset;
mod credits;
pub mod plugins;

pub use credits::DividerState;

use crate::error::Result;
use crate::intern::{IdCounter, InternTable};
use crate::keys::{PluginKey, TagKey};
use crate::model::Profile;
use crate::scan::Registry;
use crate::sql::{Dialect, Insert};
use plugins::{PluginBlock, PluginClassIds};
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Ordered statements for one destination section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandGroup {
    pub section: &'static str,
    pub statements: Vec<String>,
}

impl CommandGroup {
    pub fn new(section: &'static str, statements: Vec<String>) -> Self {
        Self {
            section,
            statements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

type TableBuilder<'a> = fn(&mut Emitter<'a>, &Profile, &mut Vec<String>) -> Result<()>;

pub struct Emitter<'a> {
    registry: &'a Registry,
    counter: &'a mut IdCounter,
    dialect: Dialect,
    plugin_ids: &'a PluginClassIds,
}

impl<'a> Emitter<'a> {
    pub fn new(
        registry: &'a Registry,
        counter: &'a mut IdCounter,
        dialect: Dialect,
        plugin_ids: &'a PluginClassIds,
    ) -> Self {
        Self {
            registry,
            counter,
            dialect,
            plugin_ids,
        }
    }

    /// Lookup tables, one group each, in insertion order. Always reported,
    /// even when empty.
    pub fn base_groups(&self) -> Vec<CommandGroup> {
        let reg = self.registry;
        let d = self.dialect;
        vec![
            CommandGroup::new("Locality", value_rows(&reg.localities, "tLocality", d, |k| k)),
            CommandGroup::new(
                "DVDIdType",
                value_rows(&reg.id_types, "tDVDIdType", d, |k| k.wire_name()),
            ),
            CommandGroup::new(
                "AudioChannels",
                value_rows(&reg.audio_channels, "tAudioChannels", d, |k| k),
            ),
            CommandGroup::new(
                "AudioContent",
                value_rows(&reg.audio_contents, "tAudioContent", d, |k| k),
            ),
            CommandGroup::new(
                "AudioFormat",
                value_rows(&reg.audio_formats, "tAudioFormat", d, |k| k),
            ),
            CommandGroup::new("CaseType", value_rows(&reg.case_types, "tCaseType", d, |k| k)),
            CommandGroup::new(
                "CollectionType",
                reg.collection_types
                    .iter()
                    .map(|(value, id, owned)| {
                        Insert::new("tCollectionType", d)
                            .id(id)
                            .text(value)
                            .boolean(*owned)
                            .finish()
                    })
                    .collect(),
            ),
            CommandGroup::new(
                "EventType",
                value_rows(&reg.event_types, "tEventType", d, |k| k.wire_name()),
            ),
            CommandGroup::new(
                "VideoStandard",
                value_rows(&reg.video_standards, "tVideoStandard", d, |k| k.wire_name()),
            ),
            CommandGroup::new("Genre", value_rows(&reg.genres, "tGenre", d, |k| k)),
            CommandGroup::new("Subtitle", value_rows(&reg.subtitles, "tSubtitle", d, |k| k)),
            CommandGroup::new("MediaType", value_rows(&reg.media_types, "tMediaType", d, |k| k)),
            CommandGroup::new(
                "CastAndCrew",
                reg.persons
                    .iter()
                    .map(|(_, id, person)| {
                        Insert::new("tCastAndCrew", d)
                            .id(id)
                            .opt_text(&person.last_name)
                            .opt_text(&person.middle_name)
                            .opt_text(&person.first_name)
                            .nonzero(person.birth_year)
                            .finish()
                    })
                    .collect(),
            ),
            CommandGroup::new(
                "LinkCategory",
                value_rows(&reg.link_categories, "tLinkCategory", d, |k| k.wire_name()),
            ),
            CommandGroup::new(
                "CountryOfOrigin",
                value_rows(&reg.countries, "tCountryOfOrigin", d, |k| k),
            ),
            CommandGroup::new(
                "User",
                reg.users
                    .iter()
                    .map(|(_, id, user)| {
                        Insert::new("tUser", d)
                            .id(id)
                            .opt_text(&user.last_name)
                            .opt_text(&user.first_name)
                            .opt_text(&user.email)
                            .opt_text(&user.phone)
                            .finish()
                    })
                    .collect(),
            ),
            CommandGroup::new(
                "StudioAndMediaCompany",
                value_rows(&reg.studios, "tStudioAndMediaCompany", d, |k| k),
            ),
            CommandGroup::new(
                "Tag",
                reg.tags
                    .iter()
                    .map(|(_, id, tag)| {
                        Insert::new("tTag", d)
                            .id(id)
                            .opt_text(&tag.name)
                            .opt_text(&tag.full_name)
                            .finish()
                    })
                    .collect(),
            ),
            CommandGroup::new(
                "PluginData",
                reg.plugins
                    .iter()
                    .map(|(key, id, name)| {
                        Insert::new("tPluginData", d)
                            .id(id)
                            .text(key.as_str())
                            .opt_text(name)
                            .finish()
                    })
                    .collect(),
            ),
        ]
    }

    /// Per-profile tables. Every table builder runs for one profile before the
    /// next profile starts, so join-row ids follow document order. Groups
    /// without statements are left out.
    pub fn profile_groups(&mut self, profiles: &[Profile]) -> Result<Vec<CommandGroup>> {
        let tables: [(&'static str, TableBuilder<'a>); 23] = [
            ("DVD", Self::dvd),
            ("DVDId", Self::dvd_id),
            ("Review", Self::review),
            ("LoanInfo", Self::loan_info),
            ("Features", Self::features),
            ("Format", Self::format),
            ("Purchase", Self::purchase),
            ("Lock", Self::lock),
            ("DVDxMediaType", Self::media_types),
            ("DVDxGenre", Self::genres),
            ("DVDxRegion", Self::regions),
            ("DVDxStudio", Self::studios),
            ("DVDxMediaCompany", Self::media_companies),
            ("DVDxAudio", Self::audio),
            ("DVDxSubtitle", Self::subtitles),
            ("DVDxCast", Self::cast),
            ("DVDxCrew", Self::crew),
            ("DVDxDisc", Self::discs),
            ("DVDxEvent", Self::events),
            ("DVDxTag", Self::tags),
            ("DVDxMyLinks", Self::links),
            ("DVDxPlugin", Self::plugins),
            ("DVDxCountryOfOrigin", Self::countries),
        ];

        let mut buffers: Vec<Vec<String>> = vec![Vec::new(); tables.len()];
        for profile in profiles.iter().filter(|p| p.is_valid()) {
            for ((_, build), out) in tables.iter().zip(buffers.iter_mut()) {
                build(self, profile, out)?;
            }
        }

        Ok(tables
            .iter()
            .zip(buffers)
            .filter(|(_, statements)| !statements.is_empty())
            .map(|((section, _), statements)| CommandGroup::new(*section, statements))
            .collect())
    }

    fn insert(&self, table: &'static str) -> Insert {
        Insert::new(table, self.dialect)
    }

    fn dvd(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        let row = self
            .insert("tDVD")
            .text(&p.id)
            .opt_text(&p.upc)
            .opt_text(&p.collection_number)
            .opt_id(reg.collection_types.lookup_optional_text(&p.collection_type.value)?)
            .text(&p.title)
            .opt_text(&p.edition)
            .opt_text(&p.original_title)
            .nonzero(p.production_year)
            .date(p.released)
            .nonzero(p.running_time)
            .opt_text(&p.rating)
            .opt_id(reg.case_types.lookup_optional_text(&p.case_type)?)
            .opt_boolean(p.case_slip_cover)
            .null()
            .price(&p.srp)
            .opt_text(&p.overview)
            .opt_text(&p.easter_eggs)
            .opt_text(&p.sort_title)
            .date_time(p.last_edited)
            .int(p.wish_priority)
            .opt_text(&p.notes);
        out.push(row.finish());
        Ok(())
    }

    fn dvd_id(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        let row = self
            .insert("tDVDId")
            .text(&p.id)
            .text(&p.id_base)
            .positive(p.id_variant_num)
            .positive(p.id_locality_id)
            .opt_id(reg.localities.lookup_optional_text(&p.id_locality_desc)?)
            .id(reg.id_types.lookup(&p.id_type)?);
        out.push(row.finish());
        Ok(())
    }

    fn review(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let r = &p.review;
        let row = self
            .insert("tReview")
            .text(&p.id)
            .int(r.film)
            .int(r.video)
            .int(r.audio)
            .int(r.extras);
        out.push(row.finish());
        Ok(())
    }

    fn loan_info(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let user_id = match &p.loan.user {
            Some(user) => self.registry.user_id(user)?,
            None => None,
        };
        let row = self
            .insert("tLoanInfo")
            .text(&p.id)
            .boolean(p.loan.loaned)
            .date(p.loan.due)
            .opt_id(user_id);
        out.push(row.finish());
        Ok(())
    }

    fn features(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let row = p
            .features
            .flags
            .iter()
            .fold(self.insert("tFeatures").text(&p.id), |row, flag| {
                row.boolean(*flag)
            })
            .opt_text(&p.features.other);
        out.push(row.finish());
        Ok(())
    }

    fn format(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let f = &p.format;
        let range = f.dynamic_range.as_ref();
        let row = self
            .insert("tFormat")
            .text(&p.id)
            .opt_text(&f.aspect_ratio)
            .id(self.registry.video_standards.lookup(&f.video_standard)?)
            .boolean(f.letter_box)
            .boolean(f.pan_and_scan)
            .boolean(f.full_frame)
            .boolean(f.enhanced_16x9)
            .boolean(f.dual_sided)
            .boolean(f.dual_layered)
            .boolean(f.color)
            .boolean(f.black_and_white)
            .boolean(f.colorized)
            .boolean(f.mixed)
            .boolean(f.dim_2d)
            .boolean(f.dim_3d_anaglyph)
            .boolean(f.dim_3d_blu_ray)
            .opt_boolean(range.map(|r| r.hdr10))
            .opt_boolean(range.map(|r| r.dolby_vision));
        out.push(row.finish());
        Ok(())
    }

    fn purchase(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let info = &p.purchase;
        let giver = match info.gift_user() {
            Some(user) => self.registry.user_id(&user)?,
            None => None,
        };
        let row = self
            .insert("tPurchase")
            .text(&p.id)
            .price(&info.price)
            .opt_text(&info.place)
            .opt_text(&info.place_type)
            .opt_text(&info.website)
            .date(info.date)
            .boolean(info.received_as_gift)
            .opt_id(giver);
        out.push(row.finish());
        Ok(())
    }

    fn lock(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let Some(locks) = &p.locks else {
            return Ok(());
        };
        let row = locks
            .flags
            .iter()
            .fold(self.insert("tLock").text(&p.id), |row, flag| row.boolean(*flag));
        out.push(row.finish());
        Ok(())
    }

    /// `(fresh id, profile id, fk)` rows for a list of simple category values.
    fn joins<'v>(
        &mut self,
        table: &'static str,
        profile: &Profile,
        lookup: &InternTable<String>,
        values: impl IntoIterator<Item = &'v str>,
        out: &mut Vec<String>,
    ) -> Result<()> {
        for value in values {
            if value.is_empty() {
                continue;
            }
            let fk = lookup.lookup_text(value)?;
            let row = self
                .insert(table)
                .id(self.counter.next_id())
                .text(&profile.id)
                .id(fk);
            out.push(row.finish());
        }
        Ok(())
    }

    fn media_types(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let Some(media_types) = &p.media_types else {
            return Ok(());
        };
        let reg = self.registry;
        self.joins("tDVDxMediaType", p, &reg.media_types, media_types.labels(), out)
    }

    fn genres(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        self.joins("tDVDxGenre", p, &reg.genres, p.genres.iter().map(String::as_str), out)
    }

    fn regions(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        for region in p.regions.iter().filter(|r| !r.is_empty()) {
            let row = self
                .insert("tDVDxRegion")
                .id(self.counter.next_id())
                .text(&p.id)
                .text(region);
            out.push(row.finish());
        }
        Ok(())
    }

    fn studios(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        self.joins("tDVDxStudio", p, &reg.studios, p.studios.iter().map(String::as_str), out)
    }

    fn media_companies(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        self.joins(
            "tDVDxMediaCompany",
            p,
            &reg.studios,
            p.media_companies.iter().map(String::as_str),
            out,
        )
    }

    fn audio(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        for track in &p.audio {
            let row = self
                .insert("tDVDxAudio")
                .id(self.counter.next_id())
                .text(&p.id)
                .opt_id(reg.audio_contents.lookup_optional_text(&track.content)?)
                .opt_id(reg.audio_formats.lookup_optional_text(&track.format)?)
                .opt_id(reg.audio_channels.lookup_optional_text(&track.channels)?);
            out.push(row.finish());
        }
        Ok(())
    }

    fn subtitles(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        self.joins(
            "tDVDxSubtitle",
            p,
            &reg.subtitles,
            p.subtitles.iter().map(String::as_str),
            out,
        )
    }

    fn discs(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        for disc in &p.discs {
            let row = self
                .insert("tDVDxDisc")
                .id(self.counter.next_id())
                .text(&p.id)
                .opt_text(&disc.description_side_a)
                .opt_text(&disc.description_side_b)
                .opt_text(&disc.disc_id_side_a)
                .opt_text(&disc.disc_id_side_b)
                .opt_text(&disc.label_side_a)
                .opt_text(&disc.label_side_b)
                .boolean(disc.dual_layered_side_a)
                .boolean(disc.dual_layered_side_b)
                .boolean(disc.dual_sided)
                .opt_text(&disc.location)
                .opt_text(&disc.slot);
            out.push(row.finish());
        }
        Ok(())
    }

    fn events(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        for event in &p.events {
            let row = self
                .insert("tDVDxEvent")
                .id(self.counter.next_id())
                .text(&p.id)
                .id(reg.event_types.lookup(&event.kind)?)
                .date_time(event.timestamp)
                .opt_text(&event.note)
                .opt_id(reg.user_id(&event.user)?);
            out.push(row.finish());
        }
        Ok(())
    }

    fn tags(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        for tag in &p.tags {
            let row = self
                .insert("tDVDxTag")
                .id(self.counter.next_id())
                .text(&p.id)
                .id(reg.tags.lookup(&TagKey::of(tag))?);
            out.push(row.finish());
        }
        Ok(())
    }

    fn links(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        for link in &p.links {
            let row = self
                .insert("tDVDxMyLinks")
                .id(self.counter.next_id())
                .text(&p.id)
                .text(&link.url)
                .opt_text(&link.description)
                .id(reg.link_categories.lookup(&link.category)?);
            out.push(row.finish());
        }
        Ok(())
    }

    /// The association row, then the decoded row when the kind is known.
    fn plugins(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        for plugin in &p.plugins {
            let data: String = plugin
                .blocks
                .iter()
                .filter(|b| !b.is_empty())
                .map(|b| format!("{b}\n"))
                .collect();
            let row = self
                .insert("tDVDxPluginData")
                .id(self.counter.next_id())
                .text(&p.id)
                .id(reg.plugins.lookup(&PluginKey::of(plugin))?)
                .opt_text(&data);
            out.push(row.finish());

            let kind = self.plugin_ids.classify(&plugin.class_id);
            if let Some(row) = PluginBlock::decode(kind, plugin)?.row(&p.id, self.dialect) {
                out.push(row);
            }
        }
        Ok(())
    }

    fn countries(&mut self, p: &Profile, out: &mut Vec<String>) -> Result<()> {
        let reg = self.registry;
        self.joins(
            "tDVDxCountryOfOrigin",
            p,
            &reg.countries,
            p.countries_of_origin.iter().map(String::as_str),
            out,
        )
    }
}

/// `(Id, Value)` rows for a lookup table.
fn value_rows<K, V>(
    table: &InternTable<K, V>,
    name: &'static str,
    dialect: Dialect,
    value: impl Fn(&K) -> &str,
) -> Vec<String>
where
    K: Eq + Hash + Debug,
{
    table
        .iter()
        .map(|(key, id, _)| Insert::new(name, dialect).id(id).text(value(key)).finish())
        .collect()
}
