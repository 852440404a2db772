//! First pass: discover every reference entity and give it an id.

use crate::error::Result;
use crate::intern::{IdCounter, InternTable};
use crate::keys::{PersonKey, PluginKey, TagKey, UserKey};
use crate::model::{
    CastEntry, Collection, CrewEntry, EventType, IdType, LinkCategory, Person, Profile, Tag, User,
    VideoStandard,
};
use std::collections::HashSet;

/// Every interning table of a run. Read-only once scanning is done.
#[derive(Debug, Clone)]
pub struct Registry {
    pub id_types: InternTable<IdType>,
    pub event_types: InternTable<EventType>,
    pub video_standards: InternTable<VideoStandard>,
    pub link_categories: InternTable<LinkCategory>,
    pub localities: InternTable<String>,
    /// Value → "is part of owned collection", first seen.
    pub collection_types: InternTable<String, bool>,
    pub persons: InternTable<PersonKey, Person>,
    pub users: InternTable<UserKey, User>,
    /// Studios and media companies share one id space.
    pub studios: InternTable<String>,
    pub tags: InternTable<TagKey, Tag>,
    pub audio_contents: InternTable<String>,
    pub audio_formats: InternTable<String>,
    pub audio_channels: InternTable<String>,
    pub case_types: InternTable<String>,
    pub genres: InternTable<String>,
    pub subtitles: InternTable<String>,
    pub media_types: InternTable<String>,
    pub countries: InternTable<String>,
    /// Class id → display name, first seen.
    pub plugins: InternTable<PluginKey, String>,
    /// Identifiers of every profile that takes part in the output.
    pub valid_ids: HashSet<String>,
}

impl Registry {
    /// Closed enum sets are interned up front so their ids come first.
    pub fn new(counter: &mut IdCounter) -> Result<Self> {
        Ok(Self {
            id_types: InternTable::from_closed_set("id type", IdType::ALL.iter().copied(), counter)?,
            event_types: InternTable::from_closed_set(
                "event type",
                EventType::ALL.iter().copied(),
                counter,
            )?,
            video_standards: InternTable::from_closed_set(
                "video standard",
                VideoStandard::ALL.iter().copied(),
                counter,
            )?,
            link_categories: InternTable::from_closed_set(
                "link category",
                LinkCategory::ALL.iter().copied(),
                counter,
            )?,
            localities: InternTable::new("locality"),
            collection_types: InternTable::new("collection type"),
            persons: InternTable::new("cast and crew"),
            users: InternTable::new("user"),
            studios: InternTable::new("studio or media company"),
            tags: InternTable::new("tag"),
            audio_contents: InternTable::new("audio content"),
            audio_formats: InternTable::new("audio format"),
            audio_channels: InternTable::new("audio channels"),
            case_types: InternTable::new("case type"),
            genres: InternTable::new("genre"),
            subtitles: InternTable::new("subtitle"),
            media_types: InternTable::new("media type"),
            countries: InternTable::new("country of origin"),
            plugins: InternTable::new("plugin"),
            valid_ids: HashSet::new(),
        })
    }

    pub fn user_id(&self, user: &User) -> Result<Option<i64>> {
        if !user.is_nameable() {
            return Ok(None);
        }
        self.users.lookup(&UserKey::of(user)).map(Some)
    }

    /// Entity counts per kind, in table order.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            (self.localities.kind(), self.localities.len()),
            (self.id_types.kind(), self.id_types.len()),
            (self.audio_channels.kind(), self.audio_channels.len()),
            (self.audio_contents.kind(), self.audio_contents.len()),
            (self.audio_formats.kind(), self.audio_formats.len()),
            (self.case_types.kind(), self.case_types.len()),
            (self.collection_types.kind(), self.collection_types.len()),
            (self.event_types.kind(), self.event_types.len()),
            (self.video_standards.kind(), self.video_standards.len()),
            (self.genres.kind(), self.genres.len()),
            (self.subtitles.kind(), self.subtitles.len()),
            (self.media_types.kind(), self.media_types.len()),
            (self.persons.kind(), self.persons.len()),
            (self.link_categories.kind(), self.link_categories.len()),
            (self.countries.kind(), self.countries.len()),
            (self.users.kind(), self.users.len()),
            (self.studios.kind(), self.studios.len()),
            (self.tags.kind(), self.tags.len()),
            (self.plugins.kind(), self.plugins.len()),
        ]
    }
}

pub struct Scanner<'a> {
    registry: &'a mut Registry,
    counter: &'a mut IdCounter,
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a mut Registry, counter: &'a mut IdCounter) -> Self {
        Self { registry, counter }
    }

    /// Both passes. The gift pass runs only after every profile has been seen.
    pub fn scan(mut self, collection: &Collection) -> Result<()> {
        for profile in collection.profiles.iter().filter(|p| p.is_valid()) {
            self.registry.valid_ids.insert(profile.id.clone());
            self.scan_profile(profile)?;
        }
        for profile in collection.profiles.iter().filter(|p| p.is_valid()) {
            if let Some(giver) = profile.purchase.gift_user() {
                self.user(&giver)?;
            }
        }
        Ok(())
    }

    fn scan_profile(&mut self, profile: &Profile) -> Result<()> {
        let reg = &mut *self.registry;
        let counter = &mut *self.counter;

        reg.localities
            .intern_text(&profile.id_locality_desc, (), counter)?;
        reg.collection_types.intern_text(
            &profile.collection_type.value,
            profile.collection_type.is_part_of_owned_collection,
            counter,
        )?;

        for entry in &profile.cast {
            if let CastEntry::Member(member) = entry {
                self.person(&member.person)?;
            }
        }
        for entry in &profile.crew {
            if let CrewEntry::Member(member) = entry {
                self.person(&member.person)?;
            }
        }

        if let Some(user) = &profile.loan.user {
            self.user(user)?;
        }
        for event in &profile.events {
            self.user(&event.user)?;
        }

        let reg = &mut *self.registry;
        let counter = &mut *self.counter;
        for studio in profile.studios.iter().chain(&profile.media_companies) {
            reg.studios.intern_text(studio, (), counter)?;
        }
        for tag in &profile.tags {
            reg.tags.intern(TagKey::of(tag), tag.clone(), counter)?;
        }
        for track in &profile.audio {
            reg.audio_contents.intern_text(&track.content, (), counter)?;
            reg.audio_formats.intern_text(&track.format, (), counter)?;
            reg.audio_channels.intern_text(&track.channels, (), counter)?;
        }
        reg.case_types.intern_text(&profile.case_type, (), counter)?;
        for genre in &profile.genres {
            reg.genres.intern_text(genre, (), counter)?;
        }
        for subtitle in &profile.subtitles {
            reg.subtitles.intern_text(subtitle, (), counter)?;
        }
        if let Some(media_types) = &profile.media_types {
            for label in media_types.labels() {
                reg.media_types.intern_text(label, (), counter)?;
            }
        }
        for country in &profile.countries_of_origin {
            reg.countries.intern_text(country, (), counter)?;
        }
        for plugin in &profile.plugins {
            reg.plugins
                .intern(PluginKey::of(plugin), plugin.name.clone(), counter)?;
        }
        Ok(())
    }

    fn person(&mut self, person: &Person) -> Result<()> {
        self.registry
            .persons
            .intern(PersonKey::of(person), person.clone(), self.counter)?;
        Ok(())
    }

    fn user(&mut self, user: &User) -> Result<()> {
        if user.is_nameable() {
            self.registry
                .users
                .intern(UserKey::of(user), user.clone(), self.counter)?;
        }
        Ok(())
    }
}
