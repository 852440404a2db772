//! Collection document loader.

use crate::error::ConvertError;
use crate::model::*;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;

pub fn load_collection(path: &Path) -> Result<Collection, ConvertError> {
    read_collection(path).map_err(|source| ConvertError::Source {
        path: path.to_path_buf(),
        source,
    })
}

fn read_collection(path: &Path) -> anyhow::Result<Collection> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_collection(&text)
}

pub fn parse_collection(xml: &str) -> anyhow::Result<Collection> {
    let doc = parse_document(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "Collection" {
        bail!(
            "expected <Collection> root element, found <{}>",
            root.tag_name().name()
        );
    }

    let mut profiles = Vec::new();
    for (index, node) in elements(root, "DVD").enumerate() {
        let profile = parse_profile(xml, node).with_context(|| {
            let id = child_text(node, "ID");
            format!("profile #{} (ID {:?})", index + 1, id)
        })?;
        profiles.push(profile);
    }
    Ok(Collection { profiles })
}

pub(crate) fn parse_document(xml: &str) -> anyhow::Result<Document<'_>> {
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, opts).context("malformed XML")
}

fn parse_profile(xml: &str, dvd: Node) -> anyhow::Result<Profile> {
    let collection_type = child(dvd, "CollectionType")
        .map(|n| -> anyhow::Result<CollectionType> {
            Ok(CollectionType {
                value: node_text(n),
                is_part_of_owned_collection: bool_attr(n, "IsPartOfOwnedCollection")?,
            })
        })
        .transpose()?
        .unwrap_or_default();

    let id_type = match child_text(dvd, "ID_Type").as_str() {
        "" => IdType::default(),
        s => IdType::from_wire(s).ok_or_else(|| anyhow!("unknown ID_Type {s:?}"))?,
    };

    let srp = child(dvd, "SRP").map(parse_price).transpose()?.unwrap_or_default();

    let last_edited = match child(dvd, "LastEdited") {
        Some(n) if !node_text(n).is_empty() => {
            parse_date_time(&node_text(n)).context("LastEdited")?
        }
        _ => NaiveDateTime::default(),
    };

    Ok(Profile {
        id: child_text(dvd, "ID"),
        id_base: child_text(dvd, "ID_Base"),
        id_variant_num: child_int(dvd, "ID_VariantNum")?,
        id_locality_id: child_int(dvd, "ID_LocalityID")?,
        id_locality_desc: child_text(dvd, "ID_LocalityDesc"),
        id_type,
        upc: child_text(dvd, "UPC"),
        collection_number: child_text(dvd, "CollectionNumber"),
        collection_type,
        title: child_text(dvd, "Title"),
        edition: child_text(dvd, "DistTrait"),
        original_title: child_text(dvd, "OriginalTitle"),
        countries_of_origin: [
            child_text(dvd, "CountryOfOrigin"),
            child_text(dvd, "CountryOfOrigin2"),
            child_text(dvd, "CountryOfOrigin3"),
        ],
        production_year: child_int(dvd, "ProductionYear")?,
        released: child_date(dvd, "Released")?,
        running_time: child_int(dvd, "RunningTime")?,
        rating: child_text(dvd, "Rating"),
        case_type: child_text(dvd, "CaseType"),
        case_slip_cover: match child(dvd, "CaseSlipCover") {
            Some(n) => Some(parse_bool(&node_text(n)).context("CaseSlipCover")?),
            None => None,
        },
        srp,
        overview: child_text(dvd, "Overview"),
        easter_eggs: child_text(dvd, "EasterEggs"),
        sort_title: child_text(dvd, "SortTitle"),
        last_edited,
        wish_priority: child_int(dvd, "WishPriority")?,
        notes: child_text(dvd, "Notes"),
        media_types: child(dvd, "MediaTypes").map(parse_media_types).transpose()?,
        genres: list_texts(dvd, "Genres", "Genre"),
        regions: list_texts(dvd, "Regions", "Region"),
        format: child(dvd, "Format")
            .map(parse_format)
            .transpose()?
            .unwrap_or_default(),
        features: child(dvd, "Features")
            .map(parse_features)
            .transpose()?
            .unwrap_or_default(),
        studios: list_texts(dvd, "Studios", "Studio"),
        media_companies: list_texts(dvd, "MediaCompanies", "MediaCompany"),
        audio: list(dvd, "Audio", "AudioTrack")
            .map(|n| AudioTrack {
                content: child_text(n, "AudioContent"),
                format: child_text(n, "AudioFormat"),
                channels: child_text(n, "AudioChannels"),
            })
            .collect(),
        subtitles: list_texts(dvd, "Subtitles", "Subtitle"),
        cast: parse_cast(dvd)?,
        crew: parse_crew(dvd)?,
        review: child(dvd, "Review")
            .map(parse_review)
            .transpose()?
            .unwrap_or_default(),
        discs: list(dvd, "Disks", "Disk")
            .map(parse_disc)
            .collect::<anyhow::Result<_>>()?,
        locks: child(dvd, "Locks").map(parse_locks).transpose()?,
        purchase: child(dvd, "PurchaseInfo")
            .map(parse_purchase)
            .transpose()?
            .unwrap_or_default(),
        events: list(dvd, "Events", "Event")
            .map(parse_event)
            .collect::<anyhow::Result<_>>()?,
        tags: list(dvd, "Tags", "Tag")
            .map(|n| Tag {
                name: attr(n, "Name"),
                full_name: attr(n, "FullName"),
            })
            .collect(),
        loan: child(dvd, "LoanInfo")
            .map(parse_loan)
            .transpose()?
            .unwrap_or_default(),
        links: parse_links(dvd)?,
        plugins: list(dvd, "PluginCustomData", "PluginData")
            .map(|n| PluginData {
                class_id: attr(n, "ClassID"),
                name: attr(n, "Name"),
                blocks: n
                    .children()
                    .filter(|c| c.is_element())
                    .map(|c| xml[c.range()].to_string())
                    .collect(),
            })
            .collect(),
        box_set: child(dvd, "BoxSet")
            .map(|n| BoxSet {
                parent: child_text(n, "Parent"),
                contents: list_texts(n, "Contents", "Content"),
            })
            .unwrap_or_default(),
    })
}

fn parse_media_types(node: Node) -> anyhow::Result<MediaTypes> {
    Ok(MediaTypes {
        dvd: child_bool(node, "DVD")?,
        hd_dvd: child_bool(node, "HDDVD")?,
        blu_ray: child_bool(node, "BluRay")?,
        ultra_hd: child_bool(node, "UltraHD")?,
        custom: child_text(node, "CustomMediaType"),
    })
}

fn parse_format(node: Node) -> anyhow::Result<Format> {
    let video_standard = match child_text(node, "FormatVideoStandard").as_str() {
        "" => VideoStandard::default(),
        s => VideoStandard::from_wire(s)
            .ok_or_else(|| anyhow!("unknown FormatVideoStandard {s:?}"))?,
    };
    let colors = child(node, "FormatColor");
    let dims = child(node, "Dimensions");
    let dynamic_range = child(node, "DynamicRange")
        .map(|n| -> anyhow::Result<DynamicRange> {
            Ok(DynamicRange {
                hdr10: child_bool(n, "DRHDR10")?,
                dolby_vision: child_bool(n, "DRDolbyVision")?,
            })
        })
        .transpose()?;

    Ok(Format {
        aspect_ratio: child_text(node, "FormatAspectRatio"),
        video_standard,
        letter_box: child_bool(node, "FormatLetterBox")?,
        pan_and_scan: child_bool(node, "FormatPanAndScan")?,
        full_frame: child_bool(node, "FormatFullFrame")?,
        enhanced_16x9: child_bool(node, "Format16X9")?,
        dual_sided: child_bool(node, "FormatDualSided")?,
        dual_layered: child_bool(node, "FormatDualLayered")?,
        color: opt_child_bool(colors, "ClrColor")?,
        black_and_white: opt_child_bool(colors, "ClrBlackAndWhite")?,
        colorized: opt_child_bool(colors, "ClrColorized")?,
        mixed: opt_child_bool(colors, "ClrMixed")?,
        dim_2d: opt_child_bool(dims, "Dim2D")?,
        dim_3d_anaglyph: opt_child_bool(dims, "Dim3DAnaglyph")?,
        dim_3d_blu_ray: opt_child_bool(dims, "Dim3DBluRay")?,
        dynamic_range,
    })
}

fn parse_features(node: Node) -> anyhow::Result<Features> {
    let mut features = Features {
        other: child_text(node, "OtherFeatures"),
        ..Features::default()
    };
    for (slot, name) in features.flags.iter_mut().zip(FEATURE_FLAGS) {
        *slot = child_bool(node, name)?;
    }
    Ok(features)
}

fn parse_locks(node: Node) -> anyhow::Result<Locks> {
    let mut locks = Locks::default();
    for (slot, name) in locks.flags.iter_mut().zip(LOCK_FLAGS) {
        *slot = child_bool(node, name)?;
    }
    Ok(locks)
}

fn parse_review(node: Node) -> anyhow::Result<Review> {
    Ok(Review {
        film: int_attr(node, "Film")?,
        video: int_attr(node, "Video")?,
        audio: int_attr(node, "Audio")?,
        extras: int_attr(node, "Extras")?,
    })
}

fn parse_person(node: Node) -> anyhow::Result<Person> {
    Ok(Person {
        first_name: attr(node, "FirstName"),
        middle_name: attr(node, "MiddleName"),
        last_name: attr(node, "LastName"),
        birth_year: int_attr(node, "BirthYear")?,
    })
}

fn parse_divider(node: Node) -> anyhow::Result<Divider> {
    let kind = match node.attribute("Type") {
        None | Some("") => DividerKind::default(),
        Some(s) => DividerKind::from_wire(s).ok_or_else(|| anyhow!("unknown divider type {s:?}"))?,
    };
    Ok(Divider {
        caption: attr(node, "Caption"),
        kind,
    })
}

fn parse_cast(dvd: Node) -> anyhow::Result<Vec<CastEntry>> {
    let Some(actors) = child(dvd, "Actors") else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for node in actors.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "Actor" => out.push(CastEntry::Member(CastMember {
                person: parse_person(node)?,
                role: attr(node, "Role"),
                credited_as: attr(node, "CreditedAs"),
                voice: bool_attr(node, "Voice")?,
                uncredited: bool_attr(node, "Uncredited")?,
                puppeteer: bool_attr(node, "Puppeteer")?,
            })),
            "Divider" => out.push(CastEntry::Divider(parse_divider(node)?)),
            other => bail!("unexpected <{other}> in Actors"),
        }
    }
    Ok(out)
}

fn parse_crew(dvd: Node) -> anyhow::Result<Vec<CrewEntry>> {
    let Some(credits) = child(dvd, "Credits") else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for node in credits.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "Credit" => out.push(CrewEntry::Member(CrewMember {
                person: parse_person(node)?,
                credit_type: attr(node, "CreditType"),
                credit_subtype: attr(node, "CreditSubtype"),
                credited_as: attr(node, "CreditedAs"),
                custom_role: node.attribute("CustomRole").map(str::to_string),
            })),
            "Divider" => out.push(CrewEntry::Divider(parse_divider(node)?)),
            other => bail!("unexpected <{other}> in Credits"),
        }
    }
    Ok(out)
}

fn parse_disc(node: Node) -> anyhow::Result<Disc> {
    Ok(Disc {
        description_side_a: child_text(node, "DescriptionSideA"),
        description_side_b: child_text(node, "DescriptionSideB"),
        disc_id_side_a: child_text(node, "DiscIDSideA"),
        disc_id_side_b: child_text(node, "DiscIDSideB"),
        label_side_a: child_text(node, "LabelSideA"),
        label_side_b: child_text(node, "LabelSideB"),
        dual_layered_side_a: child_bool(node, "DualLayeredSideA")?,
        dual_layered_side_b: child_bool(node, "DualLayeredSideB")?,
        dual_sided: child_bool(node, "DualSided")?,
        location: child_text(node, "Location"),
        slot: child_text(node, "Slot"),
    })
}

fn parse_user(node: Node) -> User {
    User {
        first_name: attr(node, "FirstName"),
        last_name: attr(node, "LastName"),
        email: attr(node, "EmailAddress"),
        phone: attr(node, "PhoneNumber"),
    }
}

fn parse_purchase(node: Node) -> anyhow::Result<PurchaseInfo> {
    Ok(PurchaseInfo {
        price: child(node, "PurchasePrice")
            .map(parse_price)
            .transpose()?
            .unwrap_or_default(),
        place: child_text(node, "PurchasePlace"),
        place_type: child_text(node, "PurchasePlaceType"),
        website: child_text(node, "PurchasePlaceWebsite"),
        date: child_date(node, "PurchaseDate")?,
        received_as_gift: child_bool(node, "ReceivedAsGift")?,
        gift_from: child(node, "GiftFrom").map(|n| GiftFrom {
            first_name: attr(n, "FirstName"),
            last_name: attr(n, "LastName"),
        }),
    })
}

fn parse_event(node: Node) -> anyhow::Result<Event> {
    let kind_text = child_text(node, "EventType");
    let kind = EventType::from_wire(&kind_text)
        .ok_or_else(|| anyhow!("unknown EventType {kind_text:?}"))?;
    let timestamp = parse_date_time(&child_text(node, "Timestamp")).context("event Timestamp")?;
    Ok(Event {
        kind,
        timestamp,
        note: child_text(node, "Note"),
        user: child(node, "User").map(parse_user).unwrap_or_default(),
    })
}

fn parse_loan(node: Node) -> anyhow::Result<LoanInfo> {
    Ok(LoanInfo {
        loaned: child_bool(node, "Loaned")?,
        due: child_date(node, "Due")?,
        user: child(node, "User").map(parse_user),
    })
}

fn parse_links(dvd: Node) -> anyhow::Result<Vec<UserLink>> {
    let Some(links) = child(dvd, "MyLinks") else {
        return Ok(Vec::new());
    };
    list(links, "UserLinks", "UserLink")
        .map(|n| {
            let category = match n.attribute("Category") {
                None | Some("") => LinkCategory::default(),
                Some(s) => LinkCategory::from_wire(s)
                    .ok_or_else(|| anyhow!("unknown link category {s:?}"))?,
            };
            Ok(UserLink {
                url: attr(n, "URL"),
                description: attr(n, "Description"),
                category,
            })
        })
        .collect()
}

pub(crate) fn parse_price(node: Node) -> anyhow::Result<Price> {
    let text = node_text(node);
    let value = if text.is_empty() {
        0.0
    } else {
        text.parse::<f64>()
            .with_context(|| format!("invalid price {text:?}"))?
    };
    Ok(Price {
        denomination: attr(node, "DenominationType"),
        value,
    })
}

pub(crate) fn parse_bool(text: &str) -> anyhow::Result<bool> {
    match text.trim() {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" | "" => Ok(false),
        other => bail!("invalid boolean {other:?}"),
    }
}

fn parse_int(text: &str) -> anyhow::Result<i32> {
    let t = text.trim();
    if t.is_empty() {
        return Ok(0);
    }
    t.parse::<i32>()
        .with_context(|| format!("invalid number {t:?}"))
}

/// `xs:date`, tolerating a time part.
pub(crate) fn parse_date(text: &str) -> anyhow::Result<NaiveDate> {
    let t = text.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(d);
    }
    parse_date_time(t).map(|dt| dt.date())
}

/// `xs:dateTime` with optional fraction and zone, or a bare `xs:date`.
pub(crate) fn parse_date_time(text: &str) -> anyhow::Result<NaiveDateTime> {
    let t = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Ok(dt.naive_local());
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::default()));
    }
    bail!("invalid date {t:?}")
}

pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

pub(crate) fn elements<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn list<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    wrapper: &'a str,
    item: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    child(node, wrapper)
        .into_iter()
        .flat_map(move |w| elements(w, item))
}

fn list_texts(node: Node, wrapper: &str, item: &str) -> Vec<String> {
    list(node, wrapper, item).map(node_text).collect()
}

pub(crate) fn node_text(node: Node) -> String {
    node.text().unwrap_or("").to_string()
}

pub(crate) fn child_text(node: Node, name: &str) -> String {
    child(node, name).map(node_text).unwrap_or_default()
}

fn child_int(node: Node, name: &str) -> anyhow::Result<i32> {
    parse_int(&child_text(node, name)).with_context(|| name.to_string())
}

pub(crate) fn child_bool(node: Node, name: &str) -> anyhow::Result<bool> {
    parse_bool(&child_text(node, name)).with_context(|| name.to_string())
}

fn opt_child_bool(node: Option<Node>, name: &str) -> anyhow::Result<bool> {
    match node {
        Some(n) => child_bool(n, name),
        None => Ok(false),
    }
}

fn child_date(node: Node, name: &str) -> anyhow::Result<Option<NaiveDate>> {
    let text = child_text(node, name);
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_date(&text).map(Some).with_context(|| name.to_string())
}

pub(crate) fn attr(node: Node, name: &str) -> String {
    node.attribute(name).unwrap_or("").to_string()
}

pub(crate) fn bool_attr(node: Node, name: &str) -> anyhow::Result<bool> {
    parse_bool(node.attribute(name).unwrap_or("")).with_context(|| format!("@{name}"))
}

fn int_attr(node: Node, name: &str) -> anyhow::Result<i32> {
    parse_int(node.attribute(name).unwrap_or("")).with_context(|| format!("@{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn parses_small_fixture() {
        let c = load_collection(&fixture_path("collection_small.xml")).expect("load fixture");
        assert_eq!(c.profiles.len(), 4);

        let first = &c.profiles[0];
        assert_eq!(first.id, "025192018828.4");
        assert_eq!(first.title, "The Hitchhiker's Guide");
        assert_eq!(first.id_type, IdType::Upc);
        assert_eq!(first.production_year, 0);
        assert_eq!(first.released, NaiveDate::from_ymd_opt(2005, 9, 13));
        assert!(first.collection_type.is_part_of_owned_collection);
        assert_eq!(first.srp.denomination, "USD");
        assert_eq!(first.srp.value, 29.98);
        assert!(first.features.flag("FeatureCommentary"));
        assert!(!first.features.flag("FeatureGame"));
        assert!(first.format.dynamic_range.is_none());

        assert_eq!(first.cast.len(), 5);
        assert!(matches!(
            &first.cast[1],
            CastEntry::Divider(Divider { kind: DividerKind::Episode, caption }) if caption == "E1"
        ));
        let CrewEntry::Member(director) = &first.crew[0] else {
            panic!("expected a crew member first");
        };
        assert_eq!(director.custom_role, None);
        let CrewEntry::Member(custom) = &first.crew[1] else {
            panic!("expected a crew member second");
        };
        assert_eq!(custom.custom_role.as_deref(), Some("Consultant"));

        assert_eq!(first.plugins.len(), 2);
        assert_eq!(first.plugins[0].blocks.len(), 1);
        assert!(first.plugins[0].blocks[0].starts_with("<EnhancedNotes"));
        assert!(first.plugins[0].blocks[0].ends_with("</EnhancedNotes>"));

        assert!(!c.profiles[2].is_valid());
        assert_eq!(c.profiles[3].box_set.contents.len(), 2);
    }

    #[test]
    fn unknown_enum_names_fail() {
        let xml = r#"<Collection><DVD><ID>1</ID><ID_Type>Barcode</ID_Type></DVD></Collection>"#;
        let err = parse_collection(xml).unwrap_err();
        assert!(format!("{err:#}").contains("ID_Type"));
    }

    #[test]
    fn bad_numbers_fail() {
        let xml = r#"<Collection><DVD><ID>1</ID><RunningTime>ninety</RunningTime></DVD></Collection>"#;
        let err = parse_collection(xml).unwrap_err();
        assert!(format!("{err:#}").contains("RunningTime"));
    }

    #[test]
    fn wrong_root_fails() {
        assert!(parse_collection("<Profiles/>").is_err());
        assert!(parse_collection("<Collection>").is_err());
    }

    #[test]
    fn date_forms() {
        assert_eq!(
            parse_date_time("2010-04-02T21:07:05").unwrap(),
            NaiveDate::from_ymd_opt(2010, 4, 2)
                .unwrap()
                .and_hms_opt(21, 7, 5)
                .unwrap()
        );
        assert_eq!(
            parse_date_time("2010-04-02T21:07:05.123+02:00").unwrap().date(),
            NaiveDate::from_ymd_opt(2010, 4, 2).unwrap()
        );
        assert_eq!(
            parse_date("2010-04-02T00:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2010, 4, 2).unwrap()
        );
        assert!(parse_date("02/04/2010").is_err());
    }
}
