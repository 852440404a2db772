use chrono::{NaiveDate, NaiveDateTime};

/// In-memory view of one collection export.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub id: String,
    pub id_base: String,
    pub id_variant_num: i32,
    pub id_locality_id: i32,
    pub id_locality_desc: String,
    pub id_type: IdType,
    pub upc: String,
    pub collection_number: String,
    pub collection_type: CollectionType,
    pub title: String,
    pub edition: String,
    pub original_title: String,
    pub countries_of_origin: [String; 3],
    pub production_year: i32,
    pub released: Option<NaiveDate>,
    pub running_time: i32,
    pub rating: String,
    pub case_type: String,
    pub case_slip_cover: Option<bool>,
    pub srp: Price,
    pub overview: String,
    pub easter_eggs: String,
    pub sort_title: String,
    pub last_edited: NaiveDateTime,
    pub wish_priority: i32,
    pub notes: String,
    pub media_types: Option<MediaTypes>,
    pub genres: Vec<String>,
    pub regions: Vec<String>,
    pub format: Format,
    pub features: Features,
    pub studios: Vec<String>,
    pub media_companies: Vec<String>,
    pub audio: Vec<AudioTrack>,
    pub subtitles: Vec<String>,
    pub cast: Vec<CastEntry>,
    pub crew: Vec<CrewEntry>,
    pub review: Review,
    pub discs: Vec<Disc>,
    pub locks: Option<Locks>,
    pub purchase: PurchaseInfo,
    pub events: Vec<Event>,
    pub tags: Vec<Tag>,
    pub loan: LoanInfo,
    pub links: Vec<UserLink>,
    pub plugins: Vec<PluginData>,
    pub box_set: BoxSet,
}

impl Profile {
    /// Profiles without an identifier are invisible to every output table.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionType {
    pub value: String,
    pub is_part_of_owned_collection: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Price {
    pub denomination: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MediaTypes {
    pub dvd: bool,
    pub hd_dvd: bool,
    pub blu_ray: bool,
    pub ultra_hd: bool,
    pub custom: String,
}

pub const MEDIA_TYPE_DVD: &str = "DVD";
pub const MEDIA_TYPE_BLU_RAY: &str = "Blu-ray";
pub const MEDIA_TYPE_HD_DVD: &str = "HD-DVD";
pub const MEDIA_TYPE_ULTRA_HD: &str = "Ultra HD";

impl MediaTypes {
    /// Labels of every declared media type, fixed flags first, custom last.
    pub fn labels(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if self.dvd {
            out.push(MEDIA_TYPE_DVD);
        }
        if self.blu_ray {
            out.push(MEDIA_TYPE_BLU_RAY);
        }
        if self.hd_dvd {
            out.push(MEDIA_TYPE_HD_DVD);
        }
        if self.ultra_hd {
            out.push(MEDIA_TYPE_ULTRA_HD);
        }
        if !self.custom.is_empty() {
            out.push(self.custom.as_str());
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct Format {
    pub aspect_ratio: String,
    pub video_standard: VideoStandard,
    pub letter_box: bool,
    pub pan_and_scan: bool,
    pub full_frame: bool,
    pub enhanced_16x9: bool,
    pub dual_sided: bool,
    pub dual_layered: bool,
    pub color: bool,
    pub black_and_white: bool,
    pub colorized: bool,
    pub mixed: bool,
    pub dim_2d: bool,
    pub dim_3d_anaglyph: bool,
    pub dim_3d_blu_ray: bool,
    pub dynamic_range: Option<DynamicRange>,
}

#[derive(Debug, Clone, Default)]
pub struct DynamicRange {
    pub hdr10: bool,
    pub dolby_vision: bool,
}

/// Element names of the feature flags, in column order.
pub const FEATURE_FLAGS: [&str; 24] = [
    "FeatureSceneAccess",
    "FeatureCommentary",
    "FeatureTrailer",
    "FeaturePhotoGallery",
    "FeatureDeletedScenes",
    "FeatureMakingOf",
    "FeatureProductionNotes",
    "FeatureGame",
    "FeatureDVDROMContent",
    "FeatureMultiAngle",
    "FeatureMusicVideos",
    "FeatureInterviews",
    "FeatureStoryboardComparisons",
    "FeatureOuttakes",
    "FeatureClosedCaptioned",
    "FeatureTHXCertified",
    "FeaturePIP",
    "FeatureBDLive",
    "FeatureBonusTrailers",
    "FeatureDigitalCopy",
    "FeatureDBOX",
    "FeatureCineChat",
    "FeaturePlayAll",
    "FeatureMovieIQ",
];

#[derive(Debug, Clone, Default)]
pub struct Features {
    pub flags: [bool; FEATURE_FLAGS.len()],
    pub other: String,
}

impl Features {
    pub fn flag(&self, name: &str) -> bool {
        FEATURE_FLAGS
            .iter()
            .position(|f| *f == name)
            .map(|i| self.flags[i])
            .unwrap_or(false)
    }
}

/// Element names of the lock flags, in column order.
pub const LOCK_FLAGS: [&str; 22] = [
    "Entire",
    "Covers",
    "Title",
    "MediaType",
    "Overview",
    "Regions",
    "Genres",
    "SRP",
    "Studios",
    "DiscInformation",
    "Cast",
    "Crew",
    "Features",
    "AudioTracks",
    "Subtitles",
    "EasterEggs",
    "RunningTime",
    "ReleaseDate",
    "ProductionYear",
    "CaseType",
    "VideoFormats",
    "Rating",
];

#[derive(Debug, Clone, Default)]
pub struct Locks {
    pub flags: [bool; LOCK_FLAGS.len()],
}

#[derive(Debug, Clone, Default)]
pub struct AudioTrack {
    pub content: String,
    pub format: String,
    pub channels: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub birth_year: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CastMember {
    pub person: Person,
    pub role: String,
    pub credited_as: String,
    pub voice: bool,
    pub uncredited: bool,
    pub puppeteer: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CrewMember {
    pub person: Person,
    pub credit_type: String,
    pub credit_subtype: String,
    pub credited_as: String,
    pub custom_role: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DividerKind {
    #[default]
    Episode,
    Group,
    EndDiv,
}

impl DividerKind {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Episode" => Some(Self::Episode),
            "Group" => Some(Self::Group),
            "EndDiv" => Some(Self::EndDiv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Divider {
    pub caption: String,
    pub kind: DividerKind,
}

#[derive(Debug, Clone)]
pub enum CastEntry {
    Member(CastMember),
    Divider(Divider),
}

#[derive(Debug, Clone)]
pub enum CrewEntry {
    Member(CrewMember),
    Divider(Divider),
}

#[derive(Debug, Clone, Default)]
pub struct Review {
    pub film: i32,
    pub video: i32,
    pub audio: i32,
    pub extras: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Disc {
    pub description_side_a: String,
    pub description_side_b: String,
    pub disc_id_side_a: String,
    pub disc_id_side_b: String,
    pub label_side_a: String,
    pub label_side_b: String,
    pub dual_layered_side_a: bool,
    pub dual_layered_side_b: bool,
    pub dual_sided: bool,
    pub location: String,
    pub slot: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl User {
    /// A user with neither name is never interned.
    pub fn is_nameable(&self) -> bool {
        !self.first_name.is_empty() || !self.last_name.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GiftFrom {
    pub first_name: String,
    pub last_name: String,
}

impl GiftFrom {
    pub fn as_user(&self) -> User {
        User {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            ..User::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseInfo {
    pub price: Price,
    pub place: String,
    pub place_type: String,
    pub website: String,
    pub date: Option<NaiveDate>,
    pub received_as_gift: bool,
    pub gift_from: Option<GiftFrom>,
}

impl PurchaseInfo {
    /// The gift giver as a user, when it carries at least one name.
    pub fn gift_user(&self) -> Option<User> {
        let giver = self.gift_from.as_ref()?.as_user();
        giver.is_nameable().then_some(giver)
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventType,
    pub timestamp: NaiveDateTime,
    pub note: String,
    pub user: User,
}

#[derive(Debug, Clone, Default)]
pub struct LoanInfo {
    pub loaned: bool,
    pub due: Option<NaiveDate>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default)]
pub struct Tag {
    pub name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserLink {
    pub url: String,
    pub description: String,
    pub category: LinkCategory,
}

/// An opaque plugin-attached block. `blocks` holds the raw outer markup of
/// each child element, in document order.
#[derive(Debug, Clone, Default)]
pub struct PluginData {
    pub class_id: String,
    pub name: String,
    pub blocks: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BoxSet {
    pub parent: String,
    pub contents: Vec<String>,
}

macro_rules! wire_enums {
    ($($(#[$meta:meta])* $name:ident { $first:ident => $first_wire:literal $(, $variant:ident => $wire:literal)* $(,)? })*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub enum $name {
                #[default]
                $first,
                $($variant),*
            }

            impl $name {
                pub const ALL: &'static [$name] = &[$name::$first $(, $name::$variant)*];

                pub fn wire_name(self) -> &'static str {
                    match self {
                        $name::$first => $first_wire,
                        $($name::$variant => $wire),*
                    }
                }

                pub fn from_wire(s: &str) -> Option<Self> {
                    match s {
                        $first_wire => Some($name::$first),
                        $($wire => Some($name::$variant),)*
                        _ => None,
                    }
                }
            }
        )*
    };
}

wire_enums! {
    /// How the profile identifier was derived.
    IdType {
        Upc => "UPC",
        DiscId => "Disc ID",
        Local => "Local",
    }

    EventType {
        Watched => "Watched",
        Borrowed => "Borrowed",
        Returned => "Returned",
    }

    VideoStandard {
        Ntsc => "NTSC",
        Pal => "PAL",
    }

    /// Category restriction of a user link.
    LinkCategory {
        Official => "Official Websites",
        FanSite => "Fan Sites",
        Trailer => "Trailers and Clips",
        Review => "Reviews",
        Rating => "Ratings",
        General => "General Information",
        Game => "Games",
        Other => "Other",
    }
}
