use dvdprofilerd::emit::plugins::PluginClassIds;
use dvdprofilerd::engine::{Engine, Plan};
use dvdprofilerd::model::Collection;
use dvdprofilerd::source::{load_collection, parse_collection};
use dvdprofilerd::sql::Dialect;
use std::collections::HashSet;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn small_collection() -> Collection {
    load_collection(&fixture_path("collection_small.xml")).expect("load fixture")
}

fn translate(collection: &Collection) -> Plan {
    Engine::new(Dialect::Sqlite, PluginClassIds::default())
        .expect("engine")
        .translate(collection)
        .expect("translate")
}

/// Leading integer column of an INSERT, when the first column is a surrogate id.
fn leading_id(statement: &str) -> Option<i64> {
    let rest = statement.split_once("VALUES (")?.1;
    let end = rest.find([',', ')'])?;
    rest[..end].trim().parse().ok()
}

fn statements_of<'a>(plan: &'a Plan, section: &str) -> Vec<&'a str> {
    plan.group(section)
        .map(|g| g.statements.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn same_input_same_script() {
    let collection = small_collection();
    let a = translate(&collection);
    let b = translate(&collection);
    assert_eq!(a.script(), b.script());
    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.digest().len(), 64);
}

#[test]
fn surrogate_ids_are_unique_and_dense() {
    let plan = translate(&small_collection());
    let ids: Vec<i64> = plan.statements().filter_map(leading_id).collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate surrogate id");
    assert_eq!(ids.iter().copied().min(), Some(1));
    assert_eq!(ids.iter().copied().max(), Some(plan.high_water));
    assert_eq!(unique.len() as i64, plan.high_water);
}

#[test]
fn association_ids_follow_every_lookup_id() {
    let plan = translate(&small_collection());
    let base_sections: HashSet<&str> = [
        "Locality",
        "DVDIdType",
        "AudioChannels",
        "AudioContent",
        "AudioFormat",
        "CaseType",
        "CollectionType",
        "EventType",
        "VideoStandard",
        "Genre",
        "Subtitle",
        "MediaType",
        "CastAndCrew",
        "LinkCategory",
        "CountryOfOrigin",
        "User",
        "StudioAndMediaCompany",
        "Tag",
        "PluginData",
    ]
    .into_iter()
    .collect();

    let reported: Vec<&str> = plan.groups.iter().take(19).map(|g| g.section).collect();
    assert_eq!(reported.len(), 19);
    assert!(reported.iter().all(|s| base_sections.contains(s)));

    let max_lookup = plan
        .groups
        .iter()
        .filter(|g| base_sections.contains(g.section))
        .flat_map(|g| g.statements.iter())
        .filter_map(|s| leading_id(s))
        .max()
        .unwrap();

    let association_ids = |profile_id: &str| -> Vec<i64> {
        plan.groups
            .iter()
            .filter(|g| !base_sections.contains(g.section))
            .filter(|g| !g.section.starts_with("BoxSet"))
            .flat_map(|g| g.statements.iter())
            .filter(|s| s.contains(&format!(", '{profile_id}'")))
            .filter_map(|s| leading_id(s))
            .collect()
    };
    let first = association_ids("025192018828.4");
    let second = association_ids("5050582371423.1");
    assert!(!first.is_empty() && !second.is_empty());
    assert!(first.iter().chain(&second).all(|id| *id > max_lookup));
    // Every row of a profile is numbered before the next profile starts.
    assert!(first.iter().max() < second.iter().min());
}

#[test]
fn profiles_without_id_leave_no_trace() {
    let plan = translate(&small_collection());
    assert_eq!(statements_of(&plan, "DVD").len(), 3);
    let script = plan.script();
    assert!(!script.contains("Orphan Without Identifier"));
    assert!(!script.contains("Documentary"));
    assert!(!script.contains("'Known'"));
}

#[test]
fn dividers_label_following_cast_members() {
    let plan = translate(&small_collection());
    let cast: Vec<&str> = statements_of(&plan, "DVDxCast")
        .into_iter()
        .filter(|s| s.contains("'025192018828.4'"))
        .collect();
    assert_eq!(cast.len(), 3);
    assert!(cast[0].contains("'Arthur Dent'") && cast[0].ends_with("NULL, NULL)"));
    assert!(cast[1].contains("'Ford Prefect'") && cast[1].ends_with("'E1', NULL)"));
    assert!(cast[2].contains("'Marvin'") && cast[2].ends_with("'E1', 'G1')"));
}

#[test]
fn crew_group_resets_on_credit_type_change() {
    let plan = translate(&small_collection());
    let crew: Vec<&str> = statements_of(&plan, "DVDxCrew")
        .into_iter()
        .filter(|s| s.contains("'5050582371423.1'"))
        .collect();
    assert_eq!(crew.len(), 3);
    assert!(crew[0].ends_with("NULL, NULL, NULL)"));
    assert!(crew[1].contains("'Second Unit Director'"));
    assert!(crew[1].ends_with("NULL, 'Second Unit', NULL)"));
    assert!(crew[2].contains("'Effects'"));
    assert!(crew[2].ends_with("NULL, NULL, NULL)"));

    let custom: Vec<&str> = statements_of(&plan, "DVDxCrew")
        .into_iter()
        .filter(|s| s.contains("'Writing'"))
        .collect();
    assert_eq!(custom.len(), 1);
    assert!(custom[0].ends_with("'Consultant')"));
}

#[test]
fn zero_production_year_is_null() {
    let plan = translate(&small_collection());
    let dvd = statements_of(&plan, "DVD");
    assert!(dvd[0].starts_with(
        "INSERT INTO tDVD VALUES ('025192018828.4', '0-25192-01882-8', '12', "
    ));
    assert!(dvd[0].contains("'Special Edition', NULL, NULL, '9/13/2005', 109, 'PG'"));
    assert!(dvd[1].contains("'Second Feature', NULL, NULL, 1981, NULL, NULL"));
}

#[test]
fn users_match_case_insensitively() {
    let collection = small_collection();
    let scanned = Engine::new(Dialect::Sqlite, PluginClassIds::default())
        .unwrap()
        .scan(&collection)
        .unwrap();
    let users: Vec<String> = scanned
        .registry()
        .users
        .iter()
        .map(|(_, _, u)| format!("{} {}", u.first_name, u.last_name))
        .collect();
    assert_eq!(users, vec!["Jo Smith".to_string(), "Ann Lee".to_string()]);

    let plan = scanned.emit(&collection).unwrap();
    let jo = leading_id(statements_of(&plan, "User")[0]).unwrap();
    let events = statements_of(&plan, "DVDxEvent");
    assert_eq!(events.len(), 3);
    assert!(events[0].ends_with(&format!(", {jo})")));
    assert!(events[1].ends_with(&format!(", {jo})")));
    assert!(events[2].ends_with(", NULL)"));
}

#[test]
fn persons_match_exactly() {
    let collection = small_collection();
    let scanned = Engine::new(Dialect::Sqlite, PluginClassIds::default())
        .unwrap()
        .scan(&collection)
        .unwrap();
    let persons = &scanned.registry().persons;
    assert_eq!(persons.len(), 8);
    let rickman = persons
        .iter()
        .find(|(_, _, p)| p.last_name == "Rickman")
        .map(|(_, _, p)| p.birth_year);
    assert_eq!(rickman, Some(1946));
    assert_eq!(
        persons
            .iter()
            .filter(|(_, _, p)| p.last_name.eq_ignore_ascii_case("freeman"))
            .count(),
        2
    );
}

#[test]
fn tags_match_on_full_name_ignoring_case() {
    let plan = translate(&small_collection());
    assert_eq!(statements_of(&plan, "Tag").len(), 1);
    let tag_id = leading_id(statements_of(&plan, "Tag")[0]).unwrap();
    let joins = statements_of(&plan, "DVDxTag");
    assert_eq!(joins.len(), 2);
    assert!(joins.iter().all(|s| s.ends_with(&format!(", {tag_id})"))));
}

#[test]
fn box_sets_skip_unknown_children() {
    let plan = translate(&small_collection());
    assert_eq!(
        statements_of(&plan, "BoxSetParent"),
        vec!["UPDATE tDVD SET ParentDVDId = 'BOX1' WHERE Id = '025192018828.4'"]
    );
    let children = statements_of(&plan, "BoxSetChildren");
    assert_eq!(children.len(), 1);
    assert!(children[0].ends_with("'BOX1', '025192018828.4')"));
    assert!(!plan.script().contains("MISSING.1"));
    let last = plan.groups.last().unwrap();
    assert_eq!(last.section, "BoxSetChildren");
}

#[test]
fn plugin_rows_follow_their_association() {
    let plan = translate(&small_collection());
    let rows = statements_of(&plan, "DVDxPlugin");
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("INSERT INTO tDVDxPluginData VALUES ("));
    assert!(rows[0].contains("<EnhancedNotes><Note1 IsHtml=\"false\">Shelf copy</Note1></EnhancedNotes>\n"));
    assert_eq!(
        rows[1],
        "INSERT INTO tEnhancedNotes VALUES ('025192018828.4', 'Shelf copy', False, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL)"
    );
    assert!(rows[2].starts_with("INSERT INTO tDVDxPluginData VALUES ("));
    assert!(rows[2].contains("<Scan Side=\"front\">ok</Scan>\n<Scan Side=\"back\">ok</Scan>\n"));

    let registered = statements_of(&plan, "PluginData");
    assert!(registered[0].contains("'2a6b2c50-1b7e-4c3b-9d8c-5f7a4d9b0c12', 'Enhanced Notes'"));
}

#[test]
fn jet_dialect_changes_only_date_literals() {
    let collection = small_collection();
    let sqlite = translate(&collection);
    let jet = Engine::new(Dialect::Jet, PluginClassIds::default())
        .unwrap()
        .translate(&collection)
        .unwrap();
    assert_eq!(sqlite.statement_count(), jet.statement_count());
    assert!(jet.script().contains("#9/13/2005#"));
    assert!(!jet.script().contains("'9/13/2005'"));
    assert_ne!(sqlite.digest(), jet.digest());
}

#[test]
fn empty_collection_still_reports_lookup_tables() {
    let collection = parse_collection("<Collection/>").unwrap();
    let plan = translate(&collection);
    assert_eq!(plan.groups.len(), 19);
    assert!(!statements_of(&plan, "DVDIdType").is_empty());
    assert!(statements_of(&plan, "Genre").is_empty());
}

#[test]
fn association_ids_are_numbered_profile_by_profile() {
    let plugin = r#"<PluginCustomData><PluginData ClassID="{9e2d4c61-0000-4000-8000-00000000abcd}" Name="Other"><X/></PluginData></PluginCustomData>"#;
    let profile = |id: &str, region: &str| {
        format!(
            r#"<DVD><ID>{id}</ID><Genres><Genre>Drama</Genre></Genres><Regions><Region>{region}</Region></Regions><Actors><Actor FirstName="John" LastName="Smith"/></Actors>{plugin}</DVD>"#
        )
    };
    let xml = format!(
        "<Collection>{}{}</Collection>",
        profile("A", "1"),
        profile("B", "2")
    );
    let plan = translate(&parse_collection(&xml).expect("parse"));

    assert_eq!(
        statements_of(&plan, "CastAndCrew"),
        vec!["INSERT INTO tCastAndCrew VALUES (17, 'Smith', NULL, 'John', NULL)"]
    );
    assert_eq!(
        statements_of(&plan, "Genre"),
        vec!["INSERT INTO tGenre VALUES (18, 'Drama')"]
    );
    assert!(statements_of(&plan, "PluginData")[0].starts_with("INSERT INTO tPluginData VALUES (19, "));

    assert_eq!(
        statements_of(&plan, "DVDxGenre"),
        vec![
            "INSERT INTO tDVDxGenre VALUES (20, 'A', 18)",
            "INSERT INTO tDVDxGenre VALUES (24, 'B', 18)",
        ]
    );
    assert_eq!(
        statements_of(&plan, "DVDxRegion"),
        vec![
            "INSERT INTO tDVDxRegion VALUES (21, 'A', '1')",
            "INSERT INTO tDVDxRegion VALUES (25, 'B', '2')",
        ]
    );
    assert_eq!(
        statements_of(&plan, "DVDxCast"),
        vec![
            "INSERT INTO tDVDxCast VALUES (22, 'A', 17, NULL, NULL, False, False, False, NULL, NULL)",
            "INSERT INTO tDVDxCast VALUES (26, 'B', 17, NULL, NULL, False, False, False, NULL, NULL)",
        ]
    );
    assert_eq!(
        statements_of(&plan, "DVDxPlugin"),
        vec![
            "INSERT INTO tDVDxPluginData VALUES (23, 'A', 19, '<X/>\n')",
            "INSERT INTO tDVDxPluginData VALUES (27, 'B', 19, '<X/>\n')",
        ]
    );
    assert_eq!(plan.high_water, 27);
}

fn crew_rows(credits: &str) -> Vec<String> {
    let xml = format!("<Collection><DVD><ID>C</ID><Credits>{credits}</Credits></DVD></Collection>");
    let plan = translate(&parse_collection(&xml).expect("parse"));
    statements_of(&plan, "DVDxCrew")
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[test]
fn leading_group_divider_does_not_reach_the_first_credit() {
    let rows = crew_rows(
        r#"<Divider Type="Group" Caption="G0"/>
           <Credit FirstName="Ann" LastName="Able" CreditType="Direction" CreditSubtype="Director"/>"#,
    );
    assert_eq!(rows.len(), 1);
    assert!(rows[0].ends_with("'Director', NULL, NULL, NULL, NULL)"), "{}", rows[0]);
}

#[test]
fn group_divider_is_dropped_by_the_next_credit_type() {
    let rows = crew_rows(
        r#"<Credit FirstName="Ann" LastName="Able" CreditType="Direction" CreditSubtype="Director"/>
           <Divider Type="Group" Caption="G1"/>
           <Credit FirstName="Bo" LastName="Baker" CreditType="Writing" CreditSubtype="Screenwriter"/>
           <Divider Type="Group" Caption="G2"/>
           <Credit FirstName="Cy" LastName="Cole" CreditType="Writing" CreditSubtype="Writer"/>"#,
    );
    assert_eq!(rows.len(), 3);
    assert!(rows[0].ends_with("'Director', NULL, NULL, NULL, NULL)"));
    assert!(rows[1].ends_with("'Screenwriter', NULL, NULL, NULL, NULL)"));
    assert!(rows[2].ends_with("'Writer', NULL, NULL, 'G2', NULL)"));
}

#[test]
fn empty_name_parts_are_null() {
    let xml = r#"<Collection><DVD><ID>N</ID>
        <Actors><Actor LastName="Cher" FirstName=""/></Actors>
        <Events><Event><EventType>Watched</EventType><Timestamp>2010-04-02T20:00:00</Timestamp>
            <User FirstName="Jo" LastName=""/></Event></Events>
        <Tags><Tag Name="Loose" FullName=""/></Tags>
    </DVD></Collection>"#;
    let plan = translate(&parse_collection(xml).expect("parse"));
    assert_eq!(
        statements_of(&plan, "CastAndCrew"),
        vec!["INSERT INTO tCastAndCrew VALUES (17, 'Cher', NULL, NULL, NULL)"]
    );
    assert_eq!(
        statements_of(&plan, "User"),
        vec!["INSERT INTO tUser VALUES (18, NULL, 'Jo', NULL, NULL)"]
    );
    assert_eq!(
        statements_of(&plan, "Tag"),
        vec!["INSERT INTO tTag VALUES (19, 'Loose', NULL)"]
    );
}

#[test]
fn plugin_blocks_decode_only_under_configured_class_ids() {
    let xml = r#"<Collection><DVD><ID>P</ID><PluginCustomData>
        <PluginData ClassID="{5D1B7C2E-3A4F-4E6B-8C9D-0A1B2C3D4E5F}" Name="Enhanced Notes"><EnhancedNotes><Note1 IsHtml="false">kept</Note1></EnhancedNotes></PluginData>
    </PluginCustomData></DVD></Collection>"#;
    let collection = parse_collection(xml).expect("parse");

    let placeholder = translate(&collection);
    assert_eq!(statements_of(&placeholder, "DVDxPlugin").len(), 1);

    let ids = PluginClassIds {
        enhanced_notes: "5d1b7c2e-3a4f-4e6b-8c9d-0a1b2c3d4e5f".to_string(),
        ..PluginClassIds::default()
    };
    let configured = Engine::new(Dialect::Sqlite, ids)
        .expect("engine")
        .translate(&collection)
        .expect("translate");
    let rows = statements_of(&configured, "DVDxPlugin");
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("INSERT INTO tEnhancedNotes VALUES ('P', 'kept', False"));
}
