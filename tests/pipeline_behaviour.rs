//! End-to-end behaviour of parsing and classifying .osm documents.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use osm_items::data::bounds::{min_max_coords, Projection};
use osm_items::data::semantic::{Building, BuildingType, Item, MapCoords, Road, RoadType, Tree};
use osm_items::data::OsmMapData;
use osm_items::errors::{ErrorKind, Result};
use osm_items::etl::assembler::assemble;
use osm_items::etl::parse_osm::{self, ParseOsmEtl};
use osm_items::etl::registry::Registry;
use osm_items::etl::semantic_map::{self, classify, SemanticMapEtl};
use osm_items::etl::tag_events::{open_osm_file, TagEventSource};
use osm_items::etl::Etl;
use osm_items::UserConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use xz::write::XzEncoder;

#[fixture]
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/small.osm")
}

#[fixture]
fn fixture_text(fixture_path: PathBuf) -> String {
    fs::read_to_string(&fixture_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {fixture_path:?}: {err}"))
}

fn parse_str(xml: &str) -> Result<OsmMapData> {
    assemble(TagEventSource::new(xml.as_bytes()))
}

fn config_for(data_path: &Path, output_dir: &Path) -> UserConfig {
    UserConfig {
        data_path: data_path.to_string_lossy().into_owned(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        log_level: "info".to_string(),
        refresh: false,
    }
}

fn expected_items() -> Vec<Item> {
    vec![
        Item::Tree(Tree { id: 1, coords: MapCoords::new(51.5001, -0.1299) }),
        Item::Road(Road {
            id: 100,
            path: vec![MapCoords::new(51.5010, -0.1250), MapCoords::new(51.5020, -0.1240)],
            road_type: RoadType::Residential,
        }),
        Item::Building(Building {
            id: 101,
            path: vec![
                MapCoords::new(51.5020, -0.1240),
                MapCoords::new(51.5030, -0.1230),
                MapCoords::new(51.5040, -0.1220),
                MapCoords::new(51.5020, -0.1240),
            ],
            building_type: BuildingType::Apartments,
        }),
    ]
}

#[rstest]
fn parses_every_top_level_node_and_way(fixture_path: PathBuf, fixture_text: String) -> Result<()> {
    let map = assemble(open_osm_file(&fixture_path)?)?;
    let declared = fixture_text.matches("<node ").count() + fixture_text.matches("<way ").count();
    assert_eq!(map.get_nodes().len() + map.get_ways().len(), declared);
    assert_eq!(map.get_nodes().len(), 5);
    assert_eq!(map.get_ways().len(), 3);
    Ok(())
}

#[rstest]
fn classifies_fixture(fixture_text: String) -> Result<()> {
    let map = parse_str(&fixture_text)?;
    assert_eq!(classify(&map, &Registry::default()), expected_items());
    Ok(())
}

#[rstest]
fn parsing_twice_gives_the_same_items(fixture_text: String) -> Result<()> {
    let registry = Registry::default();
    let first = classify(&parse_str(&fixture_text)?, &registry);
    let second = classify(&parse_str(&fixture_text)?, &registry);
    assert_eq!(first, second);
    Ok(())
}

#[rstest]
fn undeclared_reference_fails_the_parse() {
    let xml = r#"<osm>
        <node id="1" lat="0" lon="0"/>
        <way id="2"><nd ref="1"/><nd ref="3"/><tag k="highway" v="footway"/></way>
    </osm>"#;
    let err = parse_str(xml).expect_err("node 3 is never declared");
    assert_eq!(err.kind, ErrorKind::Structural);
}

#[rstest]
fn truncated_document_fails_the_parse() {
    let xml = r#"<osm><node id="1" lat="0" lon="0"><tag k="natural" v="tree"/>"#;
    let err = parse_str(xml).expect_err("document stops inside a node");
    assert!(matches!(err.kind, ErrorKind::Structural | ErrorKind::Xml), "unexpected {err}");
}

#[rstest]
fn reads_xz_compressed_input(fixture_path: PathBuf, fixture_text: String) -> Result<()> {
    let dir = TempDir::new()?;
    let compressed_path = dir.path().join("small.osm.xz");
    let mut encoder = XzEncoder::new(fs::File::create(&compressed_path)?, 6);
    encoder.write_all(fixture_text.as_bytes())?;
    encoder.finish()?;

    let plain = assemble(open_osm_file(&fixture_path)?)?;
    let compressed = assemble(open_osm_file(&compressed_path)?)?;
    assert_eq!(plain, compressed);
    Ok(())
}

#[rstest]
fn pipeline_writes_items_and_reuses_cache(fixture_text: String) -> Result<()> {
    let dir = TempDir::new()?;
    let data_path = dir.path().join("small.osm");
    fs::write(&data_path, &fixture_text)?;
    let output_dir = dir.path().join("output");
    fs::create_dir_all(&output_dir)?;
    let config = config_for(&data_path, &output_dir);

    let mut parse_etl = ParseOsmEtl::new(&config);
    let mut semantic_etl = SemanticMapEtl::new();
    parse_etl.process(&output_dir)?;
    semantic_etl.process(&output_dir)?;

    assert!(parse_etl.is_cached(&output_dir)?);
    assert_eq!(SemanticMapEtl::read_items(&output_dir)?, expected_items());

    // With the source gone, only the cached map can feed the classifier.
    fs::remove_file(&data_path)?;
    semantic_etl.clean(&output_dir)?;
    parse_etl.process(&output_dir)?;
    semantic_etl.process(&output_dir)?;
    assert_eq!(SemanticMapEtl::read_items(&output_dir)?, expected_items());
    Ok(())
}

#[rstest]
fn pipeline_reports_structural_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let data_path = dir.path().join("broken.osm");
    fs::write(&data_path, r#"<osm><way id="1"><nd ref="9"/></way></osm>"#)?;
    let config = config_for(&data_path, dir.path());

    let err = ParseOsmEtl::new(&config)
        .process(dir.path())
        .expect_err("way references a missing node");
    assert_eq!(err.kind, ErrorKind::Structural);
    assert!(!ParseOsmEtl::new(&config).is_cached(dir.path())?);
    Ok(())
}

#[rstest]
#[case::all_ones(vec![0xff; 16])]
#[case::longer_garbage(vec![0xff; 64])]
#[case::empty(Vec::new())]
fn corrupt_map_cache_is_a_cache_error(#[case] bytes: Vec<u8>) -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join(parse_osm::OUTPUT_FILE_NAME), bytes)?;

    let err = SemanticMapEtl::new()
        .process(dir.path())
        .expect_err("cache holds no map");
    assert_eq!(err.kind, ErrorKind::Cache);
    assert!(!SemanticMapEtl::new().is_cached(dir.path())?);
    Ok(())
}

#[rstest]
fn truncated_map_cache_is_a_cache_error(fixture_text: String) -> Result<()> {
    let dir = TempDir::new()?;
    let data_path = dir.path().join("small.osm");
    fs::write(&data_path, &fixture_text)?;
    let output_dir = dir.path().join("output");
    fs::create_dir_all(&output_dir)?;
    ParseOsmEtl::new(&config_for(&data_path, &output_dir)).process(&output_dir)?;

    let cache_path = output_dir.join(parse_osm::OUTPUT_FILE_NAME);
    let bytes = fs::read(&cache_path)?;
    fs::write(&cache_path, &bytes[..bytes.len() / 2])?;

    let err = SemanticMapEtl::new()
        .process(&output_dir)
        .expect_err("cache was cut short");
    assert_eq!(err.kind, ErrorKind::Cache);
    Ok(())
}

#[rstest]
fn pipeline_leaves_only_its_outputs(fixture_text: String) -> Result<()> {
    let dir = TempDir::new()?;
    let data_path = dir.path().join("small.osm");
    fs::write(&data_path, &fixture_text)?;
    let output_dir = dir.path().join("output");
    fs::create_dir_all(&output_dir)?;

    ParseOsmEtl::new(&config_for(&data_path, &output_dir)).process(&output_dir)?;
    SemanticMapEtl::new().process(&output_dir)?;

    let mut names: Vec<String> = fs::read_dir(&output_dir)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    names.sort();
    assert_eq!(names, vec![semantic_map::OUTPUT_FILE_NAME, parse_osm::OUTPUT_FILE_NAME]);
    Ok(())
}

#[rstest]
#[case::not_json("not json at all")]
#[case::wrong_shape(r#"{"type": "Tree"}"#)]
#[case::unknown_item(r#"[{"type": "Lamp", "id": 1}]"#)]
fn corrupt_items_file_is_a_cache_error(#[case] contents: &str) -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join(semantic_map::OUTPUT_FILE_NAME), contents)?;

    let err = SemanticMapEtl::read_items(dir.path()).expect_err("items file is corrupt");
    assert_eq!(err.kind, ErrorKind::Cache);
    Ok(())
}

#[rstest]
fn missing_items_file_is_an_io_error() -> Result<()> {
    let dir = TempDir::new()?;
    let err = SemanticMapEtl::read_items(dir.path()).expect_err("nothing was written");
    assert_eq!(err.kind, ErrorKind::Io);
    Ok(())
}

#[rstest]
fn projects_classified_items(fixture_text: String) -> Result<()> {
    let items = classify(&parse_str(&fixture_text)?, &Registry::default());
    let (min, max) = min_max_coords(&items)?;
    assert_eq!(min, MapCoords::new(51.5001, -0.1299));
    assert_eq!(max, MapCoords::new(51.5040, -0.1220));

    let projection = Projection::for_items(&items, 400, 300)?;
    let (x, y) = projection.project(&max);
    assert!((x - 400.0).abs() < 1e-9 && (y - 300.0).abs() < 1e-9);
    Ok(())
}

#[rstest]
fn empty_document_has_no_bounds() -> Result<()> {
    let items = classify(&parse_str("<osm></osm>")?, &Registry::default());
    assert!(items.is_empty());
    let err = min_max_coords(&items).expect_err("nothing to bound");
    assert_eq!(err.kind, ErrorKind::EmptyBounds);
    Ok(())
}
