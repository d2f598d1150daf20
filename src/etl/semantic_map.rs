use std::{fs::{self, File}, io::{BufWriter, Read}, path::{Path, PathBuf}};

use log::{debug, info, warn};
use rkyv::AlignedVec;
use tempfile::NamedTempFile;

use crate::{data::{osm::{Node, OsmId, Way}, semantic::Item, OsmMapData}, errors::{Error, ErrorKind, Result}};
use crate::etl::parse_osm;
use crate::etl::registry::{Decoded, Registry};

use super::Etl;

pub const ETL_NAME: &str = "semantic_map";
pub const OUTPUT_FILE_NAME: &str = "items.json";

/// Tries each decoder in turn and keeps the first item built.
fn first_match<D>(
    kind: &str,
    id: OsmId,
    decoders: &[D],
    name: impl Fn(&D) -> &'static str,
    decode: impl Fn(&D) -> Decoded,
) -> Option<Item> {
    for decoder in decoders {
        match decode(decoder) {
            Ok(item) => return Some(item),
            Err(miss) => {
                debug!(element = kind, id = id, decoder = name(decoder); "Couldn't decode due to {miss}");
            },
        }
    }

    warn!(element = kind, id = id; "Could not classify entity {id}");
    None
}

pub fn classify_node(node: &Node, registry: &Registry) -> Option<Item> {
    first_match("node", node.id, registry.node_decoders(), |d| d.name, |d| (d.decode)(node))
}

pub fn classify_way(way: &Way, map: &OsmMapData, registry: &Registry) -> Option<Item> {
    first_match("way", way.id, registry.way_decoders(), |d| d.name, |d| (d.decode)(way, map))
}

/// Classifies every node and then every way of the map, each in source order.
/// Elements no decoder accepts are dropped.
pub fn classify(map: &OsmMapData, registry: &Registry) -> Vec<Item> {
    let node_items = map.get_nodes().iter()
        .filter_map(|node| classify_node(node, registry));
    let way_items = map.get_ways().iter()
        .filter_map(|way| classify_way(way, map, registry));

    node_items.chain(way_items).collect()
}

pub struct SemanticMapEtl {
    registry: Registry,
}

impl SemanticMapEtl {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn new() -> SemanticMapEtl {
        SemanticMapEtl::with_registry(Registry::default())
    }

    pub fn with_registry(registry: Registry) -> SemanticMapEtl {
        SemanticMapEtl { registry }
    }

    /// Reads back the items written by a previous run.
    pub fn read_items(dir: &Path) -> Result<Vec<Item>> {
        let file = File::open(Self::output_path(dir))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|err| Error::new(ErrorKind::Cache, format!("Could not read items: {err}")))
    }
}

impl Default for SemanticMapEtl {
    fn default() -> Self {
        Self::new()
    }
}

impl Etl for SemanticMapEtl {
    type Input = OsmMapData;
    type Output = Vec<Item>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        if self.is_cached(dir)? {
            fs::remove_file(Self::output_path(dir))?;
        }
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        let input_file_path = dir.join(parse_osm::OUTPUT_FILE_NAME);
        let mut input_file = File::open(input_file_path)?;

        let mut buf_vec: Vec<u8> = Vec::new();
        input_file.read_to_end(&mut buf_vec)?;
        let mut aligned = AlignedVec::with_capacity(buf_vec.len());
        aligned.extend_from_slice(&buf_vec);

        let input = rkyv::from_bytes::<OsmMapData>(&aligned)
            .map_err(|err| Error::new(ErrorKind::Cache, format!("Could not deserialize map cache: {err:?}")))?;

        Ok(input)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let items = classify(&input, &self.registry);
        let entity_count = input.get_nodes().len() + input.get_ways().len();
        info!(items = items.len(), entities = entity_count; "Classified {} of {} entities", items.len(), entity_count);
        Ok(items)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let mut writer = BufWriter::new(NamedTempFile::new_in(dir)?);
        serde_json::to_writer(&mut writer, &output)
            .map_err(|err| Error::new(ErrorKind::Io, err.to_string()))?;
        let output_file = writer.into_inner().map_err(|err| Error::from(err.into_error()))?;
        output_file.persist(Self::output_path(dir)).map_err(|err| Error::from(err.error))?;
        Ok(())
    }
}
