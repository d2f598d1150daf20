use std::collections::{BTreeMap, HashMap};

use log::info;

use self::osm::{Attributes, Node, OsmId, Way};
use crate::errors::{Error, Result};

pub mod bounds;
pub mod osm;
pub mod semantic;

/// Map data as defined in the .osm file. Nodes and ways are kept in the order
/// they were first seen, with an id index for resolving way references.

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct OsmMapData {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    node_index: HashMap<OsmId, usize>,
}

/// Per-key occurrence counts, see [`OsmMapData::attribute_analysis`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttributeAnalysis {
    pub nodes: BTreeMap<String, usize>,
    pub ways: BTreeMap<String, usize>,
}

impl OsmMapData {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node id that was already seen keeps its first position but the index
    /// points at the latest declaration.
    pub fn add_node(&mut self, node: Node) {
        self.node_index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    pub fn add_way(&mut self, way: Way) {
        self.ways.push(way);
    }

    pub fn get_node(&self, id: OsmId) -> Result<&Node> {
        self.node_index
            .get(&id)
            .map(|&idx| &self.nodes[idx])
            .ok_or_else(|| Error::lookup(format!("no node with id {id}")))
    }

    pub fn get_nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get_ways(&self) -> &[Way] {
        &self.ways
    }

    pub fn attribute_analysis(&self) -> AttributeAnalysis {
        fn count_keys<'a>(all_attributes: impl Iterator<Item = &'a Attributes>) -> BTreeMap<String, usize> {
            let mut counts = BTreeMap::new();
            for attributes in all_attributes {
                for key in attributes.keys() {
                    *counts.entry(key.clone()).or_insert(0) += 1;
                }
            }
            counts
        }

        let analysis = AttributeAnalysis {
            nodes: count_keys(self.nodes.iter().map(|node| &node.attributes)),
            ways: count_keys(self.ways.iter().map(|way| &way.attributes)),
        };

        for (key, count) in &analysis.nodes {
            info!(element = "node", key = key.as_str(), count = *count; "Found {count} occurrences of {key}");
        }
        for (key, count) in &analysis.ways {
            info!(element = "way", key = key.as_str(), count = *count; "Found {count} occurrences of {key}");
        }

        analysis
    }
}
