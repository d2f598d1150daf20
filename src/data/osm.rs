use std::collections::HashMap;

pub type OsmId = i64;

/// Attributes of an element, merged with the `k`/`v` pairs of its `<tag>` children.
pub type Attributes = HashMap<String, String>;

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct Node {
    pub id: OsmId,
    /// Includes the reserved `lat` and `lon` keys for nodes that have a position.
    pub attributes: Attributes,
}

/// A way only refers to its nodes by id. The nodes themselves stay owned by
/// [`crate::data::OsmMapData`].
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
pub struct Way {
    pub id: OsmId,
    pub nodes: Vec<OsmId>,
    pub attributes: Attributes,
}

impl Node {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl Way {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
