//! Decoders that turn nodes and ways into [`Item`]s.
//!
//! Every item variant implements [`NodeBased`] or [`WayBased`] and is listed
//! once in [`Registry::default`]. The classifier only walks the registry, so a
//! new variant needs an impl and one registration line.

use std::fmt;

use crate::data::osm::{Node, Way};
use crate::data::semantic::{Building, Item, Road, Tree};
use crate::data::OsmMapData;

/// A decoder's preconditions did not hold for an element. Not an error: the
/// next decoder gets a chance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotApplicable {
    pub reason: String,
}

impl NotApplicable {
    pub fn new(reason: impl Into<String>) -> Self {
        NotApplicable { reason: reason.into() }
    }
}

impl fmt::Display for NotApplicable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

pub type Decoded = Result<Item, NotApplicable>;

pub trait NodeBased: Into<Item> {
    const NAME: &'static str;

    fn from_node(node: &Node) -> Result<Self, NotApplicable>;
}

pub trait WayBased: Into<Item> {
    const NAME: &'static str;

    fn from_way(way: &Way, map: &OsmMapData) -> Result<Self, NotApplicable>;
}

#[derive(Clone, Copy)]
pub struct NodeDecoder {
    pub name: &'static str,
    pub decode: fn(&Node) -> Decoded,
}

#[derive(Clone, Copy)]
pub struct WayDecoder {
    pub name: &'static str,
    pub decode: fn(&Way, &OsmMapData) -> Decoded,
}

fn decode_node<T: NodeBased>(node: &Node) -> Decoded {
    T::from_node(node).map(Into::into)
}

fn decode_way<T: WayBased>(way: &Way, map: &OsmMapData) -> Decoded {
    T::from_way(way, map).map(Into::into)
}

impl NodeDecoder {
    pub fn of<T: NodeBased>() -> Self {
        NodeDecoder {
            name: T::NAME,
            decode: decode_node::<T>,
        }
    }
}

impl WayDecoder {
    pub fn of<T: WayBased>() -> Self {
        WayDecoder {
            name: T::NAME,
            decode: decode_way::<T>,
        }
    }
}

impl fmt::Debug for NodeDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDecoder").field("name", &self.name).finish()
    }
}

impl fmt::Debug for WayDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WayDecoder").field("name", &self.name).finish()
    }
}

/// Decoders in the order they are tried.
#[derive(Debug, Clone)]
pub struct Registry {
    node_decoders: Vec<NodeDecoder>,
    way_decoders: Vec<WayDecoder>,
}

impl Registry {
    pub fn empty() -> Self {
        Registry {
            node_decoders: Vec::new(),
            way_decoders: Vec::new(),
        }
    }

    pub fn with_node<T: NodeBased>(mut self) -> Self {
        self.node_decoders.push(NodeDecoder::of::<T>());
        self
    }

    pub fn with_way<T: WayBased>(mut self) -> Self {
        self.way_decoders.push(WayDecoder::of::<T>());
        self
    }

    pub fn node_decoders(&self) -> &[NodeDecoder] {
        &self.node_decoders
    }

    pub fn way_decoders(&self) -> &[WayDecoder] {
        &self.way_decoders
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::empty()
            .with_node::<Tree>()
            .with_way::<Road>()
            .with_way::<Building>()
    }
}
