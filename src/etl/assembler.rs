//! Rebuilds top-level nodes and ways from a flat stream of tag events.
//!
//! Children of a node or way (`<tag>` and `<nd>`) are buffered until the
//! element's end tag arrives; deeper nesting is tolerated but not interpreted.

use log::{debug, warn};

use super::tag_events::TagEvent;
use crate::data::osm::{Attributes, Node, OsmId, Way};
use crate::data::OsmMapData;
use crate::errors::{Error, Result};

const PARSABLE_TAGS: [&str; 2] = ["node", "way"];

enum AssemblerState {
    Idle,
    InEntity {
        header: TagEvent,
        children: Vec<TagEvent>,
        depth: usize,
    },
}

pub struct EntityAssembler {
    state: AssemblerState,
    map: OsmMapData,
}

impl Default for EntityAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAssembler {
    pub fn new() -> Self {
        EntityAssembler {
            state: AssemblerState::Idle,
            map: OsmMapData::new(),
        }
    }

    pub fn feed(&mut self, event: TagEvent) -> Result<()> {
        let state = std::mem::replace(&mut self.state, AssemblerState::Idle);
        self.state = match state {
            AssemblerState::Idle => {
                if event.is_start() && PARSABLE_TAGS.contains(&event.name.as_str()) {
                    debug!(tag = event.name.as_str(); "Started parsable element {event}");
                    AssemblerState::InEntity {
                        header: event,
                        children: Vec::new(),
                        depth: 0,
                    }
                } else {
                    warn!(tag = event.name.as_str(); "Unhandled element {event}");
                    AssemblerState::Idle
                }
            },
            AssemblerState::InEntity { header, mut children, depth } => {
                if event.is_start() {
                    if depth == 0 {
                        children.push(event);
                    }
                    AssemblerState::InEntity { header, children, depth: depth + 1 }
                } else if depth == 0 && event.is_end_of(&header.name) {
                    self.finish_entity(header, children)?;
                    AssemblerState::Idle
                } else {
                    AssemblerState::InEntity { header, children, depth: depth.saturating_sub(1) }
                }
            },
        };
        Ok(())
    }

    /// Ends the stream. Running out of events inside a node or way means the
    /// document was truncated.
    pub fn finish(self) -> Result<OsmMapData> {
        match self.state {
            AssemblerState::Idle => Ok(self.map),
            AssemblerState::InEntity { header, .. } => Err(Error::structural(format!(
                "document ended inside {header}"
            ))),
        }
    }

    fn finish_entity(&mut self, header: TagEvent, children: Vec<TagEvent>) -> Result<()> {
        debug!(tag = header.name.as_str(), children = children.len(); "Finished element {header}");

        match header.name.as_str() {
            "node" => {
                let node = build_node(&header, &children)?;
                self.map.add_node(node);
            },
            "way" => {
                let way = build_way(&header, &children, &self.map)?;
                self.map.add_way(way);
            },
            other => warn!(tag = other; "Saw unknown tag type in element {header}"),
        }
        Ok(())
    }
}

/// Feeds every event into a fresh assembler. Any structural error aborts the
/// whole parse.
pub fn assemble<I>(events: I) -> Result<OsmMapData>
where
    I: IntoIterator<Item = Result<TagEvent>>,
{
    let mut assembler = EntityAssembler::new();
    for event in events {
        assembler.feed(event?)?;
    }
    assembler.finish()
}

fn build_node(header: &TagEvent, children: &[TagEvent]) -> Result<Node> {
    let (id, mut attributes) = extract_id(header)?;

    for child in children {
        if child.name == "tag" {
            merge_tag(&mut attributes, child);
        } else {
            warn!(node_id = id; "Could not parse tag/nd child {child} of node {id}");
        }
    }

    Ok(Node { id, attributes })
}

fn build_way(header: &TagEvent, children: &[TagEvent], map: &OsmMapData) -> Result<Way> {
    let (id, mut attributes) = extract_id(header)?;
    let mut nodes = Vec::new();

    for child in children {
        match child.name.as_str() {
            "tag" => merge_tag(&mut attributes, child),
            "nd" => nodes.push(resolve_nd(id, child, map)?),
            _ => warn!(way_id = id; "Could not parse tag/nd child {child} of way {id}"),
        }
    }

    Ok(Way { id, nodes, attributes })
}

/// Copies the header's attributes without `id`, and parses the `id`.
fn extract_id(header: &TagEvent) -> Result<(OsmId, Attributes)> {
    let raw_id = header
        .attributes
        .get("id")
        .ok_or_else(|| Error::structural(format!("{header} has no id")))?;
    let id = raw_id
        .parse()
        .map_err(|_| Error::structural(format!("{header} has non-numeric id {raw_id:?}")))?;

    let attributes = header
        .attributes
        .iter()
        .filter(|(key, _)| key.as_str() != "id")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok((id, attributes))
}

/// Later tags override earlier ones with the same key.
fn merge_tag(attributes: &mut Attributes, child: &TagEvent) {
    match (child.attributes.get("k"), child.attributes.get("v")) {
        (Some(k), Some(v)) => {
            attributes.insert(k.clone(), v.clone());
        },
        _ => warn!("Could not parse tag/nd child {child}"),
    }
}

fn resolve_nd(way_id: OsmId, child: &TagEvent, map: &OsmMapData) -> Result<OsmId> {
    let raw_ref = match child.attributes.get("ref") {
        Some(raw_ref) if child.attributes.len() == 1 => raw_ref,
        _ => {
            return Err(Error::structural(format!(
                "way {way_id} has malformed child {child}, expected only a ref"
            )))
        },
    };
    let node_id: OsmId = raw_ref.parse().map_err(|_| {
        Error::structural(format!("way {way_id} has non-numeric node ref {raw_ref:?}"))
    })?;

    map.get_node(node_id).map_err(|_| {
        Error::structural(format!("way {way_id} references undeclared node {node_id}"))
    })?;
    Ok(node_id)
}
