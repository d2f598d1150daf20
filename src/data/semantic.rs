use serde::{Deserialize, Serialize};

use super::osm::{Node, OsmId, Way};
use super::OsmMapData;
use crate::etl::registry::{NodeBased, NotApplicable, WayBased};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MapCoords {
    pub lat: f64,
    pub lon: f64,
}

impl MapCoords {
    pub fn new(lat: f64, lon: f64) -> Self {
        MapCoords { lat, lon }
    }

    /// Coordinates are copied out of the node, so the result does not borrow the map.
    pub fn from_node(node: &Node) -> Result<Self, NotApplicable> {
        let lat = Self::parse_axis(node, "lat")?;
        let lon = Self::parse_axis(node, "lon")?;
        Ok(MapCoords { lat, lon })
    }

    fn parse_axis(node: &Node, key: &str) -> Result<f64, NotApplicable> {
        let raw = node
            .attribute(key)
            .ok_or_else(|| NotApplicable::new(format!("node {} has no {key}", node.id)))?;
        // `f64::from_str` also accepts "inf" and "NaN".
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| NotApplicable::new(format!("node {} has unparsable {key} {raw:?}", node.id)))
    }
}

pub type Path = Vec<MapCoords>;

/// Resolves every node of the way, in way order.
pub fn path_from_way(way: &Way, map: &OsmMapData) -> Result<Path, NotApplicable> {
    way.nodes.iter()
        .map(|&node_id| {
            let node = map.get_node(node_id)
                .map_err(|err| NotApplicable::new(err.message))?;
            MapCoords::from_node(node)
        })
        .collect()
}

/// A fixed set of sub-types, matched case-insensitively by name.
pub trait Vocabulary: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter()
            .copied()
            .find(|candidate| candidate.name().eq_ignore_ascii_case(name))
    }
}

/// Looks up `key` and matches its value against the vocabulary of `T`.
fn categorical<T: Vocabulary>(way: &Way, key: &str) -> Result<T, NotApplicable> {
    let value = way
        .attribute(key)
        .ok_or_else(|| NotApplicable::new(format!("way {} has no {key}", way.id)))?;
    T::from_name(value)
        .ok_or_else(|| NotApplicable::new(format!("way {} has unknown {key} {value:?}", way.id)))
}

/// Everything the classifier can recognise on the map.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Item {
    Tree(Tree),
    Road(Road),
    Building(Building),
}

impl Item {
    pub fn id(&self) -> OsmId {
        match self {
            Item::Tree(tree) => tree.id,
            Item::Road(road) => road.id,
            Item::Building(building) => building.id,
        }
    }

    pub fn all_coords(&self) -> &[MapCoords] {
        match self {
            Item::Tree(tree) => std::slice::from_ref(&tree.coords),
            Item::Road(road) => &road.path,
            Item::Building(building) => &building.path,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tree {
    pub id: OsmId,
    pub coords: MapCoords,
}

impl NodeBased for Tree {
    const NAME: &'static str = "tree";

    fn from_node(node: &Node) -> Result<Self, NotApplicable> {
        match node.attribute("natural") {
            Some("tree") => (),
            Some(other) => return Err(NotApplicable::new(format!("natural is {other:?}, not \"tree\""))),
            None => return Err(NotApplicable::new(format!("node {} has no natural", node.id))),
        }

        Ok(Tree {
            id: node.id,
            coords: MapCoords::from_node(node)?,
        })
    }
}

impl From<Tree> for Item {
    fn from(value: Tree) -> Self {
        Item::Tree(value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Road {
    pub id: OsmId,
    pub path: Path,
    pub road_type: RoadType,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadType {
    Residential,
    Footway,
}

impl Vocabulary for RoadType {
    const ALL: &'static [Self] = &[RoadType::Residential, RoadType::Footway];

    fn name(&self) -> &'static str {
        match self {
            RoadType::Residential => "residential",
            RoadType::Footway => "footway",
        }
    }
}

impl WayBased for Road {
    const NAME: &'static str = "road";

    fn from_way(way: &Way, map: &OsmMapData) -> Result<Self, NotApplicable> {
        let road_type = categorical(way, "highway")?;
        Ok(Road {
            id: way.id,
            path: path_from_way(way, map)?,
            road_type,
        })
    }
}

impl From<Road> for Item {
    fn from(value: Road) -> Self {
        Item::Road(value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Building {
    pub id: OsmId,
    pub path: Path,
    pub building_type: BuildingType,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingType {
    Yes,
    House,
    Residential,
    Apartments,
    Garage,
    Garages,
}

impl Vocabulary for BuildingType {
    const ALL: &'static [Self] = &[
        BuildingType::Yes,
        BuildingType::House,
        BuildingType::Residential,
        BuildingType::Apartments,
        BuildingType::Garage,
        BuildingType::Garages,
    ];

    fn name(&self) -> &'static str {
        match self {
            BuildingType::Yes => "yes",
            BuildingType::House => "house",
            BuildingType::Residential => "residential",
            BuildingType::Apartments => "apartments",
            BuildingType::Garage => "garage",
            BuildingType::Garages => "garages",
        }
    }
}

impl WayBased for Building {
    const NAME: &'static str = "building";

    fn from_way(way: &Way, map: &OsmMapData) -> Result<Self, NotApplicable> {
        let building_type = categorical(way, "building")?;
        Ok(Building {
            id: way.id,
            path: path_from_way(way, map)?,
            building_type,
        })
    }
}

impl From<Building> for Item {
    fn from(value: Building) -> Self {
        Item::Building(value)
    }
}
