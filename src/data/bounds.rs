use super::semantic::{Item, MapCoords};
use crate::errors::{Error, ErrorKind, Result};

/// Componentwise minimum and maximum over every coordinate of every item.
pub fn min_max_coords(items: &[Item]) -> Result<(MapCoords, MapCoords)> {
    let mut all_coords = items.iter().flat_map(|item| item.all_coords());
    let first = all_coords.next().ok_or_else(|| {
        Error::new(ErrorKind::EmptyBounds, "cannot compute bounds without any coordinates")
    })?;

    Ok(all_coords.fold((*first, *first), |(min, max), coords| {
        (
            MapCoords::new(min.lat.min(coords.lat), min.lon.min(coords.lon)),
            MapCoords::new(max.lat.max(coords.lat), max.lon.max(coords.lon)),
        )
    }))
}

/// Linear map from map coordinates onto a `width` x `height` pixel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    min: MapCoords,
    span_lat: f64,
    span_lon: f64,
    width: f64,
    height: f64,
}

impl Projection {
    pub fn new((min, max): (MapCoords, MapCoords), width: u32, height: u32) -> Result<Self> {
        let span_lat = max.lat - min.lat;
        let span_lon = max.lon - min.lon;
        let usable = |span: f64| span.is_finite() && span != 0.0;
        if !usable(span_lat) || !usable(span_lon) {
            return Err(Error::new(
                ErrorKind::DegenerateProjection,
                format!("bounds have no usable span (lat span {span_lat}, lon span {span_lon})"),
            ));
        }

        Ok(Projection {
            min,
            span_lat,
            span_lon,
            width: width.into(),
            height: height.into(),
        })
    }

    pub fn for_items(items: &[Item], width: u32, height: u32) -> Result<Self> {
        Self::new(min_max_coords(items)?, width, height)
    }

    /// Latitude goes along x, longitude along y.
    pub fn project(&self, coords: &MapCoords) -> (f64, f64) {
        let x = (coords.lat - self.min.lat) / self.span_lat * self.width;
        let y = (coords.lon - self.min.lon) / self.span_lon * self.height;
        (x, y)
    }
}
