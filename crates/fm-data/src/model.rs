//! Core data records.

use fm_core::{LocationId, Real, parse_finite};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DataError, DataResult};

/// Anything that can be drawn as a circle and used as a flow endpoint.
///
/// Implemented by plain locations and by cluster nodes so the layers
/// pipeline never needs to know which one it was handed.
pub trait FlowLocation {
    fn id(&self) -> &LocationId;

    /// Representative `[lon, lat]` coordinate.
    fn centroid(&self) -> [Real; 2];
}

/// Read access to the three fields aggregation needs from a flow.
pub trait FlowRecord {
    fn origin_id(&self) -> &LocationId;
    fn dest_id(&self) -> &LocationId;
    fn magnitude(&self) -> Real;

    fn is_internal(&self) -> bool {
        self.origin_id() == self.dest_id()
    }
}

/// A named point location loaded from the locations sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub lon: Real,
    pub lat: Real,
}

impl Location {
    pub fn new(id: impl Into<LocationId>, name: impl Into<String>, lon: Real, lat: Real) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lon,
            lat,
        }
    }

    /// Convert a raw sheet row. `row` is only used for error reporting.
    ///
    /// A missing name falls back to the id.
    pub fn from_raw(raw: &RawLocation, row: usize) -> DataResult<Self> {
        let id: LocationId = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(DataError::MissingLocationId { row })?
            .into();
        let lon = parse_coordinate(&id, "lon", raw.lon.as_deref())?;
        let lat = parse_coordinate(&id, "lat", raw.lat.as_deref())?;
        let name = match raw.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => id.to_string(),
        };
        Ok(Self { id, name, lon, lat })
    }
}

fn parse_coordinate(id: &LocationId, field: &'static str, value: Option<&str>) -> DataResult<Real> {
    value
        .and_then(parse_finite)
        .ok_or_else(|| DataError::InvalidCoordinate {
            id: id.clone(),
            field,
            value: value.unwrap_or_default().to_string(),
        })
}

impl FlowLocation for Location {
    fn id(&self) -> &LocationId {
        &self.id
    }

    fn centroid(&self) -> [Real; 2] {
        [self.lon, self.lat]
    }
}

/// Aggregate of several locations merged together at a low zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: LocationId,
    pub zoom: u8,
    pub centroid: [Real; 2],
    #[serde(default)]
    pub children: Vec<LocationId>,
}

impl FlowLocation for ClusterNode {
    fn id(&self) -> &LocationId {
        &self.id
    }

    fn centroid(&self) -> [Real; 2] {
        self.centroid
    }
}

/// Either a location or a cluster; lets one list mix both.
#[derive(Debug, Clone, PartialEq)]
pub enum MapNode {
    Location(Location),
    Cluster(ClusterNode),
}

impl FlowLocation for MapNode {
    fn id(&self) -> &LocationId {
        match self {
            MapNode::Location(l) => l.id(),
            MapNode::Cluster(c) => c.id(),
        }
    }

    fn centroid(&self) -> [Real; 2] {
        match self {
            MapNode::Location(l) => l.centroid(),
            MapNode::Cluster(c) => c.centroid(),
        }
    }
}

impl From<Location> for MapNode {
    fn from(l: Location) -> Self {
        MapNode::Location(l)
    }
}

impl From<ClusterNode> for MapNode {
    fn from(c: ClusterNode) -> Self {
        MapNode::Cluster(c)
    }
}

/// A directed movement between two locations.
///
/// After duplicate summation each (origin, dest) pair appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub origin: LocationId,
    pub dest: LocationId,
    pub count: Real,
}

impl Flow {
    pub fn new(origin: impl Into<LocationId>, dest: impl Into<LocationId>, count: Real) -> Self {
        Self {
            origin: origin.into(),
            dest: dest.into(),
            count,
        }
    }
}

impl FlowRecord for Flow {
    fn origin_id(&self) -> &LocationId {
        &self.origin
    }

    fn dest_id(&self) -> &LocationId {
        &self.dest
    }

    fn magnitude(&self) -> Real {
        self.count
    }
}

/// A row of the locations sheet, as delivered by the data source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLocation {
    #[serde(default, deserialize_with = "lenient_cell")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub lon: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub lat: Option<String>,
}

impl RawLocation {
    pub fn new(id: &str, name: &str, lon: &str, lat: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            lon: Some(lon.to_string()),
            lat: Some(lat.to_string()),
        }
    }
}

/// A row of the flows sheet. Counts stay textual until summation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFlow {
    #[serde(default, deserialize_with = "lenient_cell")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub dest: Option<String>,
    #[serde(default, deserialize_with = "lenient_cell")]
    pub count: Option<String>,
}

impl RawFlow {
    pub fn new(origin: &str, dest: &str, count: &str) -> Self {
        Self {
            origin: Some(origin.to_string()),
            dest: Some(dest.to_string()),
            count: Some(count.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
}

/// Spreadsheet exports mix strings and numbers in the same column.
pub fn lenient_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Cell>::deserialize(deserializer)?.map(|cell| match cell {
        Cell::Text(s) => s,
        Cell::Number(n) => n.to_string(),
        Cell::Bool(b) => b.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_from_raw_defaults_name_to_id() {
        let raw = RawLocation {
            id: Some("LON".into()),
            name: None,
            lon: Some("-0.12".into()),
            lat: Some("51.5".into()),
        };
        let loc = Location::from_raw(&raw, 0).unwrap();
        assert_eq!(loc.name, "LON");
        assert_eq!(loc.centroid(), [-0.12, 51.5]);
    }

    #[test]
    fn location_from_raw_rejects_bad_coordinate() {
        let raw = RawLocation::new("X", "X", "east", "1");
        let err = Location::from_raw(&raw, 3).unwrap_err();
        assert!(matches!(err, DataError::InvalidCoordinate { field: "lon", .. }));

        let raw = RawLocation {
            id: None,
            ..RawLocation::new("", "", "1", "1")
        };
        assert_eq!(
            Location::from_raw(&raw, 7).unwrap_err(),
            DataError::MissingLocationId { row: 7 }
        );
    }

    #[test]
    fn map_node_delegates() {
        let nodes: Vec<MapNode> = vec![
            Location::new("A", "A", 1.0, 2.0).into(),
            ClusterNode {
                id: "c1".into(),
                zoom: 3,
                centroid: [5.0, 6.0],
                children: vec!["A".into()],
            }
            .into(),
        ];
        assert_eq!(nodes[0].id().as_str(), "A");
        assert_eq!(nodes[1].centroid(), [5.0, 6.0]);
    }

    #[test]
    fn raw_rows_accept_numbers_and_strings() {
        let rows: Vec<RawFlow> = serde_json::from_str(
            r#"[{"origin": "A", "dest": "B", "count": 3},
                {"origin": 1, "dest": "B", "count": "4"},
                {"origin": "A", "count": null}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].count.as_deref(), Some("3"));
        assert_eq!(rows[1].origin.as_deref(), Some("1"));
        assert_eq!(rows[2].dest, None);
        assert_eq!(rows[2].count, None);
    }

    #[test]
    fn internal_flow_detection() {
        assert!(Flow::new("A", "A", 1.0).is_internal());
        assert!(!Flow::new("A", "B", 1.0).is_internal());
    }
}
