//! Road network: intersections, roads, and the travel-time oracle.
//!
//! This module defines the consumed interfaces of C1 (`Map`, `TravelTimeOracle`)
//! plus `InMemoryMap`, a reference implementation good enough to run the kernel
//! standalone. A production deployment is expected to swap this for a real
//! OSM/KML-derived network; the kernel never depends on the concrete type, only
//! on the traits.

use std::collections::HashMap;
use std::sync::Mutex;

use pathfinding::directed::dijkstra::dijkstra_all;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub type IntersectionId = u32;
pub type RoadId = u32;

/// Node with stable id and geographic coordinates. Immutable after map build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub id: IntersectionId,
    pub lat: f64,
    pub lon: f64,
}

/// Directed edge from intersection `from` to `to` with a traversal duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub from: IntersectionId,
    pub to: IntersectionId,
    /// Traversal duration in seconds.
    pub duration_secs: u64,
}

/// A point expressed as (road, travel_time_from_start_intersection). All positions
/// referenced by the kernel use this form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationOnRoad {
    pub road: RoadId,
    pub travel_time_from_start: u64,
}

impl LocationOnRoad {
    pub fn start_of(road: RoadId) -> Self {
        Self {
            road,
            travel_time_from_start: 0,
        }
    }
}

/// Applies the §6 `speedReductionFactor` (a multiplier on vehicle speed, in
/// `(0, 1]`) to a raw travel-time duration: slower vehicles take
/// proportionally longer, so the duration is divided by the factor rather
/// than multiplied. A factor of `1.0` is a no-op.
pub fn apply_speed_reduction(duration_secs: u64, factor: f64) -> u64 {
    if factor >= 1.0 {
        return duration_secs;
    }
    ((duration_secs as f64) / factor).round() as u64
}

/// Consumed interface: the road network itself.
pub trait Map: Send + Sync {
    fn intersections(&self) -> &[Intersection];
    fn intersection(&self, id: IntersectionId) -> Option<&Intersection>;
    fn roads_from(&self, id: IntersectionId) -> &[Road];
    fn road(&self, id: RoadId) -> Option<&Road>;
}

/// Consumed interface: `traveltime(fromRoadPos, toRoadPos) -> seconds`.
pub trait TravelTimeOracle: Send + Sync {
    fn travel_time(&self, from: LocationOnRoad, to: LocationOnRoad) -> u64;
}

/// The dispatcher only ever needs both capabilities together; this blanket
/// impl lets it store a single trait object (`Arc<dyn MapAndOracle>`)
/// instead of two.
pub trait MapAndOracle: Map + TravelTimeOracle {}
impl<T: Map + TravelTimeOracle> MapAndOracle for T {}

/// In-memory directed graph, the reference `Map` + `TravelTimeOracle` implementation.
///
/// `traveltime` is computed as: time to finish the origin road, plus the
/// shortest-path sum of `Road.duration_secs` from the origin road's end
/// intersection to the destination road's start intersection, plus the time
/// already elapsed along the destination road. Same-road positions with
/// `from.travel_time_from_start <= to.travel_time_from_start` take the direct
/// shortcut. Shortest-path results are cached per source intersection (Dijkstra
/// over the whole graph is run once and memoized, not per query).
pub struct InMemoryMap {
    intersections: Vec<Intersection>,
    roads_from_index: HashMap<IntersectionId, Vec<Road>>,
    road_by_id: HashMap<RoadId, Road>,
    shortest_path_cache: Mutex<HashMap<IntersectionId, HashMap<IntersectionId, u64>>>,
}

impl InMemoryMap {
    pub fn new(intersections: Vec<Intersection>, roads: Vec<Road>) -> Self {
        let mut roads_from_index: HashMap<IntersectionId, Vec<Road>> = HashMap::new();
        let mut road_by_id = HashMap::new();
        for road in &roads {
            roads_from_index.entry(road.from).or_default().push(*road);
            road_by_id.insert(road.id, *road);
        }
        Self {
            intersections,
            roads_from_index,
            road_by_id,
            shortest_path_cache: Mutex::new(HashMap::new()),
        }
    }

    fn distances_from(&self, source: IntersectionId) -> HashMap<IntersectionId, u64> {
        let mut cache = self.shortest_path_cache.lock().expect("shortest path cache poisoned");
        if let Some(dist) = cache.get(&source) {
            return dist.clone();
        }
        let empty = Vec::new();
        let reachable = dijkstra_all(&source, |node| {
            self.roads_from_index
                .get(node)
                .unwrap_or(&empty)
                .iter()
                .map(|road| (road.to, road.duration_secs))
                .collect::<Vec<_>>()
        });
        let mut dist: HashMap<IntersectionId, u64> = reachable
            .into_iter()
            .map(|(node, (_, cost))| (node, cost))
            .collect();
        dist.insert(source, 0);
        cache.insert(source, dist.clone());
        dist
    }

    fn shortest_path_secs(&self, from: IntersectionId, to: IntersectionId) -> Option<u64> {
        if from == to {
            return Some(0);
        }
        self.distances_from(from).get(&to).copied()
    }
}

impl Map for InMemoryMap {
    fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.iter().find(|i| i.id == id)
    }

    fn roads_from(&self, id: IntersectionId) -> &[Road] {
        self.roads_from_index.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn road(&self, id: RoadId) -> Option<&Road> {
        self.road_by_id.get(&id)
    }
}

impl TravelTimeOracle for InMemoryMap {
    fn travel_time(&self, from: LocationOnRoad, to: LocationOnRoad) -> u64 {
        if from.road == to.road && from.travel_time_from_start <= to.travel_time_from_start {
            return to.travel_time_from_start - from.travel_time_from_start;
        }

        let Some(from_road) = self.road_by_id.get(&from.road) else {
            return u64::MAX;
        };
        let Some(to_road) = self.road_by_id.get(&to.road) else {
            return u64::MAX;
        };

        let finish_from_road = from_road.duration_secs.saturating_sub(from.travel_time_from_start);
        let Some(transit) = self.shortest_path_secs(from_road.to, to_road.from) else {
            return u64::MAX;
        };
        finish_from_road + transit + to.travel_time_from_start
    }
}

/// On-disk shape of the §6 "map path" config key: a flat list of
/// intersections and roads, deserialized with `serde`/`toml`. This is the
/// reference map format the bundled CLI reads — not an OSM/KML pipeline
/// (§1 out of scope) — good enough to run the kernel standalone.
#[derive(Debug, Deserialize)]
pub struct MapFile {
    pub intersections: Vec<Intersection>,
    pub roads: Vec<Road>,
}

impl MapFile {
    pub fn into_map(self) -> InMemoryMap {
        InMemoryMap::new(self.intersections, self.roads)
    }
}

/// Parses a TOML map file (`[[intersections]]` / `[[roads]]` tables) into an
/// `InMemoryMap`.
pub fn load_map_from_toml(contents: &str) -> Result<InMemoryMap, DataError> {
    let file: MapFile = toml::from_str(contents).map_err(|e| DataError::MapParseError(e.to_string()))?;
    Ok(file.into_map())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_map() -> InMemoryMap {
        // X(0) --10s--> M(1) --10s--> Y(2)
        let intersections = vec![
            Intersection { id: 0, lat: 0.0, lon: 0.0 },
            Intersection { id: 1, lat: 0.0, lon: 1.0 },
            Intersection { id: 2, lat: 0.0, lon: 2.0 },
        ];
        let roads = vec![
            Road { id: 0, from: 0, to: 1, duration_secs: 10 },
            Road { id: 1, from: 1, to: 2, duration_secs: 10 },
        ];
        InMemoryMap::new(intersections, roads)
    }

    #[test]
    fn same_point_has_zero_travel_time() {
        let map = line_map();
        let p = LocationOnRoad::start_of(0);
        assert_eq!(map.travel_time(p, p), 0);
    }

    #[test]
    fn same_road_direct_shortcut() {
        let map = line_map();
        let a = LocationOnRoad { road: 0, travel_time_from_start: 2 };
        let b = LocationOnRoad { road: 0, travel_time_from_start: 7 };
        assert_eq!(map.travel_time(a, b), 5);
    }

    #[test]
    fn crosses_intersection_via_shortest_path() {
        let map = line_map();
        let start = LocationOnRoad::start_of(0);
        let end = LocationOnRoad::start_of(1);
        // finish road 0 (10s) + 0s transit (already at intersection 1) + 0 into road 1
        assert_eq!(map.travel_time(start, end), 10);
    }

    #[test]
    fn unreachable_destination_is_infinite() {
        let intersections = vec![
            Intersection { id: 0, lat: 0.0, lon: 0.0 },
            Intersection { id: 1, lat: 0.0, lon: 1.0 },
        ];
        // No road connects 0 to 1.
        let roads = vec![Road { id: 5, from: 1, to: 0, duration_secs: 1 }];
        let map = InMemoryMap::new(intersections, roads);
        let start = LocationOnRoad::start_of(5);
        let target = LocationOnRoad { road: 99, travel_time_from_start: 0 };
        assert_eq!(map.travel_time(start, target), u64::MAX);
    }

    #[test]
    fn loads_a_well_formed_toml_map_file() {
        let toml = r#"
            [[intersections]]
            id = 0
            lat = 0.0
            lon = 0.0

            [[intersections]]
            id = 1
            lat = 0.0
            lon = 1.0

            [[roads]]
            id = 0
            from = 0
            to = 1
            duration_secs = 10
        "#;
        let map = load_map_from_toml(toml).unwrap();
        assert_eq!(map.intersections().len(), 2);
        assert_eq!(map.road(0).unwrap().duration_secs, 10);
    }

    #[test]
    fn rejects_malformed_toml_map_file() {
        let err = load_map_from_toml("not = [valid").unwrap_err();
        assert!(matches!(err, DataError::MapParseError(_)));
    }

    #[test]
    fn speed_reduction_lengthens_duration() {
        assert_eq!(apply_speed_reduction(100, 0.5), 200);
        assert_eq!(apply_speed_reduction(100, 1.0), 100);
    }
}
