//! Shared fixtures: three countries, one of them the excluded region.

use crate::data::topology::Topology;
use crate::data::{Accessor, DataRow, Geography};
use crate::map::GeoIndex;

pub const TOPOLOGY: &str = r#"{
    "type": "Topology",
    "arcs": [
        [[60, 30], [70, 30], [70, 38], [60, 38], [60, 30]],
        [[19, 39], [21, 39], [21, 42], [19, 42], [19, 39]],
        [[25, 35], [25.5, 35], [25.5, 35.5], [25, 35.5], [25, 35]],
        [[-60, -80], [60, -80], [60, -70], [-60, -70], [-60, -80]]
    ],
    "objects": {
        "countries": {
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Polygon", "arcs": [[0]], "id": "004", "properties": {"name": "Afghanistan"}},
                {"type": "MultiPolygon", "arcs": [[[2]], [[1]]], "id": "008", "properties": {"name": "Albania"}},
                {"type": "Polygon", "arcs": [[3]], "id": "010", "properties": {"name": "Antarctica"}}
            ]
        }
    }
}"#;

pub fn topology() -> Topology {
    let mut bytes = TOPOLOGY.as_bytes().to_vec();
    simd_json::serde::from_slice(&mut bytes).expect("fixture topology parses")
}

pub fn geography() -> Geography {
    Geography::Topology(topology())
}

pub fn index() -> GeoIndex {
    GeoIndex::build(geography(), "countries", "010", "643").expect("fixture index builds")
}

pub fn rows() -> Vec<DataRow> {
    vec![
        DataRow::new([("id", "004"), ("name", "Afghanistan"), ("pop_est", "100")]),
        DataRow::new([("id", "008"), ("name", "Albania"), ("pop_est", "50")]),
        DataRow::new([("id", "010"), ("name", "Antarctica"), ("pop_est", "9999999")]),
    ]
}

pub fn accessor() -> Accessor {
    Accessor::default()
}
