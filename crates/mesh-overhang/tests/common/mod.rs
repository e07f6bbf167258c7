//! Shared fixtures for integration tests.

#![allow(dead_code)]

use mesh_overhang::{LoadOptions, Mesh, RawTriangle};
use nalgebra::Point3;

/// Corner positions of an axis-aligned cube with edge `s`, bottom at `z0`.
pub fn cube_corners(s: f64, z0: f64) -> [[f64; 3]; 8] {
    [
        [0.0, 0.0, z0],
        [s, 0.0, z0],
        [s, s, z0],
        [0.0, s, z0],
        [0.0, 0.0, z0 + s],
        [s, 0.0, z0 + s],
        [s, s, z0 + s],
        [0.0, s, z0 + s],
    ]
}

/// Outward-wound faces of the cube. The first two are the bottom.
pub const CUBE_FACES: [[usize; 3]; 12] = [
    [0, 2, 1],
    [0, 3, 2],
    [4, 5, 6],
    [4, 6, 7],
    [0, 1, 5],
    [0, 5, 4],
    [3, 6, 2],
    [3, 7, 6],
    [0, 4, 7],
    [0, 7, 3],
    [1, 2, 6],
    [1, 6, 5],
];

/// Records of a cube as a reader would produce them.
pub fn cube_records(s: f64, z0: f64) -> Vec<RawTriangle> {
    let v = cube_corners(s, z0);
    CUBE_FACES
        .iter()
        .map(|&[a, b, c]| {
            RawTriangle::from_corners(Point3::from(v[a]), Point3::from(v[b]), Point3::from(v[c]))
        })
        .collect()
}

/// Cube loaded with the default (strict, edge-tracking) options.
pub fn cube(s: f64, z0: f64) -> Mesh {
    Mesh::from_records(&cube_records(s, z0), &LoadOptions::default()).unwrap()
}

/// Write a binary STL of the records into `path` without going through the library.
pub fn write_binary_stl(path: &std::path::Path, records: &[RawTriangle]) {
    let mut out = vec![0u8; 80];
    out.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for r in records {
        let mut push = |x: f64| out.extend_from_slice(&(x as f32).to_le_bytes());
        push(r.normal.x);
        push(r.normal.y);
        push(r.normal.z);
        for p in &r.vertices {
            push(p.x);
            push(p.y);
            push(p.z);
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    std::fs::write(path, out).unwrap();
}
