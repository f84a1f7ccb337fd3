//! Hand-rolled Wavefront OBJ parser (spec.md §4.4): the dialect supports exactly `v`/`vn`/`f`
//! lines, expanding faces into flat position/normal buffers bound as group 2 storage buffers. No
//! crate is pulled in for this — the teacher's own `ply.rs` hand-rolls its point-cloud format the
//! same way, and this format is smaller still.

use crate::error::{EngineError, Result};
use glam::Vec3;
use std::path::{Path, PathBuf};

/// A loaded model: flat, triangle-expanded position and normal buffers of equal length, ready to
/// upload as the two group-2 storage buffers for this model's slot.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

/// Parses OBJ text into a [`Model`]. Faces are triangle-fan expanded if they have more than 3
/// vertices. Missing normals are computed per-face (flat shading) rather than erroring, since the
/// dialect has no use for a partially-loaded model (spec.md §9: bounds/validity checking beyond
/// this is left to the downstream WGSL compiler).
pub fn parse_obj(text: &str, path: &str) -> Result<Model> {
    let mut raw_positions: Vec<Vec3> = Vec::new();
    let mut raw_normals: Vec<Vec3> = Vec::new();
    let mut faces: Vec<Vec<(i64, Option<i64>)>> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let tag = parts.next().unwrap_or("");
        match tag {
            "v" => raw_positions.push(parse_vec3(parts, path, line_no)?),
            "vn" => raw_normals.push(parse_vec3(parts, path, line_no)?),
            "f" => {
                let mut verts = Vec::new();
                for token in parts {
                    verts.push(parse_face_vertex(token, path, line_no)?);
                }
                if verts.len() < 3 {
                    return Err(EngineError::ObjParse {
                        path: PathBuf::from(path),
                        message: format!("line {}: face has fewer than 3 vertices", line_no + 1),
                    });
                }
                faces.push(verts);
            }
            _ => continue,
        }
    }

    // When the file carries no `vn` lines, compute one normal per raw vertex by summing each
    // referencing face's cross product into it and normalizing once at the end (spec.md §4.4),
    // not a flat per-triangle normal — this must happen before face expansion duplicates
    // vertices, since the accumulation is keyed on the original `v` index.
    let computed_normals = if raw_normals.is_empty() {
        let mut accum = vec![Vec3::ZERO; raw_positions.len()];
        for face in &faces {
            let resolved: Vec<usize> = face
                .iter()
                .map(|&(p, _)| resolve_index(p, raw_positions.len(), path))
                .collect::<Result<_>>()?;
            if resolved.len() >= 3 {
                let a = raw_positions[resolved[0]];
                let b = raw_positions[resolved[1]];
                let c = raw_positions[resolved[2]];
                let face_normal = (b - a).cross(c - a);
                for &ri in &resolved {
                    accum[ri] += face_normal;
                }
            }
        }
        Some(accum.into_iter().map(|n| n.normalize_or_zero()).collect::<Vec<_>>())
    } else {
        None
    };

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    for face in &faces {
        // Triangle-fan expansion: (0, i, i+1) for i in 1..len-1.
        for i in 1..face.len() - 1 {
            for &idx in &[0, i, i + 1] {
                let (pos_idx, norm_idx) = face[idx];
                let p = resolve_index(pos_idx, raw_positions.len(), path)?;
                positions.push(raw_positions[p]);
                match (&computed_normals, norm_idx) {
                    (Some(computed), _) => normals.push(computed[p]),
                    (None, Some(n)) => {
                        let n = resolve_index(n, raw_normals.len(), path)?;
                        normals.push(raw_normals[n]);
                    }
                    (None, None) => normals.push(Vec3::ZERO),
                }
            }
        }
    }

    Ok(Model { positions, normals })
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>, path: &str, line_no: usize) -> Result<Vec3> {
    let err = || EngineError::ObjParse {
        path: PathBuf::from(path),
        message: format!("line {}: expected 3 floats", line_no + 1),
    };
    let x: f32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let y: f32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let z: f32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    Ok(Vec3::new(x, y, z))
}

/// Parses one `f` line's vertex token (`v`, `v/vt`, `v/vt/vn`, or `v//vn`) into its 1-based
/// position index and optional normal index.
fn parse_face_vertex(token: &str, path: &str, line_no: usize) -> Result<(i64, Option<i64>)> {
    let err = || EngineError::ObjParse {
        path: PathBuf::from(path),
        message: format!("line {}: malformed face vertex `{token}`", line_no + 1),
    };
    let mut fields = token.split('/');
    let v: i64 = fields.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let _vt = fields.next();
    let vn = match fields.next() {
        Some("") | None => None,
        Some(n) => Some(n.parse::<i64>().map_err(|_| err())?),
    };
    Ok((v, vn))
}

/// OBJ indices are 1-based and may be negative (relative to the end of the list so far).
fn resolve_index(index: i64, len: usize, path: &str) -> Result<usize> {
    let resolved = if index > 0 { index - 1 } else { len as i64 + index };
    if resolved < 0 || resolved as usize >= len {
        return Err(EngineError::ObjParse {
            path: PathBuf::from(path),
            message: format!("vertex index {index} out of range (have {len})"),
        });
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_triangle() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = parse_obj(obj, "tri.obj").unwrap();
        assert_eq!(model.positions.len(), 3);
        assert_eq!(model.normals.len(), 3);
        assert_eq!(model.positions[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn fan_expands_a_quad_into_two_triangles() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let model = parse_obj(obj, "quad.obj").unwrap();
        assert_eq!(model.positions.len(), 6);
    }

    #[test]
    fn uses_explicit_vertex_normals_when_present() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let model = parse_obj(obj, "tri.obj").unwrap();
        assert_eq!(model.normals[0], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn negative_indices_resolve_relative_to_current_count() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let model = parse_obj(obj, "tri.obj").unwrap();
        assert_eq!(model.positions[0], Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let obj = "v 0 0 0\nf 1 2 3\n";
        assert!(parse_obj(obj, "bad.obj").is_err());
    }
}
