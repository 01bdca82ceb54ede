use glam::{DVec3, Vec3};

/// Subtract `offset` from world-space positions (f64 math) and narrow to f32.
pub fn offset_positions(world: &[f64], offset: [f64; 3]) -> Vec<f32> {
    world
        .chunks_exact(3)
        .flat_map(|p| {
            let local = DVec3::new(p[0], p[1], p[2]) - DVec3::from_array(offset);
            local.as_vec3().to_array()
        })
        .collect()
}

/// Convert from right-handed Z-up (geodata) to right-handed Y-up (glTF).
///
/// Transform: `(x, y, z)` → `(x, z, -y)`
pub fn swap_z_up_to_y_up(buffer: &mut [f32]) {
    for v in buffer.chunks_exact_mut(3) {
        let y = v[1];
        let z = v[2];
        v[1] = z;
        v[2] = -y;
    }
}

/// Flat per-face normals for a triangle soup, repeated for each corner.
///
/// Degenerate triangles get a zero normal.
pub fn face_normals(positions: &[f32]) -> Vec<f32> {
    let mut normals = Vec::with_capacity(positions.len());
    for tri in positions.chunks_exact(9) {
        let a = Vec3::from_slice(&tri[0..3]);
        let b = Vec3::from_slice(&tri[3..6]);
        let c = Vec3::from_slice(&tri[6..9]);
        let n = (b - a).cross(c - a).normalize_or_zero();
        for _ in 0..3 {
            normals.extend_from_slice(&n.to_array());
        }
    }
    normals
}
