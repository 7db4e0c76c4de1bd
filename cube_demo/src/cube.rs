//! Rainbow cube geometry

use frame_host::kit::Vertex;

/// Corners of a cube with half extent 1, colored by position
pub const VERTICES: [Vertex; 8] = [
    Vertex::new([-1.0, -1.0, -1.0], [0.0, 0.0, 0.0]),
    Vertex::new([1.0, -1.0, -1.0], [1.0, 0.0, 0.0]),
    Vertex::new([1.0, 1.0, -1.0], [1.0, 1.0, 0.0]),
    Vertex::new([-1.0, 1.0, -1.0], [0.0, 1.0, 0.0]),
    Vertex::new([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0]),
    Vertex::new([1.0, -1.0, 1.0], [1.0, 0.0, 1.0]),
    Vertex::new([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]),
    Vertex::new([-1.0, 1.0, 1.0], [0.0, 1.0, 1.0]),
];

/// Two counter-clockwise triangles per face, seen from outside
pub const INDICES: [u16; 36] = [
    4, 5, 6, 6, 7, 4, // +z
    1, 0, 3, 3, 2, 1, // -z
    5, 1, 2, 2, 6, 5, // +x
    0, 4, 7, 7, 3, 0, // -x
    7, 6, 2, 2, 3, 7, // +y
    0, 1, 5, 5, 4, 0, // -y
];

/// Wipe front speed in ordinals per unit of animation time
pub const WIPE_RATE: f32 = 4.0;
/// One step past the last ordinal, so the whole cube shows before wrapping
#[allow(clippy::cast_precision_loss)]
pub const WIPE_SPAN: f32 = VERTICES.len() as f32 + 1.0;

/// Whether the fragment shader discards pixels of the vertex with this ordinal
///
/// Mirrors `cube.frag`, where the ordinal is `gl_VertexIndex` passed through a
/// flat varying. GLSL `mod` floors, unlike `%` on floats.
#[allow(clippy::cast_precision_loss)]
pub fn wipe_discards(ordinal: u32, anim: f32) -> bool {
    let travelled = anim * WIPE_RATE;
    let front = travelled - WIPE_SPAN * (travelled / WIPE_SPAN).floor();
    ordinal as f32 > front
}

/// Leading vertices that survive the wipe at this animation time
pub fn visible_vertices(anim: f32) -> u32 {
    (0..VERTICES.len() as u32).take_while(|&ordinal| !wipe_discards(ordinal, anim)).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn position(index: u16) -> Vector3<f32> {
        Vector3::from(VERTICES[usize::from(index)].pos)
    }

    /// Every face normal must point away from the center for back-face culling
    #[test]
    fn test_triangles_wind_outward() {
        for triangle in INDICES.chunks_exact(3) {
            let [a, b, c] = [position(triangle[0]), position(triangle[1]), position(triangle[2])];
            let normal = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(&centroid) > 0.0, "triangle {triangle:?} faces inward");
        }
    }

    #[test]
    fn test_indices_in_range() {
        assert!(INDICES.iter().all(|&i| usize::from(i) < VERTICES.len()));
    }

    #[test]
    fn test_wipe_cutoff_at_ordinal_boundaries() {
        // front = 3.0
        assert!(!wipe_discards(3, 0.75));
        assert!(wipe_discards(4, 0.75));
        // front just short of 3
        assert!(wipe_discards(3, 0.74));
        assert!(!wipe_discards(2, 0.74));
    }

    #[test]
    fn test_wipe_shows_whole_cube_then_wraps() {
        // front = 8.0, the last ordinal
        assert!((0..8).all(|ordinal| !wipe_discards(ordinal, 2.0)));
        // front wraps back to 0 at anim * rate == span
        assert!(!wipe_discards(0, 2.25));
        assert!(wipe_discards(1, 2.25));
    }

    #[test]
    fn test_wipe_negative_time_floors_like_glsl() {
        // -0.25 * 4 = -1, mod 9 = 8
        assert!(!wipe_discards(7, -0.25));
        assert!(!wipe_discards(8, -0.25));
    }

    #[test]
    fn test_visible_vertices_follows_front() {
        assert_eq!(visible_vertices(0.0), 1);
        assert_eq!(visible_vertices(0.75), 4);
        assert_eq!(visible_vertices(2.0), 8);
        assert_eq!(visible_vertices(2.25), 1);
    }
}
