use crate::geometry::{Geometry, vertex::Vertex};

/// Face normal and the two in-plane axes, chosen so that `u x v = normal`
/// and the corners below wind counter-clockwise seen from outside.
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]), // +X
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]), // -X
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]), // +Y
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]), // -Y
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),  // +Z
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), // -Z
];

const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

/// Four vertices per face so every face carries its own flat normal.
pub fn cuboid(
        width: f32,
        height: f32,
        depth: f32,
) -> Geometry
{
        let half = [width * 0.5, height * 0.5, depth * 0.5];

        let mut vertices = Vec::with_capacity(FACES.len() * CORNERS.len());
        let mut indices = Vec::<u16>::with_capacity(FACES.len() * 6);

        for (normal, u, v) in FACES
        {
                let base = vertices.len() as u16;

                for (su, sv) in CORNERS
                {
                        let position = std::array::from_fn(|i| {
                                (normal[i] + su * u[i] + sv * v[i]) * half[i]
                        });

                        vertices.push(Vertex {
                                position,
                                normal,
                        });
                }

                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Geometry::new(format!("box-{width}x{height}x{depth}"), vertices, indices)
}

#[cfg(test)]
mod tests
{
        use super::*;
        use cgmath::{InnerSpace, Vector3};

        #[test]
        fn unit_cube_counts()
        {
                let cube = cuboid(1.0, 1.0, 1.0);

                assert_eq!(cube.get_vertex_count(), 24);
                assert_eq!(cube.get_index_count(), 36);
                assert!(cube.indices.iter().all(|i| (*i as usize) < cube.vertices.len()));
        }

        #[test]
        fn vertices_lie_on_the_box_surface()
        {
                let cube = cuboid(2.0, 4.0, 6.0);

                for v in &cube.vertices
                {
                        assert_eq!(v.position[0].abs(), 1.0);
                        assert_eq!(v.position[1].abs(), 2.0);
                        assert_eq!(v.position[2].abs(), 3.0);
                }
        }

        #[test]
        fn triangles_wind_counter_clockwise_around_their_normal()
        {
                let cube = cuboid(1.0, 1.0, 1.0);

                for [a, b, c] in cube.triangles()
                {
                        let a_pos = Vector3::from(a.position);
                        let winding = (Vector3::from(b.position) - a_pos)
                                .cross(Vector3::from(c.position) - a_pos)
                                .normalize();

                        assert_eq!(winding, Vector3::from(a.normal));
                        assert_eq!(a.normal, b.normal);
                        assert_eq!(a.normal, c.normal);
                }
        }

        #[test]
        fn normals_point_outward()
        {
                let cube = cuboid(1.0, 1.0, 1.0);

                for v in &cube.vertices
                {
                        let outward = Vector3::from(v.position).dot(Vector3::from(v.normal));
                        assert!(outward > 0.0);
                }
        }
}
