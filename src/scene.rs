//! Scene graph: a flat list of objects plus an optional background.

use cgmath::{EuclideanSpace, Euler, Matrix4, Point3, Rad, Vector3};

use crate::color::Color;
use crate::geometry::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// How an object's surface is shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Material
{
        /// Colors each fragment by its view-space normal. Useful for debugging
        /// orientation without any lighting.
        #[default]
        Normal,
}

#[derive(Debug, Clone)]
pub struct SceneObject
{
        pub id: ObjectId,
        pub geometry: Geometry,
        pub material: Material,

        pub position: Point3<f32>,
        /// Applied in X, Y, Z order.
        pub rotation: Euler<Rad<f32>>,
        pub scale: Vector3<f32>,
}

impl SceneObject
{
        pub fn model_matrix(&self) -> Matrix4<f32>
        {
                let translation = Matrix4::from_translation(self.position.to_vec());

                let rotation = Matrix4::from_angle_x(self.rotation.x)
                        * Matrix4::from_angle_y(self.rotation.y)
                        * Matrix4::from_angle_z(self.rotation.z);

                let scale = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);

                translation * rotation * scale
        }

        pub fn rotate(
                &mut self,
                x: Rad<f32>,
                y: Rad<f32>,
                z: Rad<f32>,
        )
        {
                self.rotation.x += x;
                self.rotation.y += y;
                self.rotation.z += z;
        }
}

#[derive(Debug, Default)]
pub struct Scene
{
        /// Clear color. The renderer uses black when unset.
        pub background: Option<Color>,

        objects: Vec<SceneObject>,
        next_id: u32,
}

impl Scene
{
        pub fn new() -> Self
        {
                Self::default()
        }

        /// Adds an object at the origin with no rotation and unit scale.
        pub fn add(
                &mut self,
                geometry: Geometry,
                material: Material,
        ) -> ObjectId
        {
                let id = ObjectId(self.next_id);
                self.next_id += 1;

                self.objects.push(SceneObject {
                        id,
                        geometry,
                        material,
                        position: Point3::origin(),
                        rotation: Euler::new(Rad(0.0), Rad(0.0), Rad(0.0)),
                        scale: Vector3::new(1.0, 1.0, 1.0),
                });

                id
        }

        pub fn remove(
                &mut self,
                id: ObjectId,
        ) -> Option<SceneObject>
        {
                let index = self.objects.iter().position(|o| o.id == id)?;

                Some(self.objects.remove(index))
        }

        pub fn get(
                &self,
                id: ObjectId,
        ) -> Option<&SceneObject>
        {
                self.objects.iter().find(|o| o.id == id)
        }

        pub fn get_mut(
                &mut self,
                id: ObjectId,
        ) -> Option<&mut SceneObject>
        {
                self.objects.iter_mut().find(|o| o.id == id)
        }

        pub fn objects(&self) -> &[SceneObject]
        {
                &self.objects
        }

        pub fn len(&self) -> usize
        {
                self.objects.len()
        }

        pub fn is_empty(&self) -> bool
        {
                self.objects.is_empty()
        }
}
