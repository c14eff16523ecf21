use cgmath::*;

use crate::config::Dimensions;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::from_cols(
    Vector4::new(1.0, 0.0, 0.0, 0.0),
    Vector4::new(0.0, 1.0, 0.0, 0.0),
    Vector4::new(0.0, 0.0, 0.5, 0.0),
    Vector4::new(0.0, 0.0, 0.5, 1.0),
);

/// A right-handed perspective camera looking from `position` at `target`.
///
/// The projection matrix is cached; call
/// [`PerspectiveCamera::update_projection_matrix`] after changing `fovy`,
/// `aspect`, `znear` or `zfar` by hand. [`PerspectiveCamera::resize`] does it
/// for you.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera
{
        pub fovy: Deg<f32>,
        pub aspect: f32,
        pub znear: f32,
        pub zfar: f32,

        pub position: Point3<f32>,
        pub target: Point3<f32>,
        pub up: Vector3<f32>,

        projection: Matrix4<f32>,
}

impl PerspectiveCamera
{
        pub const DEFAULT_FOVY: Deg<f32> = Deg(50.0);
        pub const DEFAULT_ZNEAR: f32 = 0.1;
        pub const DEFAULT_ZFAR: f32 = 1000.0;
        pub const DEFAULT_POSITION: Point3<f32> = Point3::new(0.0, 1.6, 3.0);

        pub fn new<F: Into<Deg<f32>>>(
                fovy: F,
                aspect: f32,
                znear: f32,
                zfar: f32,
        ) -> Self
        {
                let mut camera = Self {
                        fovy: fovy.into(),
                        aspect,
                        znear,
                        zfar,
                        position: Point3::new(0.0, 0.0, 0.0),
                        target: Point3::new(0.0, 0.0, -1.0),
                        up: Vector3::unit_y(),
                        projection: Matrix4::identity(),
                };

                camera.update_projection_matrix();

                camera
        }

        /// The bootstrap camera: 50° vertical fov, clip planes 0.1 / 1000,
        /// placed at (0, 1.6, 3) and looking at the origin.
        pub fn for_viewport(size: Dimensions) -> Self
        {
                let mut camera = Self::new(
                        Self::DEFAULT_FOVY,
                        size.aspect(),
                        Self::DEFAULT_ZNEAR,
                        Self::DEFAULT_ZFAR,
                );

                camera.position = Self::DEFAULT_POSITION;
                camera.look_at(Point3::origin());

                camera
        }

        pub fn look_at(
                &mut self,
                target: Point3<f32>,
        )
        {
                self.target = target;
        }

        pub fn resize(
                &mut self,
                size: Dimensions,
        )
        {
                self.aspect = size.aspect();
                self.update_projection_matrix();
        }

        pub fn update_projection_matrix(&mut self)
        {
                self.projection =
                        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        }

        pub fn projection_matrix(&self) -> Matrix4<f32>
        {
                self.projection
        }

        pub fn view_matrix(&self) -> Matrix4<f32>
        {
                Matrix4::look_at_rh(self.position, self.target, self.up)
        }

        pub fn view_projection_matrix(&self) -> Matrix4<f32>
        {
                self.projection * self.view_matrix()
        }
}

// We can't use cgmath with bytemuck directly, so the matrices are stored as
// plain 4x4 arrays.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform
{
        pub view_proj: [[f32; 4]; 4],
        pub view: [[f32; 4]; 4],
}

impl CameraUniform
{
        pub fn new() -> Self
        {
                Self {
                        view_proj: Matrix4::identity().into(),
                        view: Matrix4::identity().into(),
                }
        }

        pub fn update(
                &mut self,
                camera: &PerspectiveCamera,
        )
        {
                self.view_proj = camera.view_projection_matrix().into();
                self.view = camera.view_matrix().into();
        }
}

impl Default for CameraUniform
{
        fn default() -> Self
        {
                Self::new()
        }
}

#[cfg(test)]
mod tests
{
        use super::*;
        use approx::assert_relative_eq;

        #[test]
        fn viewport_camera_defaults()
        {
                let camera = PerspectiveCamera::for_viewport(Dimensions::new(1024, 768).unwrap());

                assert_eq!(camera.fovy, Deg(50.0));
                assert_relative_eq!(camera.aspect, 1024.0 / 768.0);
                assert_relative_eq!(camera.znear, 0.1);
                assert_relative_eq!(camera.zfar, 1000.0);
                assert_eq!(camera.position, Point3::new(0.0, 1.6, 3.0));
                assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        }

        #[test]
        fn origin_projects_to_screen_center()
        {
                let camera = PerspectiveCamera::for_viewport(Dimensions::DEFAULT);

                let clip = camera.view_projection_matrix() * Vector4::new(0.0, 0.0, 0.0, 1.0);
                let ndc = clip.truncate() / clip.w;

                assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
                assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
                assert!(ndc.z > 0.0 && ndc.z < 1.0);
        }

        #[test]
        fn resize_updates_cached_projection()
        {
                let mut camera = PerspectiveCamera::for_viewport(Dimensions::DEFAULT);
                let before = camera.projection_matrix();

                camera.resize(Dimensions::new(400, 400).unwrap());

                assert_relative_eq!(camera.aspect, 1.0);
                assert_ne!(before, camera.projection_matrix());
                // Square viewport: x and y scale are equal.
                assert_relative_eq!(
                        camera.projection_matrix().x.x,
                        camera.projection_matrix().y.y,
                        epsilon = 1e-6
                );
        }

        #[test]
        fn uniform_tracks_camera()
        {
                let camera = PerspectiveCamera::for_viewport(Dimensions::DEFAULT);
                let mut uniform = CameraUniform::new();

                uniform.update(&camera);

                let expected: [[f32; 4]; 4] = camera.view_projection_matrix().into();
                assert_eq!(uniform.view_proj, expected);
        }
}
