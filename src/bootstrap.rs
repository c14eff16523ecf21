//! Mounting a scene into a container and driving its frame loop.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use cgmath::Rad;

use crate::camera::PerspectiveCamera;
use crate::config::{Container, Dimensions, SceneConfig};
use crate::error::SceneError;
use crate::geometry::Geometry;
use crate::platform::{AnimationHandle, Element, ListenerHandle, Platform, Renderer};
use crate::scene::{Material, ObjectId, Scene};

/// Rotation applied to the demo cube on X and Y every frame.
pub const ROTATION_PER_FRAME: Rad<f32> = Rad(0.01);

struct SceneInner<P: Platform>
{
        platform: P,
        container: P::Element,

        renderer: RefCell<P::Renderer>,
        scene: RefCell<Scene>,
        camera: RefCell<PerspectiveCamera>,
        demo_object: ObjectId,

        animation: Cell<Option<AnimationHandle>>,
        resize_listener: Cell<Option<ListenerHandle>>,
        disposed: Cell<bool>,
        /// Set once the renderer's resources have actually been freed.
        released: Cell<bool>,
}

impl<P: Platform> SceneInner<P>
{
        fn schedule_frame(self: &Rc<Self>) -> anyhow::Result<AnimationHandle>
        {
                let weak = Rc::downgrade(self);

                self.platform.request_animation_frame(Box::new(move |timestamp| {
                        if let Some(inner) = weak.upgrade()
                        {
                                inner.frame(timestamp);
                        }
                }))
        }

        fn frame(
                self: &Rc<Self>,
                timestamp: f64,
        )
        {
                self.animation.set(None);

                if self.disposed.get()
                {
                        return;
                }

                if let Some(cube) = self.scene.borrow_mut().get_mut(self.demo_object)
                {
                        cube.rotate(ROTATION_PER_FRAME, ROTATION_PER_FRAME, Rad(0.0));
                }

                let rendered = self
                        .renderer
                        .borrow_mut()
                        .render(&self.scene.borrow(), &self.camera.borrow());

                if let Err(err) = rendered
                {
                        log::error!("Failed to render frame at {timestamp:.1}ms: {err:#}");
                }

                match self.schedule_frame()
                {
                        Ok(handle) => self.animation.set(Some(handle)),
                        Err(err) => log::error!("Failed to schedule the next frame: {err:#}"),
                }
        }

        fn cancel_frame(&self)
        {
                if let Some(handle) = self.animation.take()
                {
                        self.platform.cancel_animation_frame(handle);
                }
        }

        /// Re-measures the container and resizes camera and renderer to match.
        fn resize(&self)
        {
                if self.disposed.get()
                {
                        return;
                }

                let (width, height) = self.container.client_size();

                let Some(size) = Dimensions::new(width, height)
                else
                {
                        log::debug!("Ignoring resize to {width}x{height}");
                        return;
                };

                self.camera.borrow_mut().resize(size);
                self.renderer.borrow_mut().set_size(size);

                log::debug!("Scene resized to {size}");
        }
}

/// A mounted scene. Dropping the handle disposes it.
pub struct SceneHandle<P: Platform>
{
        inner: Rc<SceneInner<P>>,
}

impl<P: Platform> SceneHandle<P>
{
        /// Starts the frame loop. Does nothing if it is already running.
        pub fn start(&self)
        {
                if self.inner.disposed.get()
                {
                        log::warn!("start() called on a disposed scene");
                        return;
                }

                if self.inner.animation.get().is_some()
                {
                        return;
                }

                match self.inner.schedule_frame()
                {
                        Ok(handle) => self.inner.animation.set(Some(handle)),
                        Err(err) => log::error!("Failed to schedule a frame: {err:#}"),
                }
        }

        /// Cancels the scheduled frame, if any.
        pub fn stop(&self)
        {
                if self.inner.disposed.get()
                {
                        log::warn!("stop() called on a disposed scene");
                        return;
                }

                self.inner.cancel_frame();
        }

        /// Stops the loop, removes the resize listener, detaches the drawing
        /// surface and releases the renderer. Never fails; problems are logged.
        ///
        /// If the renderer is still borrowed through [`SceneHandle::renderer`]
        /// its release is skipped, and a later call retries it.
        pub fn dispose(&self)
        {
                let inner = &self.inner;

                if inner.released.get()
                {
                        log::debug!("Scene already disposed");
                        return;
                }

                inner.disposed.set(true);
                inner.cancel_frame();

                if let Some(listener) = inner.resize_listener.take()
                {
                        inner.platform.remove_resize_listener(listener);
                }

                match inner.renderer.try_borrow()
                {
                        Ok(renderer) =>
                        {
                                let surface = renderer.surface();

                                if let Some(parent) = surface.parent()
                                {
                                        if let Err(err) = parent.remove_child(surface)
                                        {
                                                log::error!("Failed to detach the drawing surface: {err:#}");
                                        }
                                }
                        }
                        Err(_) => log::error!("Renderer is mutably borrowed, the surface stays attached"),
                }

                let Ok(mut renderer) = inner.renderer.try_borrow_mut()
                else
                {
                        log::warn!("Renderer is still borrowed, dispose again to release it");
                        return;
                };

                if let Err(err) = renderer.dispose()
                {
                        log::error!("Failed to release the renderer: {err:#}");
                }

                inner.released.set(true);

                log::info!("Scene disposed");
        }

        pub fn is_running(&self) -> bool
        {
                self.inner.animation.get().is_some()
        }

        pub fn is_disposed(&self) -> bool
        {
                self.inner.disposed.get()
        }

        pub fn scene(&self) -> Ref<'_, Scene>
        {
                self.inner.scene.borrow()
        }

        pub fn camera(&self) -> Ref<'_, PerspectiveCamera>
        {
                self.inner.camera.borrow()
        }

        pub fn renderer(&self) -> Ref<'_, P::Renderer>
        {
                self.inner.renderer.borrow()
        }

        /// The element the drawing surface was mounted into.
        pub fn container(&self) -> &P::Element
        {
                &self.inner.container
        }

        /// The rotating cube.
        pub fn demo_object(&self) -> ObjectId
        {
                self.inner.demo_object
        }

        pub fn size(&self) -> Dimensions
        {
                self.inner.renderer.borrow().size()
        }
}

impl<P: Platform> Drop for SceneHandle<P>
{
        fn drop(&mut self)
        {
                if !self.inner.released.get()
                {
                        self.dispose();
                }
        }
}

impl<P: Platform> fmt::Debug for SceneHandle<P>
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                f.debug_struct("SceneHandle")
                        .field("container", &self.inner.container)
                        .field("running", &self.is_running())
                        .field("disposed", &self.is_disposed())
                        .finish_non_exhaustive()
        }
}

/// Mounts a renderer, a camera and a scene holding one rotating cube into the
/// configured container.
///
/// Only an unresolvable container selector, a renderer that cannot be created
/// or a surface that cannot be mounted fail. Background problems are logged
/// and the scene falls back to black.
pub async fn create_scene<P: Platform>(
        platform: &P,
        config: SceneConfig<P::Element>,
) -> Result<SceneHandle<P>, SceneError>
{
        let SceneConfig {
                container,
                width,
                height,
                background,
        } = config;

        let container = match container
        {
                Container::Body => platform.body(),
                Container::Element(element) => element,
                Container::Selector(selector) => platform
                        .query_selector(&selector)
                        .ok_or(SceneError::ContainerNotFound {
                                selector,
                        })?,
        };

        let size = Dimensions::resolve(width, height, container.client_size());

        log::info!("Mounting {size} scene into {container:?}");

        let mut renderer = platform
                .create_renderer(size)
                .await
                .map_err(SceneError::Renderer)?;

        if let Err(err) = container.append_child(renderer.surface())
        {
                if let Err(dispose_err) = renderer.dispose()
                {
                        log::error!("Failed to release the renderer: {dispose_err:#}");
                }
                return Err(SceneError::Mount(err));
        }

        let mut scene = Scene::new();
        scene.background = background.map(|background| background.resolve());

        let camera = PerspectiveCamera::for_viewport(size);

        let demo_object = scene.add(Geometry::cuboid(1.0, 1.0, 1.0), Material::Normal);

        let handle = SceneHandle {
                inner: Rc::new(SceneInner {
                        platform: platform.clone(),
                        container,
                        renderer: RefCell::new(renderer),
                        scene: RefCell::new(scene),
                        camera: RefCell::new(camera),
                        demo_object,
                        animation: Cell::new(None),
                        resize_listener: Cell::new(None),
                        disposed: Cell::new(false),
                        released: Cell::new(false),
                }),
        };

        let weak = Rc::downgrade(&handle.inner);
        let listener = platform
                .add_resize_listener(Box::new(move || {
                        if let Some(inner) = weak.upgrade()
                        {
                                inner.resize();
                        }
                }))
                .map_err(SceneError::Mount)?;

        handle.inner.resize_listener.set(Some(listener));

        Ok(handle)
}
