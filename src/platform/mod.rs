//! The host environment a scene is mounted into.
//!
//! The bootstrap code only ever talks to the host through these traits:
//! element lookup, attaching and detaching children, measuring an element,
//! per-frame callbacks, and window resize notifications. The renderer is
//! created by the platform as well, since its drawing surface has to be an
//! element of the same document.
//!
//! Two implementations exist:
//! - [`headless::HeadlessPlatform`], an in-memory document used natively and
//!   in tests.
//! - `web::WebPlatform`, the browser DOM (`wasm32` only).

use std::fmt::Debug;
use std::future::Future;

use crate::camera::PerspectiveCamera;
use crate::config::Dimensions;
use crate::scene::Scene;

pub mod headless;

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Identifies one pending per-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationHandle(pub u32);

/// Identifies one registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(pub u32);

/// Receives the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

pub type ResizeCallback = Box<dyn Fn()>;

/// A node of the host document.
pub trait Element: Clone + PartialEq + Debug + 'static
{
        /// Current content box size in pixels. May be `(0, 0)`.
        fn client_size(&self) -> (u32, u32);

        fn parent(&self) -> Option<Self>;

        fn append_child(
                &self,
                child: &Self,
        ) -> anyhow::Result<()>;

        fn remove_child(
                &self,
                child: &Self,
        ) -> anyhow::Result<()>;
}

/// Draws a [`Scene`] into a drawing surface element.
pub trait Renderer: 'static
{
        type Element: Element;

        /// The element the renderer draws into.
        fn surface(&self) -> &Self::Element;

        fn size(&self) -> Dimensions;

        fn set_size(
                &mut self,
                size: Dimensions,
        );

        fn render(
                &mut self,
                scene: &Scene,
                camera: &PerspectiveCamera,
        ) -> anyhow::Result<()>;

        /// Releases GPU resources. Rendering afterwards is an error.
        fn dispose(&mut self) -> anyhow::Result<()>;
}

pub trait Platform: Clone + 'static
{
        type Element: Element;
        type Renderer: Renderer<Element = Self::Element>;

        fn query_selector(
                &self,
                selector: &str,
        ) -> Option<Self::Element>;

        fn body(&self) -> Self::Element;

        fn create_renderer(
                &self,
                size: Dimensions,
        ) -> impl Future<Output = anyhow::Result<Self::Renderer>>;

        fn request_animation_frame(
                &self,
                callback: FrameCallback,
        ) -> anyhow::Result<AnimationHandle>;

        /// Unknown or already fired handles are ignored.
        fn cancel_animation_frame(
                &self,
                handle: AnimationHandle,
        );

        fn add_resize_listener(
                &self,
                callback: ResizeCallback,
        ) -> anyhow::Result<ListenerHandle>;

        /// Unknown handles are ignored.
        fn remove_resize_listener(
                &self,
                handle: ListenerHandle,
        );
}
