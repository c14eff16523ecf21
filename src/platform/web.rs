//! Browser host: the page DOM, `requestAnimationFrame`, window `resize`
//! events and a `wgpu` surface on a `<canvas>`. Also exposes
//! `createScene` to JavaScript.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, anyhow};
use derivative::Derivative;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::bootstrap::{SceneHandle, create_scene};
use crate::camera::PerspectiveCamera;
use crate::color::Background;
use crate::config::{Container, Dimensions, SceneConfig};
use crate::platform::{
        AnimationHandle, Element, FrameCallback, ListenerHandle, Platform, Renderer, ResizeCallback,
};
use crate::renderer::GpuRenderer;
use crate::scene::Scene;
use crate::utils::bootstrap::to_js_error;

fn js_error(value: JsValue) -> anyhow::Error
{
        anyhow!("{value:?}")
}

/// A DOM element.
#[derive(Debug, Clone, PartialEq)]
pub struct WebElement(pub web_sys::Element);

impl Element for WebElement
{
        fn client_size(&self) -> (u32, u32)
        {
                (
                        self.0.client_width().max(0) as u32,
                        self.0.client_height().max(0) as u32,
                )
        }

        fn parent(&self) -> Option<Self>
        {
                self.0.parent_element().map(WebElement)
        }

        fn append_child(
                &self,
                child: &Self,
        ) -> anyhow::Result<()>
        {
                self.0.append_child(&child.0).map_err(js_error)?;

                Ok(())
        }

        fn remove_child(
                &self,
                child: &Self,
        ) -> anyhow::Result<()>
        {
                self.0.remove_child(&child.0).map_err(js_error)?;

                Ok(())
        }
}

#[derive(Derivative)]
#[derivative(Debug)]
struct WebState
{
        window: web_sys::Window,
        document: web_sys::Document,
        body: WebElement,

        #[derivative(Debug = "ignore")]
        resize_listeners: RefCell<BTreeMap<u32, Closure<dyn Fn()>>>,
        next_listener: Cell<u32>,
}

#[derive(Debug, Clone)]
pub struct WebPlatform
{
        state: Rc<WebState>,
}

impl WebPlatform
{
        pub fn new() -> anyhow::Result<Self>
        {
                let window = web_sys::window().context("no global `window` exists")?;
                let document = window.document().context("window has no document")?;
                let body = document.body().context("document has no body")?;

                Ok(Self {
                        state: Rc::new(WebState {
                                window,
                                document,
                                body: WebElement(body.into()),
                                resize_listeners: RefCell::new(BTreeMap::new()),
                                next_listener: Cell::new(1),
                        }),
                })
        }
}

impl Platform for WebPlatform
{
        type Element = WebElement;
        type Renderer = CanvasRenderer;

        fn query_selector(
                &self,
                selector: &str,
        ) -> Option<WebElement>
        {
                match self.state.document.query_selector(selector)
                {
                        Ok(element) => element.map(WebElement),
                        Err(err) =>
                        {
                                log::warn!("Invalid selector `{selector}`: {err:?}");
                                None
                        }
                }
        }

        fn body(&self) -> WebElement
        {
                self.state.body.clone()
        }

        async fn create_renderer(
                &self,
                size: Dimensions,
        ) -> anyhow::Result<CanvasRenderer>
        {
                let canvas = self
                        .state
                        .document
                        .create_element("canvas")
                        .map_err(js_error)?
                        .dyn_into::<web_sys::HtmlCanvasElement>()
                        .map_err(|_| anyhow!("created element is not a canvas"))?;

                CanvasRenderer::apply_size(&canvas, size)?;

                let instance = GpuRenderer::new_instance();
                let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

                let gpu = GpuRenderer::for_surface(&instance, surface, size).await?;

                Ok(CanvasRenderer {
                        element: WebElement(canvas.clone().into()),
                        canvas,
                        size,
                        gpu,
                })
        }

        fn request_animation_frame(
                &self,
                callback: FrameCallback,
        ) -> anyhow::Result<AnimationHandle>
        {
                let closure = Closure::once_into_js(move |timestamp: f64| callback(timestamp));

                let id = self
                        .state
                        .window
                        .request_animation_frame(closure.unchecked_ref())
                        .map_err(js_error)?;

                Ok(AnimationHandle(id as u32))
        }

        fn cancel_animation_frame(
                &self,
                handle: AnimationHandle,
        )
        {
                if let Err(err) = self.state.window.cancel_animation_frame(handle.0 as i32)
                {
                        log::warn!("Failed to cancel animation frame: {err:?}");
                }
        }

        fn add_resize_listener(
                &self,
                callback: ResizeCallback,
        ) -> anyhow::Result<ListenerHandle>
        {
                let closure = Closure::wrap(callback);

                self.state
                        .window
                        .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
                        .map_err(js_error)?;

                let id = self.state.next_listener.get();
                self.state.next_listener.set(id + 1);

                self.state.resize_listeners.borrow_mut().insert(id, closure);

                Ok(ListenerHandle(id))
        }

        fn remove_resize_listener(
                &self,
                handle: ListenerHandle,
        )
        {
                let Some(closure) = self.state.resize_listeners.borrow_mut().remove(&handle.0)
                else
                {
                        return;
                };

                if let Err(err) = self.state.window.remove_event_listener_with_callback(
                        "resize",
                        closure.as_ref().unchecked_ref(),
                )
                {
                        log::warn!("Failed to remove resize listener: {err:?}");
                }
        }
}

/// Renders through a `wgpu` surface created from a `<canvas>`.
#[derive(Debug)]
pub struct CanvasRenderer
{
        canvas: web_sys::HtmlCanvasElement,
        element: WebElement,
        size: Dimensions,
        gpu: GpuRenderer,
}

impl CanvasRenderer
{
        pub fn canvas(&self) -> &web_sys::HtmlCanvasElement
        {
                &self.canvas
        }

        /// Sets the drawing buffer size and the CSS size, both in pixels.
        fn apply_size(
                canvas: &web_sys::HtmlCanvasElement,
                size: Dimensions,
        ) -> anyhow::Result<()>
        {
                canvas.set_width(size.width);
                canvas.set_height(size.height);

                let style = canvas.style();
                style.set_property("width", &format!("{}px", size.width))
                        .map_err(js_error)?;
                style.set_property("height", &format!("{}px", size.height))
                        .map_err(js_error)?;

                Ok(())
        }
}

impl Renderer for CanvasRenderer
{
        type Element = WebElement;

        fn surface(&self) -> &WebElement
        {
                &self.element
        }

        fn size(&self) -> Dimensions
        {
                self.size
        }

        fn set_size(
                &mut self,
                size: Dimensions,
        )
        {
                if let Err(err) = Self::apply_size(&self.canvas, size)
                {
                        log::warn!("Failed to resize canvas: {err:#}");
                }

                self.size = size;
                self.gpu.resize(size);
        }

        fn render(
                &mut self,
                scene: &Scene,
                camera: &PerspectiveCamera,
        ) -> anyhow::Result<()>
        {
                self.gpu.render(scene, camera)
        }

        fn dispose(&mut self) -> anyhow::Result<()>
        {
                self.gpu.dispose();

                Ok(())
        }
}

/// Reads `{ container, width, height, background }` from a JS object.
/// `undefined` and `null` give the defaults.
fn scene_config_from_js(options: &JsValue) -> Result<SceneConfig<WebElement>, JsValue>
{
        let mut config = SceneConfig::new();

        if options.is_undefined() || options.is_null()
        {
                return Ok(config);
        }

        let get = |key: &str| js_sys::Reflect::get(options, &JsValue::from_str(key));

        let container = get("container")?;
        if let Some(selector) = container.as_string()
        {
                config.container = Container::Selector(selector);
        }
        else if !container.is_undefined() && !container.is_null()
        {
                match container.dyn_into::<web_sys::Element>()
                {
                        Ok(element) => config.container = Container::Element(WebElement(element)),
                        Err(other) => log::warn!("Ignoring container {other:?}, using the body"),
                }
        }

        config.width = get("width")?.as_f64().and_then(Dimensions::side_from_number);
        config.height = get("height")?.as_f64().and_then(Dimensions::side_from_number);

        let background = get("background")?;
        config.background = if let Some(number) = background.as_f64()
        {
                let packed = Background::from_number(number);

                if packed.is_none()
                {
                        log::warn!("Background {number} is not a packed 0xRRGGBB integer, using black.");
                }

                packed
        }
        else
        {
                background.as_string().map(Background::Css)
        };

        Ok(config)
}

/// A mounted scene, as seen from JavaScript.
#[wasm_bindgen]
pub struct WebScene
{
        handle: SceneHandle<WebPlatform>,
}

#[wasm_bindgen]
impl WebScene
{
        pub fn start(&self)
        {
                self.handle.start();
        }

        pub fn stop(&self)
        {
                self.handle.stop();
        }

        pub fn dispose(&self)
        {
                self.handle.dispose();
        }

        #[wasm_bindgen(getter, js_name = isRunning)]
        pub fn is_running(&self) -> bool
        {
                self.handle.is_running()
        }

        #[wasm_bindgen(getter)]
        pub fn width(&self) -> u32
        {
                self.handle.size().width
        }

        #[wasm_bindgen(getter)]
        pub fn height(&self) -> u32
        {
                self.handle.size().height
        }

        #[wasm_bindgen(getter)]
        pub fn canvas(&self) -> web_sys::HtmlCanvasElement
        {
                self.handle.renderer().canvas().clone()
        }
}

/// `createScene(options?)`: mounts a scene and resolves to a [`WebScene`].
/// Rejects when the container selector matches nothing or no GPU is
/// available.
#[wasm_bindgen(js_name = createScene)]
pub async fn create_scene_js(options: JsValue) -> Result<WebScene, JsValue>
{
        let platform = WebPlatform::new().map_err(to_js_error)?;
        let config = scene_config_from_js(&options)?;

        let handle = create_scene(&platform, config)
                .await
                .map_err(to_js_error)?;

        Ok(WebScene {
                handle,
        })
}
