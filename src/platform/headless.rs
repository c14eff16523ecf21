//! In-memory host used natively and by the test suite.
//!
//! The document is a small node arena rooted at `body`. Frames only advance
//! when [`HeadlessPlatform::advance_frame`] is called, and resize events only
//! fire from [`HeadlessPlatform::dispatch_resize`], so scene behaviour can be
//! driven step by step.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use derivative::Derivative;

use crate::camera::PerspectiveCamera;
use crate::color::Color;
use crate::config::Dimensions;
use crate::platform::{
        AnimationHandle, Element, FrameCallback, ListenerHandle, Platform, Renderer, ResizeCallback,
};
use crate::renderer::GpuRenderer;
use crate::scene::Scene;

/// Index of a node in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A structural change to the document, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomMutation
{
        Appended
        {
                parent: NodeId,
                child: NodeId,
        },
        Removed
        {
                parent: NodeId,
                child: NodeId,
        },
}

#[derive(Debug, Default)]
struct Node
{
        tag: String,
        id: Option<String>,
        classes: Vec<String>,
        parent: Option<usize>,
        children: Vec<usize>,
        client_size: (u32, u32),
}

#[derive(Debug)]
struct Document
{
        nodes: RefCell<Vec<Node>>,
        mutations: RefCell<Vec<DomMutation>>,
}

impl Document
{
        const BODY: usize = 0;

        fn new() -> Self
        {
                let body = Node {
                        tag: "body".to_string(),
                        ..Default::default()
                };

                Self {
                        nodes: RefCell::new(vec![body]),
                        mutations: RefCell::new(Vec::new()),
                }
        }
}

/// Handle to a node of a [`HeadlessPlatform`] document.
#[derive(Clone)]
pub struct HeadlessElement
{
        document: Rc<Document>,
        node: usize,
}

impl HeadlessElement
{
        fn with_node<R>(
                &self,
                f: impl FnOnce(&Node) -> R,
        ) -> R
        {
                f(&self.document.nodes.borrow()[self.node])
        }

        fn with_node_mut<R>(
                &self,
                f: impl FnOnce(&mut Node) -> R,
        ) -> R
        {
                f(&mut self.document.nodes.borrow_mut()[self.node])
        }

        fn sibling(
                &self,
                node: usize,
        ) -> Self
        {
                Self {
                        document: self.document.clone(),
                        node,
                }
        }

        pub fn node_id(&self) -> NodeId
        {
                NodeId(self.node)
        }

        pub fn tag(&self) -> String
        {
                self.with_node(|n| n.tag.clone())
        }

        pub fn id(&self) -> Option<String>
        {
                self.with_node(|n| n.id.clone())
        }

        pub fn set_id(
                &self,
                id: impl Into<String>,
        )
        {
                let id = id.into();
                self.with_node_mut(|n| n.id = Some(id));
        }

        pub fn add_class(
                &self,
                class: impl Into<String>,
        )
        {
                let class = class.into();
                self.with_node_mut(|n| {
                        if !n.classes.contains(&class)
                        {
                                n.classes.push(class);
                        }
                });
        }

        pub fn has_class(
                &self,
                class: &str,
        ) -> bool
        {
                self.with_node(|n| n.classes.iter().any(|c| c == class))
        }

        /// Stands in for layout: the size this element reports when measured.
        pub fn set_client_size(
                &self,
                width: u32,
                height: u32,
        )
        {
                self.with_node_mut(|n| n.client_size = (width, height));
        }

        pub fn children(&self) -> Vec<HeadlessElement>
        {
                self.with_node(|n| n.children.clone())
                        .into_iter()
                        .map(|c| self.sibling(c))
                        .collect()
        }

        /// True when `other` is this element or one of its ancestors.
        fn is_inclusive_descendant_of(
                &self,
                other: &HeadlessElement,
        ) -> bool
        {
                let nodes = self.document.nodes.borrow();
                let mut current = Some(self.node);

                while let Some(node) = current
                {
                        if node == other.node
                        {
                                return true;
                        }
                        current = nodes[node].parent;
                }

                false
        }

        fn detach(&self)
        {
                let mut nodes = self.document.nodes.borrow_mut();

                if let Some(parent) = nodes[self.node].parent.take()
                {
                        nodes[parent].children.retain(|c| *c != self.node);

                        self.document.mutations.borrow_mut().push(DomMutation::Removed {
                                parent: NodeId(parent),
                                child: NodeId(self.node),
                        });
                }
        }

        fn matches(
                &self,
                selector: &Selector,
        ) -> bool
        {
                self.with_node(|n| match selector
                {
                        Selector::Id(id) => n.id.as_deref() == Some(id.as_str()),
                        Selector::Class(class) => n.classes.iter().any(|c| c == class),
                        Selector::Tag(tag) => n.tag.eq_ignore_ascii_case(tag),
                })
        }
}

impl PartialEq for HeadlessElement
{
        fn eq(
                &self,
                other: &Self,
        ) -> bool
        {
                Rc::ptr_eq(&self.document, &other.document) && self.node == other.node
        }
}

impl fmt::Debug for HeadlessElement
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                self.with_node(|n| {
                        write!(f, "<{}", n.tag)?;
                        if let Some(id) = &n.id
                        {
                                write!(f, "#{id}")?;
                        }
                        for class in &n.classes
                        {
                                write!(f, ".{class}")?;
                        }
                        write!(f, ">")
                })
        }
}

impl Element for HeadlessElement
{
        fn client_size(&self) -> (u32, u32)
        {
                self.with_node(|n| n.client_size)
        }

        fn parent(&self) -> Option<Self>
        {
                self.with_node(|n| n.parent).map(|p| self.sibling(p))
        }

        fn append_child(
                &self,
                child: &Self,
        ) -> anyhow::Result<()>
        {
                anyhow::ensure!(
                        Rc::ptr_eq(&self.document, &child.document),
                        "{child:?} belongs to another document"
                );
                anyhow::ensure!(
                        !self.is_inclusive_descendant_of(child),
                        "cannot append {child:?} to itself or one of its descendants"
                );

                child.detach();

                let mut nodes = self.document.nodes.borrow_mut();
                nodes[self.node].children.push(child.node);
                nodes[child.node].parent = Some(self.node);

                self.document.mutations.borrow_mut().push(DomMutation::Appended {
                        parent: NodeId(self.node),
                        child: NodeId(child.node),
                });

                Ok(())
        }

        fn remove_child(
                &self,
                child: &Self,
        ) -> anyhow::Result<()>
        {
                anyhow::ensure!(
                        child.parent().as_ref() == Some(self),
                        "{child:?} is not a child of {self:?}"
                );

                child.detach();

                Ok(())
        }
}

/// The selector subset the headless document understands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector
{
        Id(String),
        Class(String),
        Tag(String),
}

impl Selector
{
        fn parse(selector: &str) -> Option<Self>
        {
                let selector = selector.trim();

                let is_ident = |s: &str| {
                        !s.is_empty()
                                && s.chars()
                                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                };

                if let Some(id) = selector.strip_prefix('#')
                {
                        is_ident(id).then(|| Self::Id(id.to_string()))
                }
                else if let Some(class) = selector.strip_prefix('.')
                {
                        is_ident(class).then(|| Self::Class(class.to_string()))
                }
                else
                {
                        is_ident(selector).then(|| Self::Tag(selector.to_string()))
                }
        }
}

#[derive(Derivative)]
#[derivative(Debug)]
struct HeadlessState
{
        document: Rc<Document>,
        gpu: bool,
        renderer_failure: RefCell<Option<String>>,
        started: instant::Instant,

        #[derivative(Debug = "ignore")]
        frames: RefCell<BTreeMap<u32, FrameCallback>>,
        next_frame: Cell<u32>,

        #[derivative(Debug = "ignore")]
        resize_listeners: RefCell<BTreeMap<u32, Rc<dyn Fn()>>>,
        next_listener: Cell<u32>,
}

/// Platform backed by an in-memory document. Clones share the same
/// document, frame queue and listeners.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform
{
        state: Rc<HeadlessState>,
}

impl Default for HeadlessPlatform
{
        fn default() -> Self
        {
                Self::new()
        }
}

impl HeadlessPlatform
{
        /// A document with only `body` and renderers that draw nothing.
        pub fn new() -> Self
        {
                Self::build(false)
        }

        /// Like [`HeadlessPlatform::new`], but every renderer also draws into
        /// an offscreen GPU texture.
        pub fn with_gpu() -> Self
        {
                Self::build(true)
        }

        fn build(gpu: bool) -> Self
        {
                Self {
                        state: Rc::new(HeadlessState {
                                document: Rc::new(Document::new()),
                                gpu,
                                renderer_failure: RefCell::new(None),
                                started: instant::Instant::now(),
                                frames: RefCell::new(BTreeMap::new()),
                                next_frame: Cell::new(1),
                                resize_listeners: RefCell::new(BTreeMap::new()),
                                next_listener: Cell::new(1),
                        }),
                }
        }

        /// Makes every following renderer creation fail with `reason`.
        pub fn fail_renderer_creation(
                &self,
                reason: impl Into<String>,
        )
        {
                *self.state.renderer_failure.borrow_mut() = Some(reason.into());
        }

        /// A new element that is not attached anywhere yet.
        pub fn create_element(
                &self,
                tag: &str,
        ) -> HeadlessElement
        {
                let document = self.state.document.clone();

                let node = {
                        let mut nodes = document.nodes.borrow_mut();
                        nodes.push(Node {
                                tag: tag.to_ascii_lowercase(),
                                ..Default::default()
                        });
                        nodes.len() - 1
                };

                HeadlessElement {
                        document,
                        node,
                }
        }

        pub fn mutations(&self) -> Vec<DomMutation>
        {
                self.state.document.mutations.borrow().clone()
        }

        pub fn clear_mutations(&self)
        {
                self.state.document.mutations.borrow_mut().clear();
        }

        pub fn pending_frames(&self) -> usize
        {
                self.state.frames.borrow().len()
        }

        /// Runs every frame callback that was pending when called and returns
        /// how many ran. Callbacks scheduled while running wait for the next
        /// call; callbacks cancelled while running are skipped.
        pub fn advance_frame(&self) -> usize
        {
                let timestamp = self.state.started.elapsed().as_secs_f64() * 1000.0;

                let pending: Vec<u32> = self.state.frames.borrow().keys().copied().collect();

                let mut ran = 0;

                for id in pending
                {
                        let callback = self.state.frames.borrow_mut().remove(&id);

                        if let Some(callback) = callback
                        {
                                callback(timestamp);
                                ran += 1;
                        }
                }

                ran
        }

        /// Advances `count` frames, returning the total number of callbacks run.
        pub fn advance_frames(
                &self,
                count: usize,
        ) -> usize
        {
                (0..count).map(|_| self.advance_frame()).sum()
        }

        pub fn resize_listener_count(&self) -> usize
        {
                self.state.resize_listeners.borrow().len()
        }

        /// Calls every registered resize listener, as a window resize would.
        pub fn dispatch_resize(&self)
        {
                let listeners: Vec<Rc<dyn Fn()>> =
                        self.state.resize_listeners.borrow().values().cloned().collect();

                for listener in listeners
                {
                        listener();
                }
        }

        fn root(&self) -> HeadlessElement
        {
                HeadlessElement {
                        document: self.state.document.clone(),
                        node: Document::BODY,
                }
        }
}

impl Platform for HeadlessPlatform
{
        type Element = HeadlessElement;
        type Renderer = HeadlessRenderer;

        /// First match in document order, starting at `body`. Detached
        /// elements are never found.
        fn query_selector(
                &self,
                selector: &str,
        ) -> Option<HeadlessElement>
        {
                let Some(selector) = Selector::parse(selector)
                else
                {
                        log::warn!("Unsupported selector `{selector}`");
                        return None;
                };

                let mut stack = vec![self.root()];

                while let Some(element) = stack.pop()
                {
                        if element.matches(&selector)
                        {
                                return Some(element);
                        }

                        stack.extend(element.children().into_iter().rev());
                }

                None
        }

        fn body(&self) -> HeadlessElement
        {
                self.root()
        }

        async fn create_renderer(
                &self,
                size: Dimensions,
        ) -> anyhow::Result<HeadlessRenderer>
        {
                if let Some(reason) = self.state.renderer_failure.borrow().clone()
                {
                        anyhow::bail!(reason);
                }

                let gpu = if self.state.gpu
                {
                        Some(GpuRenderer::offscreen(size).await?)
                }
                else
                {
                        None
                };

                let canvas = self.create_element("canvas");
                canvas.set_client_size(size.width, size.height);

                Ok(HeadlessRenderer {
                        canvas,
                        size,
                        gpu,
                        frames_rendered: 0,
                        last_background: None,
                        disposed: false,
                })
        }

        fn request_animation_frame(
                &self,
                callback: FrameCallback,
        ) -> anyhow::Result<AnimationHandle>
        {
                let id = self.state.next_frame.get();
                self.state.next_frame.set(id + 1);

                self.state.frames.borrow_mut().insert(id, callback);

                Ok(AnimationHandle(id))
        }

        fn cancel_animation_frame(
                &self,
                handle: AnimationHandle,
        )
        {
                self.state.frames.borrow_mut().remove(&handle.0);
        }

        fn add_resize_listener(
                &self,
                callback: ResizeCallback,
        ) -> anyhow::Result<ListenerHandle>
        {
                let id = self.state.next_listener.get();
                self.state.next_listener.set(id + 1);

                self.state
                        .resize_listeners
                        .borrow_mut()
                        .insert(id, Rc::from(callback));

                Ok(ListenerHandle(id))
        }

        fn remove_resize_listener(
                &self,
                handle: ListenerHandle,
        )
        {
                self.state.resize_listeners.borrow_mut().remove(&handle.0);
        }
}

/// Renderer whose drawing surface is a headless `canvas` element.
///
/// It keeps count of what it was asked to draw. When created by
/// [`HeadlessPlatform::with_gpu`] it also renders for real into an offscreen
/// texture.
#[derive(Debug)]
pub struct HeadlessRenderer
{
        canvas: HeadlessElement,
        size: Dimensions,
        gpu: Option<GpuRenderer>,

        frames_rendered: u64,
        last_background: Option<Color>,
        disposed: bool,
}

impl HeadlessRenderer
{
        pub fn frames_rendered(&self) -> u64
        {
                self.frames_rendered
        }

        /// Clear color of the most recent frame.
        pub fn last_background(&self) -> Option<Color>
        {
                self.last_background
        }

        pub fn is_disposed(&self) -> bool
        {
                self.disposed
        }

        pub fn gpu(&self) -> Option<&GpuRenderer>
        {
                self.gpu.as_ref()
        }

        /// The last frame drawn on the GPU, read back as an image.
        #[cfg(not(target_arch = "wasm32"))]
        pub fn snapshot(&self) -> anyhow::Result<image::RgbaImage>
        {
                match &self.gpu
                {
                        Some(gpu) => gpu.snapshot(),
                        None => anyhow::bail!("this renderer was created without a GPU"),
                }
        }
}

impl Renderer for HeadlessRenderer
{
        type Element = HeadlessElement;

        fn surface(&self) -> &HeadlessElement
        {
                &self.canvas
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
                self.size = size;
                self.canvas.set_client_size(size.width, size.height);

                if let Some(gpu) = &mut self.gpu
                {
                        gpu.resize(size);
                }
        }

        fn render(
                &mut self,
                scene: &Scene,
                camera: &PerspectiveCamera,
        ) -> anyhow::Result<()>
        {
                anyhow::ensure!(!self.disposed, "renderer has been disposed");

                if let Some(gpu) = &mut self.gpu
                {
                        gpu.render(scene, camera)?;
                }

                self.frames_rendered += 1;
                self.last_background = Some(scene.background.unwrap_or(Color::BLACK));

                Ok(())
        }

        fn dispose(&mut self) -> anyhow::Result<()>
        {
                if let Some(gpu) = &mut self.gpu
                {
                        gpu.dispose();
                }

                self.disposed = true;

                Ok(())
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        fn viewport(platform: &HeadlessPlatform) -> HeadlessElement
        {
                let div = platform.create_element("div");
                div.set_id("viewport");
                div.add_class("stage");
                platform.body().append_child(&div).unwrap();
                div
        }

        #[test]
        fn selectors_find_attached_elements_in_document_order()
        {
                let platform = HeadlessPlatform::new();
                let div = viewport(&platform);

                let other = platform.create_element("div");
                other.add_class("stage");
                platform.body().append_child(&other).unwrap();

                assert_eq!(platform.query_selector("#viewport"), Some(div.clone()));
                assert_eq!(platform.query_selector(".stage"), Some(div.clone()));
                assert_eq!(platform.query_selector("DIV"), Some(div));
                assert_eq!(platform.query_selector("body"), Some(platform.body()));
                assert_eq!(platform.query_selector("#missing"), None);
        }

        #[test]
        fn detached_elements_and_unsupported_selectors_are_not_found()
        {
                let platform = HeadlessPlatform::new();

                let loose = platform.create_element("section");
                loose.set_id("loose");

                assert_eq!(platform.query_selector("#loose"), None);
                assert_eq!(platform.query_selector("div > p"), None);
                assert_eq!(platform.query_selector("#"), None);
                assert_eq!(platform.query_selector(""), None);
        }

        #[test]
        fn append_moves_and_remove_detaches()
        {
                let platform = HeadlessPlatform::new();
                let a = viewport(&platform);
                let b = platform.create_element("div");
                platform.body().append_child(&b).unwrap();

                let child = platform.create_element("canvas");
                a.append_child(&child).unwrap();
                b.append_child(&child).unwrap();

                assert!(a.children().is_empty());
                assert_eq!(child.parent(), Some(b.clone()));

                assert!(a.remove_child(&child).is_err());
                b.remove_child(&child).unwrap();
                assert_eq!(child.parent(), None);

                let mutations = platform.mutations();
                assert_eq!(
                        &mutations[mutations.len() - 4..],
                        &[
                                DomMutation::Appended {
                                        parent: a.node_id(),
                                        child: child.node_id()
                                },
                                DomMutation::Removed {
                                        parent: a.node_id(),
                                        child: child.node_id()
                                },
                                DomMutation::Appended {
                                        parent: b.node_id(),
                                        child: child.node_id()
                                },
                                DomMutation::Removed {
                                        parent: b.node_id(),
                                        child: child.node_id()
                                },
                        ]
                );
        }

        #[test]
        fn cycles_are_rejected()
        {
                let platform = HeadlessPlatform::new();
                let outer = viewport(&platform);
                let inner = platform.create_element("div");
                outer.append_child(&inner).unwrap();

                assert!(inner.append_child(&outer).is_err());
                assert!(inner.append_child(&inner).is_err());
        }

        #[test]
        fn frames_run_in_batches_and_honour_cancellation()
        {
                let platform = HeadlessPlatform::new();
                let log = Rc::new(RefCell::new(Vec::new()));

                let second = Rc::new(Cell::new(None));
                {
                        let log = log.clone();
                        let second = second.clone();
                        let inner = platform.clone();
                        platform
                                .request_animation_frame(Box::new(move |_| {
                                        log.borrow_mut().push("first");
                                        if let Some(handle) = second.get()
                                        {
                                                inner.cancel_animation_frame(handle);
                                        }
                                        let log = log.clone();
                                        inner.request_animation_frame(Box::new(move |_| {
                                                log.borrow_mut().push("rescheduled");
                                        }))
                                        .unwrap();
                                }))
                                .unwrap();
                }
                {
                        let log = log.clone();
                        let handle = platform
                                .request_animation_frame(Box::new(move |_| {
                                        log.borrow_mut().push("second");
                                }))
                                .unwrap();
                        second.set(Some(handle));
                }

                assert_eq!(platform.advance_frame(), 1);
                assert_eq!(*log.borrow(), ["first"]);
                assert_eq!(platform.pending_frames(), 1);

                assert_eq!(platform.advance_frame(), 1);
                assert_eq!(*log.borrow(), ["first", "rescheduled"]);
                assert_eq!(platform.advance_frame(), 0);
        }

        #[test]
        fn resize_listeners_can_be_removed()
        {
                let platform = HeadlessPlatform::new();
                let calls = Rc::new(Cell::new(0));

                let handle = {
                        let calls = calls.clone();
                        platform
                                .add_resize_listener(Box::new(move || calls.set(calls.get() + 1)))
                                .unwrap()
                };

                platform.dispatch_resize();
                assert_eq!(calls.get(), 1);
                assert_eq!(platform.resize_listener_count(), 1);

                platform.remove_resize_listener(handle);
                platform.remove_resize_listener(handle);
                platform.dispatch_resize();

                assert_eq!(calls.get(), 1);
                assert_eq!(platform.resize_listener_count(), 0);
        }

        #[test]
        fn renderer_tracks_frames_and_refuses_to_draw_after_dispose()
        {
                let platform = HeadlessPlatform::new();
                let size = Dimensions::new(320, 200).unwrap();
                let mut renderer = pollster::block_on(platform.create_renderer(size)).unwrap();

                assert_eq!(renderer.surface().tag(), "canvas");
                assert_eq!(renderer.surface().client_size(), (320, 200));
                assert!(renderer.gpu().is_none());

                let mut scene = Scene::new();
                scene.background = Some(Color::from_hex(0x336699));
                let camera = PerspectiveCamera::for_viewport(size);

                renderer.render(&scene, &camera).unwrap();
                assert_eq!(renderer.frames_rendered(), 1);
                assert_eq!(renderer.last_background(), Some(Color::from_hex(0x336699)));

                renderer.set_size(Dimensions::new(64, 48).unwrap());
                assert_eq!(renderer.surface().client_size(), (64, 48));

                renderer.dispose().unwrap();
                renderer.dispose().unwrap();
                assert!(renderer.is_disposed());
                assert!(renderer.render(&scene, &camera).is_err());
                assert_eq!(renderer.frames_rendered(), 1);
        }

        #[test]
        fn renderer_creation_can_be_made_to_fail()
        {
                let platform = HeadlessPlatform::new();
                platform.fail_renderer_creation("no adapter");

                let result = pollster::block_on(platform.create_renderer(Dimensions::DEFAULT));

                assert_eq!(result.unwrap_err().to_string(), "no adapter");
        }
}
