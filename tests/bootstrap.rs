use approx::assert_relative_eq;
use cgmath::{Deg, Point3};
use pollster::block_on;

use scenemount::platform::headless::{DomMutation, HeadlessElement, HeadlessPlatform};
use scenemount::platform::{Element, Platform, Renderer};
use scenemount::{Color, Dimensions, SceneConfig, SceneError, SceneHandle, create_scene};

fn init()
{
        let _ = env_logger::builder().is_test(true).try_init();
}

/// A `<div id="viewport">` measuring `width` x `height`, attached to the body.
fn viewport(
        platform: &HeadlessPlatform,
        width: u32,
        height: u32,
) -> HeadlessElement
{
        let div = platform.create_element("div");
        div.set_id("viewport");
        div.set_client_size(width, height);
        platform.body().append_child(&div).unwrap();
        div
}

fn mount(
        platform: &HeadlessPlatform,
        config: SceneConfig<HeadlessElement>,
) -> SceneHandle<HeadlessPlatform>
{
        block_on(create_scene(platform, config)).unwrap()
}

fn removals_of(
        platform: &HeadlessPlatform,
        element: &HeadlessElement,
) -> usize
{
        platform
                .mutations()
                .iter()
                .filter(|m| {
                        matches!(m, DomMutation::Removed { child, .. } if *child == element.node_id())
                })
                .count()
}

#[test]
fn renderer_takes_the_measured_size_of_the_selected_container()
{
        init();
        let platform = HeadlessPlatform::new();
        let container = viewport(&platform, 1024, 768);

        let handle = mount(&platform, SceneConfig::new().with_selector("#viewport"));

        assert_eq!(handle.size(), Dimensions::new(1024, 768).unwrap());
        assert_eq!(handle.container(), &container);

        let renderer = handle.renderer();
        assert_eq!(renderer.surface().parent(), Some(container.clone()));
        assert_eq!(container.children(), vec![renderer.surface().clone()]);
}

#[test]
fn unresolved_selector_fails_without_touching_the_document()
{
        init();
        let platform = HeadlessPlatform::new();
        viewport(&platform, 1024, 768);
        platform.clear_mutations();

        let err = block_on(create_scene(&platform, SceneConfig::new().with_selector("#nope")))
                .unwrap_err();

        assert!(matches!(&err, SceneError::ContainerNotFound { selector } if selector == "#nope"));
        assert_eq!(err.selector(), Some("#nope"));
        assert!(err.to_string().contains("#nope"));

        assert!(platform.mutations().is_empty());
        assert_eq!(platform.resize_listener_count(), 0);
}

#[test]
fn explicit_dimensions_win_over_the_container()
{
        init();
        let platform = HeadlessPlatform::new();
        viewport(&platform, 1024, 768);

        let handle = mount(
                &platform,
                SceneConfig::new().with_selector("#viewport").with_size(400, 300),
        );

        assert_eq!(handle.size(), Dimensions::new(400, 300).unwrap());
        assert_relative_eq!(handle.camera().aspect, 400.0 / 300.0);
}

#[test]
fn dimensions_resolve_per_axis()
{
        init();
        let platform = HeadlessPlatform::new();
        viewport(&platform, 1024, 768);

        let handle = mount(
                &platform,
                SceneConfig::new().with_selector("#viewport").with_width(500),
        );

        assert_eq!(handle.size(), Dimensions::new(500, 768).unwrap());
}

#[test]
fn unmeasured_body_falls_back_to_the_default_size()
{
        init();
        let platform = HeadlessPlatform::new();

        let handle = mount(&platform, SceneConfig::new());

        assert_eq!(handle.size(), Dimensions::new(800, 600).unwrap());
        assert_eq!(handle.container(), &platform.body());
        assert_eq!(handle.renderer().surface().parent(), Some(platform.body()));
}

#[test]
fn zero_width_option_is_treated_as_missing()
{
        init();
        let platform = HeadlessPlatform::new();

        let handle = mount(&platform, SceneConfig::new().with_size(0, 300));

        assert_eq!(handle.size(), Dimensions::new(800, 300).unwrap());
}

#[test]
fn element_containers_are_used_as_given()
{
        init();
        let platform = HeadlessPlatform::new();
        let detached = platform.create_element("section");
        detached.set_client_size(640, 480);

        let handle = mount(&platform, SceneConfig::new().with_element(detached.clone()));

        assert_eq!(handle.container(), &detached);
        assert_eq!(handle.size(), Dimensions::new(640, 480).unwrap());
        assert_eq!(handle.renderer().surface().parent(), Some(detached));
}

#[test]
fn camera_and_scene_are_set_up_for_the_demo_cube()
{
        init();
        let platform = HeadlessPlatform::new();

        let handle = mount(&platform, SceneConfig::new().with_size(400, 200));

        let camera = handle.camera();
        assert_eq!(camera.fovy, Deg(50.0));
        assert_relative_eq!(camera.znear, 0.1);
        assert_relative_eq!(camera.zfar, 1000.0);
        assert_relative_eq!(camera.aspect, 2.0);
        assert_eq!(camera.position, Point3::new(0.0, 1.6, 3.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));

        let scene = handle.scene();
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.background, None);

        let cube = scene.get(handle.demo_object()).unwrap();
        assert_eq!(cube.geometry.get_vertex_count(), 24);
        assert_eq!(cube.geometry.get_index_count(), 36);
}

#[test]
fn start_then_stop_renders_nothing()
{
        init();
        let platform = HeadlessPlatform::new();
        let handle = mount(&platform, SceneConfig::new());

        handle.start();
        handle.stop();

        assert_eq!(platform.pending_frames(), 0);
        assert_eq!(platform.advance_frame(), 0);
        assert_eq!(handle.renderer().frames_rendered(), 0);
        assert!(!handle.is_running());
}

#[test]
fn starting_twice_schedules_a_single_frame()
{
        init();
        let platform = HeadlessPlatform::new();
        let handle = mount(&platform, SceneConfig::new());

        handle.start();
        handle.start();

        assert_eq!(platform.pending_frames(), 1);
        assert!(handle.is_running());

        handle.stop();
        handle.stop();
        assert_eq!(platform.pending_frames(), 0);
}

#[test]
fn each_frame_rotates_renders_and_reschedules()
{
        init();
        let platform = HeadlessPlatform::new();
        let handle = mount(&platform, SceneConfig::new());

        handle.start();
        assert_eq!(platform.advance_frames(3), 3);

        assert_eq!(handle.renderer().frames_rendered(), 3);
        assert_eq!(platform.pending_frames(), 1);

        let scene = handle.scene();
        let cube = scene.get(handle.demo_object()).unwrap();
        assert_relative_eq!(cube.rotation.x.0, 0.03, epsilon = 1e-6);
        assert_relative_eq!(cube.rotation.y.0, 0.03, epsilon = 1e-6);
        assert_relative_eq!(cube.rotation.z.0, 0.0);
}

#[test]
fn stopped_scene_can_be_restarted()
{
        init();
        let platform = HeadlessPlatform::new();
        let handle = mount(&platform, SceneConfig::new());

        handle.start();
        platform.advance_frame();
        handle.stop();
        platform.advance_frames(5);
        handle.start();
        platform.advance_frame();

        assert_eq!(handle.renderer().frames_rendered(), 2);
}

#[test]
fn dispose_detaches_the_surface_exactly_once()
{
        init();
        let platform = HeadlessPlatform::new();
        let container = viewport(&platform, 320, 240);
        let handle = mount(&platform, SceneConfig::new().with_selector("#viewport"));
        let canvas = handle.renderer().surface().clone();

        handle.dispose();
        handle.dispose();

        assert!(handle.is_disposed());
        assert!(handle.renderer().is_disposed());
        assert_eq!(canvas.parent(), None);
        assert!(container.children().is_empty());
        assert_eq!(removals_of(&platform, &canvas), 1);
}

#[test]
fn dispose_while_running_cancels_the_frame_and_the_listener()
{
        init();
        let platform = HeadlessPlatform::new();
        let handle = mount(&platform, SceneConfig::new());

        handle.start();
        platform.advance_frame();
        assert_eq!(platform.resize_listener_count(), 1);

        handle.dispose();

        assert_eq!(platform.pending_frames(), 0);
        assert_eq!(platform.resize_listener_count(), 0);
        assert!(!handle.is_running());

        handle.start();
        handle.stop();
        assert_eq!(platform.pending_frames(), 0);
        assert_eq!(platform.advance_frame(), 0);
        assert_eq!(handle.renderer().frames_rendered(), 1);
}

#[test]
fn dispose_tolerates_a_surface_removed_by_someone_else()
{
        init();
        let platform = HeadlessPlatform::new();
        let container = viewport(&platform, 320, 240);
        let handle = mount(&platform, SceneConfig::new().with_selector("#viewport"));
        let canvas = handle.renderer().surface().clone();

        container.remove_child(&canvas).unwrap();
        handle.dispose();

        assert_eq!(removals_of(&platform, &canvas), 1);
        assert!(handle.renderer().is_disposed());
}

#[test]
fn dispose_with_a_borrowed_renderer_detaches_and_releases_later()
{
        init();
        let platform = HeadlessPlatform::new();
        let container = viewport(&platform, 320, 240);
        let handle = mount(&platform, SceneConfig::new().with_selector("#viewport"));
        let canvas = handle.renderer().surface().clone();

        {
                let renderer = handle.renderer();
                handle.dispose();

                assert!(handle.is_disposed());
                assert_eq!(canvas.parent(), None);
                assert!(!renderer.is_disposed());
        }

        handle.dispose();

        assert!(handle.renderer().is_disposed());
        assert!(container.children().is_empty());
        assert_eq!(removals_of(&platform, &canvas), 1);
        assert_eq!(platform.resize_listener_count(), 0);
}

#[test]
fn dropping_the_handle_disposes_it()
{
        init();
        let platform = HeadlessPlatform::new();
        let handle = mount(&platform, SceneConfig::new());
        let canvas = handle.renderer().surface().clone();

        handle.start();
        drop(handle);

        assert_eq!(canvas.parent(), None);
        assert_eq!(platform.pending_frames(), 0);
        assert_eq!(platform.resize_listener_count(), 0);
}

#[test]
fn resize_follows_the_container()
{
        init();
        let platform = HeadlessPlatform::new();
        let container = viewport(&platform, 1024, 768);
        let handle = mount(&platform, SceneConfig::new().with_selector("#viewport"));

        container.set_client_size(600, 300);
        platform.dispatch_resize();

        assert_eq!(handle.size(), Dimensions::new(600, 300).unwrap());
        assert_relative_eq!(handle.camera().aspect, 2.0);
        assert_eq!(handle.renderer().surface().client_size(), (600, 300));

        container.set_client_size(0, 0);
        platform.dispatch_resize();

        assert_eq!(handle.size(), Dimensions::new(600, 300).unwrap());
        assert_relative_eq!(handle.camera().aspect, 2.0);
}

#[test]
fn resize_after_dispose_is_ignored()
{
        init();
        let platform = HeadlessPlatform::new();
        let container = viewport(&platform, 1024, 768);
        let handle = mount(&platform, SceneConfig::new().with_selector("#viewport"));

        handle.dispose();
        container.set_client_size(10, 10);
        platform.dispatch_resize();

        assert_eq!(handle.size(), Dimensions::new(1024, 768).unwrap());
}

#[test]
fn numeric_and_string_backgrounds_agree()
{
        init();
        let platform = HeadlessPlatform::new();

        let backgrounds: Vec<Color> = [
                SceneConfig::new().with_background(0x00ff00_u32),
                SceneConfig::new().with_background("#00ff00"),
                SceneConfig::new().with_background("rgb(0, 255, 0)"),
                SceneConfig::new().with_background("lime"),
        ]
        .into_iter()
        .map(|config| mount(&platform, config).scene().background.unwrap())
        .collect();

        assert!(backgrounds.iter().all(|c| *c == Color::from_hex(0x00ff00)));
}

#[test]
fn unparseable_background_falls_back_to_black()
{
        init();
        let platform = HeadlessPlatform::new();

        let handle = mount(&platform, SceneConfig::new().with_background("not-a-color"));

        assert_eq!(handle.scene().background, Some(Color::BLACK));

        handle.start();
        platform.advance_frame();
        assert_eq!(handle.renderer().last_background(), Some(Color::BLACK));
}

#[test]
fn renderer_failure_is_fatal_and_mounts_nothing()
{
        init();
        let platform = HeadlessPlatform::new();
        platform.fail_renderer_creation("no adapter");
        platform.clear_mutations();

        let err = block_on(create_scene(&platform, SceneConfig::new())).unwrap_err();

        assert!(matches!(err, SceneError::Renderer(_)));
        assert!(platform.mutations().is_empty());
        assert_eq!(platform.resize_listener_count(), 0);
}

#[test]
fn scenes_do_not_share_state()
{
        init();
        let platform = HeadlessPlatform::new();

        let first = mount(&platform, SceneConfig::new());
        let second = mount(&platform, SceneConfig::new());
        assert_eq!(platform.resize_listener_count(), 2);

        first.start();
        second.start();
        first.dispose();

        assert_eq!(platform.pending_frames(), 1);
        assert_eq!(platform.resize_listener_count(), 1);

        platform.advance_frame();
        assert_eq!(second.renderer().frames_rendered(), 1);
        assert_eq!(first.renderer().frames_rendered(), 0);
}

/// Needs a real adapter; skipped when none is available.
#[test]
fn gpu_snapshot_shows_background_and_cube()
{
        init();
        let platform = HeadlessPlatform::with_gpu();

        let config = SceneConfig::new().with_size(64, 48).with_background("#1e1e2e");

        let handle = match block_on(create_scene(&platform, config))
        {
                Ok(handle) => handle,
                Err(SceneError::Renderer(err)) =>
                {
                        eprintln!("skipping, no GPU available: {err:#}");
                        return;
                }
                Err(err) => panic!("{err}"),
        };

        handle.start();
        platform.advance_frames(2);

        let image = handle.renderer().snapshot().unwrap();
        assert_eq!(image.dimensions(), (64, 48));

        let close = |a: u8, b: u8| a.abs_diff(b) <= 1;

        let corner = image.get_pixel(0, 0).0;
        assert!(close(corner[0], 0x1e) && close(corner[1], 0x1e) && close(corner[2], 0x2e));
        assert_eq!(corner[3], 255);

        let center = image.get_pixel(32, 24).0;
        assert_ne!(&center[..3], &corner[..3]);

        handle.dispose();
        assert!(handle.renderer().snapshot().is_err());
}
