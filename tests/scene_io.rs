//! Opening assets from disk and driving a viewer session.

mod common;

use common::AssetBuilder;
use nerfpack::prelude::*;

fn write_asset(asset: &AssetBuilder) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asset.cbor");
    std::fs::write(&path, asset.build()).unwrap();
    (dir, path)
}

#[test]
fn test_open_with_and_without_mmap() {
    let (_dir, path) = write_asset(&AssetBuilder::default());
    let mapped = Scene::open(&path, RenderSettings::default()).unwrap();
    let read = Scene::open_opts(&path, RenderSettings::default(), false).unwrap();
    assert_eq!(mapped.field(), read.field());
    assert_eq!(mapped.grid().occupied_cells(), read.grid().occupied_cells());
}

#[test]
fn test_open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Scene::open(dir.path().join("nope.cbor"), RenderSettings::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_settings_file_drives_scene() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.json");
    std::fs::write(&path, r#"{ "max_iterations": 3 }"#).unwrap();
    let settings = RenderSettings::load(&path).unwrap();
    let scene = Scene::from_slice(&AssetBuilder { density_bias: -5.0, ..Default::default() }.build(), settings).unwrap();
    let out = scene.marcher().march(&Camera::default().ray(4, 4, 9, 9));
    assert_eq!(out.samples, 3);
}

#[test]
fn test_viewer_renders_only_when_requested() {
    let mut viewer = Viewer::new(ViewerConfig {
        width: 16,
        height: 16,
        render_width: Some(8),
        render_height: Some(8),
        background: Vec4::new(0.0, 0.0, 1.0, 1.0),
        ..Default::default()
    });
    assert!(viewer.frame().is_none());

    viewer
        .load_bytes(&AssetBuilder::default().build(), RenderSettings::default())
        .unwrap();
    viewer.set_camera(Camera::look_at(Vec3::new(0.5, 0.5, 4.0), Vec3::splat(0.5), Vec3::Y));
    let frame = viewer.frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (8, 8));
    // Opaque background everywhere after compositing.
    assert!(frame.pixels().iter().all(|p| (p.w - 1.0).abs() < 1e-6));
    assert_eq!(frame.pixel(0, 0), Vec4::new(0.0, 0.0, 1.0, 1.0));
    assert!(viewer.frame().is_none());

    let handle = viewer.scheduler();
    handle.request_redraw();
    assert!(viewer.frame().is_some());
}

#[test]
fn test_viewer_seeds_camera_from_pose() {
    let asset = AssetBuilder {
        // Identity rotation, camera at (0.5, 0.5, 3) in scene units.
        initial_pose: Some(vec![
            1.0, 0.0, 0.0, 0.5, //
            0.0, 1.0, 0.0, 0.5, //
            0.0, 0.0, 1.0, 3.0,
        ]),
        ..Default::default()
    };
    let mut viewer = Viewer::new(ViewerConfig {
        fov: 30.0,
        ..Default::default()
    });
    viewer.load_bytes(&asset.build(), RenderSettings::default()).unwrap();
    let camera = viewer.camera();
    assert_eq!(camera.fov, 30.0);
    assert!((camera.position - Vec3::new(0.5, 0.5, 3.0)).abs().max_element() < 1e-5);
}
