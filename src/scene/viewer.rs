//! Viewer session: configuration, camera and redraw scheduling.
//!
//! The viewer never drives its own loop. A host calls [`Viewer::frame`] from
//! whatever loop it runs; a frame is produced only after something requested
//! a redraw (scene load, camera change, reconfigure).

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::Scene;
use crate::render::{Camera, Frame, RenderSettings};
use crate::util::Result;

/// Host-facing viewer options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Display size.
    pub width: usize,
    pub height: usize,
    /// Render resolution; falls back to the display size.
    pub render_width: Option<usize>,
    pub render_height: Option<usize>,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Overrides the asset's up vector.
    pub up: Option<Vec3>,
    /// Straight-alpha clear color.
    pub background: Vec4,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            render_width: None,
            render_height: None,
            fov: 45.0,
            near: 0.01,
            far: 20.0,
            up: None,
            background: Vec4::ZERO,
        }
    }
}

impl ViewerConfig {
    pub fn render_size(&self) -> (usize, usize) {
        (
            self.render_width.unwrap_or(self.width),
            self.render_height.unwrap_or(self.height),
        )
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_lens(&self, camera: &mut Camera) {
        camera.fov = self.fov;
        camera.near = self.near;
        camera.far = self.far;
    }
}

/// Dirty flag shared between the viewer and whatever changes its inputs.
#[derive(Clone, Debug, Default)]
pub struct RenderScheduler {
    dirty: Arc<AtomicBool>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_redraw(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Consume a pending request.
    pub fn take_redraw(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

/// One viewer session.
pub struct Viewer {
    config: ViewerConfig,
    scene: Option<Scene>,
    camera: Camera,
    scheduler: RenderScheduler,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let mut camera = Camera::default();
        config.apply_lens(&mut camera);
        Self {
            config,
            scene: None,
            camera,
            scheduler: RenderScheduler::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[inline]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Handle for requesting redraws from elsewhere.
    pub fn scheduler(&self) -> RenderScheduler {
        self.scheduler.clone()
    }

    /// Replace the configuration. Lens changes apply to the current camera.
    pub fn reconfigure(&mut self, config: ViewerConfig) {
        if config.up != self.config.up {
            if let Some(up) = config.up {
                self.camera = self.camera.reoriented(up);
            }
        }
        config.apply_lens(&mut self.camera);
        tracing::debug!(size = ?config.render_size(), "viewer reconfigured");
        self.config = config;
        self.scheduler.request_redraw();
    }

    /// Install a scene and seed the camera from its pose. Without a pose
    /// the default view is rolled to the configured or asset up vector.
    pub fn load(&mut self, scene: Scene) {
        let mut camera = scene
            .initial_camera()
            .unwrap_or_else(|| Camera::default().reoriented(scene.up(self.config.up)));
        self.config.apply_lens(&mut camera);
        self.camera = camera;
        self.scene = Some(scene);
        self.scheduler.request_redraw();
    }

    /// Decode container bytes and load the result.
    pub fn load_bytes(&mut self, bytes: &[u8], settings: RenderSettings) -> Result<()> {
        let scene = Scene::from_slice(bytes, settings)?;
        self.load(scene);
        Ok(())
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.scheduler.request_redraw();
    }

    /// Render if a redraw is pending and a scene is loaded.
    pub fn frame(&mut self) -> Option<Frame> {
        if !self.scheduler.take_redraw() {
            return None;
        }
        let scene = self.scene.as_ref()?;
        let (width, height) = self.config.render_size();
        let frame = scene.render(&self.camera, width, height);
        Some(frame.over(self.config.background))
    }
}
