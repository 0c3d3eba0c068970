use glam::DVec3;
use image::{ImageBuffer, Rgb, RgbImage};

use crate::config::{RenderSettings, RobotProfile};

/// Represents a single rendered video frame
///
/// A thin wrapper around an RGB image buffer, the unit handed from renderers
/// to video sinks.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel, ignoring coordinates outside the frame
    pub fn set_pixel(&mut self, x: i64, y: i64, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        self.buffer.put_pixel(x as u32, y as u32, Rgb(color));
    }

    /// Raw interleaved RGB bytes, row major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }
}

/// Video parameters for one request
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,

    /// Camera distance from the tracked body in meters
    pub camera_distance: f64,

    /// Camera elevation in degrees
    pub camera_elevation: f64,

    /// Camera azimuth in degrees
    pub camera_azimuth: f64,

    /// Vertical field of view in degrees
    pub fov_y: f64,

    /// Body the camera is locked on
    pub base_link: String,
}

impl RenderConfig {
    /// Combine the configured defaults with a robot profile and optional
    /// per-request size overrides
    pub fn for_robot(
        settings: &RenderSettings,
        profile: &RobotProfile,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Self {
        Self {
            width: width.unwrap_or(settings.width),
            height: height.unwrap_or(settings.height),
            camera_distance: profile.camera_distance,
            camera_elevation: settings.camera_elevation,
            camera_azimuth: settings.camera_azimuth,
            fov_y: settings.fov_y,
            base_link: profile.base_link.clone(),
        }
    }

    /// Shrink the size to the device limit `(max_width, max_height)`.
    /// Never enlarges; a zero limit leaves that dimension alone. A clamped
    /// dimension is rounded down to even so the encoder never pads it back
    /// past the limit.
    pub fn clamped_to(mut self, (max_width, max_height): (u32, u32)) -> Self {
        if max_width > 0 && self.width > max_width {
            self.width = even_floor(max_width);
        }
        if max_height > 0 && self.height > max_height {
            self.height = even_floor(max_height);
        }
        self
    }

    /// Camera for one frame, centered on `lookat`
    pub fn camera(&self, lookat: DVec3) -> TrackingCamera {
        TrackingCamera {
            distance: self.camera_distance,
            elevation_deg: self.camera_elevation,
            azimuth_deg: self.camera_azimuth,
            fov_y_deg: self.fov_y,
            lookat,
        }
    }
}

fn even_floor(limit: u32) -> u32 {
    if limit >= 2 { limit & !1 } else { limit }
}

/// Orbit camera re-centered on the tracked body every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingCamera {
    pub distance: f64,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub fov_y_deg: f64,
    pub lookat: DVec3,
}

/// A world point mapped onto the image plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl TrackingCamera {
    /// Unit viewing direction (z-up world, azimuth measured from +X)
    pub fn forward(&self) -> DVec3 {
        let elevation = self.elevation_deg.to_radians();
        let azimuth = self.azimuth_deg.to_radians();
        DVec3::new(
            elevation.cos() * azimuth.cos(),
            elevation.cos() * azimuth.sin(),
            elevation.sin(),
        )
    }

    pub fn eye(&self) -> DVec3 {
        self.lookat - self.forward() * self.distance
    }

    /// Focal length in pixels for an image of the given height
    pub fn focal_length(&self, height: u32) -> f64 {
        (height as f64 / 2.0) / (self.fov_y_deg.to_radians() / 2.0).tan()
    }

    /// Pinhole projection into a `width` x `height` image. Points behind the
    /// camera yield `None`.
    pub fn project(&self, point: DVec3, width: u32, height: u32) -> Option<Projection> {
        let forward = self.forward();
        let right = forward.cross(DVec3::Z).try_normalize().unwrap_or(DVec3::X);
        let up = right.cross(forward);

        let relative = point - self.eye();
        let depth = relative.dot(forward);
        if depth <= 1e-6 {
            return None;
        }

        let focal = self.focal_length(height);
        Some(Projection {
            x: width as f64 / 2.0 + focal * relative.dot(right) / depth,
            y: height as f64 / 2.0 - focal * relative.dot(up) / depth,
            depth,
        })
    }
}
