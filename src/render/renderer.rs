use crate::error::BackendError;
use crate::render::types::{Frame, TrackingCamera};
use crate::retarget::PhysicsState;

/// Produces one image of the current physics state per call
pub trait FrameRenderer: Send {
    fn render(&mut self, state: &dyn PhysicsState, camera: &TrackingCamera) -> Result<Frame, BackendError>;

    /// Release device resources. Called exactly once by the owning session.
    fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Colors and sizes used by [`SkeletonRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonStyle {
    pub background: [u8; 3],
    pub body_color: [u8; 3],
    pub near_color: [u8; 3],

    /// Drawn radius of a body marker in meters
    pub body_radius: f64,
}

impl Default for SkeletonStyle {
    fn default() -> Self {
        Self {
            background: [28, 30, 36],
            body_color: [90, 170, 255],
            near_color: [255, 200, 90],
            body_radius: 0.035,
        }
    }
}

/// Software renderer drawing every body of the model as a shaded disc
///
/// Needs no GPU or offscreen context, so it works on headless hosts.
pub struct SkeletonRenderer {
    width: u32,
    height: u32,
    style: SkeletonStyle,
}

impl SkeletonRenderer {
    pub fn new(width: u32, height: u32, style: SkeletonStyle) -> Result<Self, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::new(format!("invalid render size {}x{}", width, height)));
        }
        Ok(Self { width, height, style })
    }

    fn draw_disc(&self, frame: &mut Frame, cx: f64, cy: f64, radius: f64, color: [u8; 3]) {
        let r = radius.max(1.0);
        let r_sq = r * r;

        // bodies right in front of the lens project to huge discs
        let (max_x, max_y) = (self.width as i64 - 1, self.height as i64 - 1);
        let x0 = ((cx - r).floor() as i64).max(0);
        let x1 = ((cx + r).ceil() as i64).min(max_x);
        let y0 = ((cy - r).floor() as i64).max(0);
        let y1 = ((cy + r).ceil() as i64).min(max_y);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r_sq {
                    frame.set_pixel(x, y, color);
                }
            }
        }
    }
}

impl FrameRenderer for SkeletonRenderer {
    fn render(&mut self, state: &dyn PhysicsState, camera: &TrackingCamera) -> Result<Frame, BackendError> {
        let mut frame = Frame::new_filled(self.width, self.height, self.style.background);
        let focal = camera.focal_length(self.height);

        let mut projected: Vec<_> = state
            .body_positions()
            .into_iter()
            .filter_map(|(_, position)| camera.project(position, self.width, self.height))
            .collect();

        if projected.is_empty() {
            return Ok(frame);
        }

        // painter's order: far bodies first
        projected.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        let nearest = projected.last().map(|p| p.depth).unwrap_or(1.0);
        let farthest = projected.first().map(|p| p.depth).unwrap_or(1.0);
        let span = (farthest - nearest).max(1e-9);

        for p in &projected {
            let t = ((farthest - p.depth) / span).clamp(0.0, 1.0);
            let color = blend(self.style.body_color, self.style.near_color, t);
            let radius = focal * self.style.body_radius / p.depth;
            self.draw_disc(&mut frame, p.x, p.y, radius, color);
        }

        Ok(frame)
    }
}

fn blend(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round().clamp(0.0, 255.0) as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}
