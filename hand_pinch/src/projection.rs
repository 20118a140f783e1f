//! 3D sensor space → 2D screen space.
//!
//! A fixed affine map: sensor `x` becomes screen column, sensor `z` becomes
//! screen row, both shifted so the sensor origin lands at the screen centre.
//! Sensor `y` (height above the device) is dropped.

use crate::frame::Joint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        ScreenSize { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        ScreenSize::new(700, 500)
    }
}

/// Integer screen coordinate.  May fall outside the screen; drawing clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        ScreenPoint { x, y }
    }
}

/// Projector bound to one screen size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projector {
    size: ScreenSize,
    half_w: f32,
    half_h: f32,
}

impl Projector {
    pub fn new(size: ScreenSize) -> Self {
        Projector {
            size,
            half_w: size.width as f32 / 2.0,
            half_h: size.height as f32 / 2.0,
        }
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    /// `(x + width/2, z + height/2)` truncated toward zero; `None` in, `None` out.
    pub fn project(&self, joint: Option<Joint>) -> Option<ScreenPoint> {
        let j = joint?;
        Some(ScreenPoint::new(
            (j.x + self.half_w) as i32,
            (j.z + self.half_h) as i32,
        ))
    }
}

/// One-shot form of [`Projector::project`].
pub fn project(joint: Option<Joint>, size: ScreenSize) -> Option<ScreenPoint> {
    Projector::new(size).project(joint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_centre() {
        let p = project(Some(Joint::new(0.0, 123.0, 0.0)), ScreenSize::new(700, 500));
        assert_eq!(p, Some(ScreenPoint::new(350, 250)));
    }

    #[test]
    fn y_is_ignored_and_z_is_row() {
        let proj = Projector::new(ScreenSize::new(700, 500));
        let a = proj.project(Some(Joint::new(10.0, 0.0, -40.0)));
        let b = proj.project(Some(Joint::new(10.0, 999.0, -40.0)));
        assert_eq!(a, b);
        assert_eq!(a, Some(ScreenPoint::new(360, 210)));
    }

    #[test]
    fn fractional_coordinates_truncate() {
        let proj = Projector::new(ScreenSize::new(700, 500));
        assert_eq!(proj.project(Some(Joint::new(0.9, 0.0, 0.6))), Some(ScreenPoint::new(350, 250)));
        // -350.5 + 350 = -0.5 truncates toward zero.
        assert_eq!(proj.project(Some(Joint::new(-350.5, 0.0, 0.0))).map(|p| p.x), Some(0));
    }

    #[test]
    fn missing_joint_projects_to_none() {
        assert_eq!(project(None, ScreenSize::default()), None);
    }

    #[test]
    fn odd_sizes_use_half_pixel_offsets() {
        let proj = Projector::new(ScreenSize::new(101, 51));
        assert_eq!(proj.project(Some(Joint::default())), Some(ScreenPoint::new(50, 25)));
    }
}
