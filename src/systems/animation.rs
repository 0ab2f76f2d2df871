//! Frame stepping for animated renders
//!
//! Advances the scene clock by a fixed step per frame and orbits the camera,
//! so a sequence of off-screen frames is reproducible.

use crate::camera::OrbitCamera;

/// State of one animation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub index: u32,
    /// Scene time in seconds
    pub time: f32,
}

/// Fixed-step animation clock
#[derive(Debug, Clone)]
pub struct AnimationSystem {
    frame: u32,
    time: f32,
    frame_interval: f32,
    /// Camera yaw change per frame in degrees
    orbit_step: f32,
}

impl AnimationSystem {
    pub fn new(frame_interval: f32, orbit_step: f32) -> Self {
        Self {
            frame: 0,
            time: 0.0,
            frame_interval: frame_interval.max(0.0),
            orbit_step,
        }
    }

    /// The frame about to be rendered
    pub fn current(&self) -> Frame {
        Frame { index: self.frame, time: self.time }
    }

    /// Move to the next frame, orbiting `camera`
    pub fn advance(&mut self, camera: &mut OrbitCamera) -> Frame {
        self.frame += 1;
        self.time = self.frame as f32 * self.frame_interval;
        camera.orbit(self.orbit_step, 0.0);
        self.current()
    }
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new(1.0 / 30.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_is_fixed_step() {
        let mut camera = OrbitCamera::new(0.0, 0.0, 1.0);
        let mut animation = AnimationSystem::new(0.5, 0.0);
        assert_eq!(animation.current(), Frame { index: 0, time: 0.0 });
        animation.advance(&mut camera);
        let frame = animation.advance(&mut camera);
        assert_eq!(frame, Frame { index: 2, time: 1.0 });
    }

    #[test]
    fn test_orbit_step() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 1.0);
        let mut animation = AnimationSystem::new(0.1, 15.0);
        animation.advance(&mut camera);
        assert_eq!(camera.yaw, 25.0);
    }

    #[test]
    fn test_negative_interval_clamped() {
        let mut camera = OrbitCamera::new(0.0, 0.0, 1.0);
        let mut animation = AnimationSystem::new(-1.0, 0.0);
        assert_eq!(animation.advance(&mut camera).time, 0.0);
    }
}
