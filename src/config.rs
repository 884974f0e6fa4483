//! Runtime configuration.
//!
//! Every tunable of the walkthrough lives in [`Config`]. The defaults reproduce
//! the literal values of the floor-plan scene; callers override single fields
//! with struct update syntax:
//!
//! ```
//! let config = floor_ngin::config::Config {
//!     window_title: "My flat".into(),
//!     ..Default::default()
//! };
//! assert_eq!(config.animation.total_frames, 100);
//! ```

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use instant::Duration;

/// What happens when a camera transition starts while another one is still running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Both animations keep running. They are applied in start order every frame,
    /// so the most recently started one determines the camera.
    #[default]
    Overlap,
    /// Running camera animations are dropped before the new ones start.
    Replace,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationConfig {
    pub frame_rate: f32,
    pub total_frames: u32,
    pub overlap: OverlapPolicy,
}

impl AnimationConfig {
    /// Wall-clock length of a transition. A frame rate that is not positive
    /// (or NaN) makes transitions instant, an overflowing one saturates.
    pub fn duration(&self) -> Duration {
        if self.frame_rate.is_nan() || self.frame_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(self.total_frames as f32 / self.frame_rate)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            total_frames: 100,
            overlap: OverlapPolicy::Overlap,
        }
    }
}

/// Initial arc-rotate placement and the input controller speeds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    /// Horizontal angle around the target in radians.
    pub alpha: f32,
    /// Angle from the up axis in radians.
    pub beta: f32,
    pub radius: f32,
    pub min_radius: f32,
    /// Radians per pixel of left-drag.
    pub orbit_speed: f32,
    /// World units per pixel of right-drag.
    pub pan_speed: f32,
    /// Radians per second while an arrow key is held.
    pub key_orbit_speed: f32,
    pub zoom_speed: f32,
    /// Cursor travel in pixels up to which a press and release still counts as a click.
    pub click_threshold: f64,
    pub fovy_deg: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            alpha: -FRAC_PI_2,
            beta: FRAC_PI_4,
            radius: 10.0,
            min_radius: 0.5,
            orbit_speed: 0.005,
            pan_speed: 0.02,
            key_orbit_speed: 1.0,
            zoom_speed: 0.5,
            click_threshold: 10.0,
            fovy_deg: 45.0,
            znear: 0.1,
            zfar: 500.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Id of the `<canvas>` element used as render target on the web.
    pub canvas_id: String,
    pub window_title: String,
    pub animation: AnimationConfig,
    pub camera: CameraConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas_id: "renderCanvas".to_string(),
            window_title: "floor-ngin".to_string(),
            animation: AnimationConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_animation_lasts_100_frames_at_60_fps() {
        let duration = AnimationConfig::default().duration();
        assert!((duration.as_secs_f32() - 100.0 / 60.0).abs() < 1e-4);
    }

    #[test]
    fn non_positive_frame_rate_means_instant_animation() {
        let config = AnimationConfig {
            frame_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(config.duration(), Duration::ZERO);
    }

    #[test]
    fn nan_or_huge_durations_do_not_panic() {
        let nan = AnimationConfig {
            frame_rate: f32::NAN,
            ..Default::default()
        };
        assert_eq!(nan.duration(), Duration::ZERO);

        let tiny = AnimationConfig {
            frame_rate: f32::MIN_POSITIVE,
            total_frames: u32::MAX,
            ..Default::default()
        };
        assert_eq!(tiny.duration(), Duration::MAX);
    }
}
