//! CPU mirror of the backdrop's std140 uniform block.
//!
//! `BackdropUniforms` is the single source of truth for the per-frame state
//! the fragment shader consumes: accumulated animation time, viewport size,
//! the latest pointer sample, and the two palette endpoints. [`crate::Backdrop`]
//! mutates this struct between frames and uploads it verbatim before every
//! draw, so the layout must observe std140 alignment rules and stay in sync
//! with the uniform block declared in the embedded fragment shader.

use bytemuck::{Pod, Zeroable};

use crate::Palette;

/// Pointer position reported before any pointer event: the screen centre.
pub(crate) const DEFAULT_POINTER: [f32; 2] = [0.5, 0.5];

#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct BackdropUniforms {
    /// Viewport size in physical pixels.
    pub resolution: [f32; 2],
    /// Normalized pointer position, origin bottom-left. Stored verbatim.
    pub pointer: [f32; 2],
    /// Palette endpoint at the bottom of the gradient.
    pub color_a: [f32; 4],
    /// Palette endpoint at the top of the gradient.
    pub color_b: [f32; 4],
    /// Accumulated animation time in seconds.
    pub time: f32,
    pub _padding: [f32; 3],
}

unsafe impl Zeroable for BackdropUniforms {}
unsafe impl Pod for BackdropUniforms {}

impl BackdropUniforms {
    /// Seeds a uniform block for the given surface size and palette.
    pub fn new(width: u32, height: u32, palette: &Palette) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            pointer: DEFAULT_POINTER,
            color_a: [palette.bottom[0], palette.bottom[1], palette.bottom[2], 1.0],
            color_b: [palette.top[0], palette.top[1], palette.top[2], 1.0],
            time: 0.0,
            _padding: [0.0; 3],
        }
    }

    /// Advances the animation clock by `dt` seconds.
    ///
    /// Negative deltas contribute nothing so the clock stays monotonic even
    /// under caller misuse; repeated zero deltas accumulate no drift.
    pub fn advance(&mut self, dt: f32) {
        self.time += dt.max(0.0);
    }

    /// Writes the current surface dimensions.
    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution[0] = width;
        self.resolution[1] = height;
    }

    /// Stores the latest pointer sample, last write wins.
    ///
    /// Coordinates are expected in [0,1] but are not clamped; out-of-range
    /// values simply move the ripple centre off screen.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer = [x, y];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    const EPSILON: f32 = 1e-5;

    fn uniforms() -> BackdropUniforms {
        BackdropUniforms::new(1920, 1080, &Palette::default())
    }

    /// Sanity-checks that the CPU mirror of the uniform block matches the
    /// layout declared in the GLSL fragment source.
    #[test]
    fn uniforms_follow_std140_layout() {
        let u = uniforms();
        let base = &u as *const _ as usize;

        assert_eq!(align_of::<BackdropUniforms>(), 16);
        assert_eq!(size_of::<BackdropUniforms>(), 64);
        assert_eq!((&u.resolution as *const _ as usize) - base, 0);
        assert_eq!((&u.pointer as *const _ as usize) - base, 8);
        assert_eq!((&u.color_a as *const _ as usize) - base, 16);
        assert_eq!((&u.color_b as *const _ as usize) - base, 32);
        assert_eq!((&u.time as *const _ as usize) - base, 48);
    }

    #[test]
    fn advance_accumulates_exact_sum() {
        let mut u = uniforms();
        let deltas = [0.016_f32, 0.033, 0.0, 0.25, 0.016];
        for dt in deltas {
            u.advance(dt);
        }
        let expected: f32 = deltas.iter().sum();
        assert!((u.time - expected).abs() < EPSILON);
    }

    #[test]
    fn zero_delta_causes_no_drift() {
        let mut u = uniforms();
        u.advance(1.5);
        for _ in 0..1000 {
            u.advance(0.0);
        }
        assert!((u.time - 1.5).abs() < EPSILON);
    }

    #[test]
    fn negative_delta_keeps_clock_monotonic() {
        let mut u = uniforms();
        u.advance(2.0);
        u.advance(-5.0);
        assert!((u.time - 2.0).abs() < EPSILON);
    }

    #[test]
    fn pointer_defaults_to_screen_centre() {
        assert_eq!(uniforms().pointer, [0.5, 0.5]);
    }

    #[test]
    fn pointer_is_last_write_wins_without_clamping() {
        let mut u = uniforms();
        u.set_pointer(0.25, 0.75);
        assert_eq!(u.pointer, [0.25, 0.75]);
        u.set_pointer(-0.4, 1.9);
        assert_eq!(u.pointer, [-0.4, 1.9]);
    }

    #[test]
    fn resize_writes_exact_dimensions() {
        let mut u = uniforms();
        u.set_resolution(1280.0, 720.0);
        assert_eq!(u.resolution, [1280.0, 720.0]);
    }

    #[test]
    fn palette_endpoints_are_opaque() {
        let u = uniforms();
        assert_eq!(u.color_a[3], 1.0);
        assert_eq!(u.color_b[3], 1.0);
    }
}
