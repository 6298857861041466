//! Per-camera depth-of-field settings.
//!
//! Ranges are enforced when a value is edited, through the `set_*` methods.
//! The pipeline never re-validates, so edge values such as `aperture = 1`
//! must render (a very wide CoC is expected, not an error).

use std::ops::RangeInclusive;

pub const DOWN_SAMPLE_RANGE: RangeInclusive<u32> = 2..=8;
pub const FOCUS_DISTANCE_RANGE: RangeInclusive<f32> = 0.1..=300.0;
pub const APERTURE_RANGE: RangeInclusive<f32> = 1.0..=32.0;
pub const BLADE_COUNT_RANGE: RangeInclusive<f32> = 3.0..=9.0;
pub const BLADE_CURVATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const BLADE_ROTATION_RANGE: RangeInclusive<f32> = -180.0..=180.0;

/// Opaque handle to the scene node used for auto-focus.
///
/// The pipeline never dereferences it; a [`crate::FocusResolver`] maps it to
/// a world position each frame, and a handle that no longer resolves behaves
/// as if no target were bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusTarget(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct EffectSettings {
    pub active: bool,
    pub auto_focus: bool,
    pub focus_target: Option<FocusTarget>,
    pub down_sample: u32,
    /// Manual focus plane distance in meters.
    pub focus_distance: f32,
    /// f-number.
    pub aperture: f32,
    pub blade_count: f32,
    pub blade_curvature: f32,
    /// Degrees.
    pub blade_rotation: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            active: true,
            auto_focus: false,
            focus_target: None,
            down_sample: 2,
            focus_distance: 10.0,
            aperture: 5.6,
            blade_count: 5.0,
            blade_curvature: 1.0,
            blade_rotation: 0.0,
        }
    }
}

fn clamp_f32(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

impl EffectSettings {
    pub fn set_down_sample(&mut self, value: u32) {
        self.down_sample = value.clamp(*DOWN_SAMPLE_RANGE.start(), *DOWN_SAMPLE_RANGE.end());
    }

    pub fn set_focus_distance(&mut self, meters: f32) {
        self.focus_distance = clamp_f32(meters, &FOCUS_DISTANCE_RANGE);
    }

    pub fn set_aperture(&mut self, f_number: f32) {
        self.aperture = clamp_f32(f_number, &APERTURE_RANGE);
    }

    pub fn set_blade_count(&mut self, count: f32) {
        self.blade_count = clamp_f32(count, &BLADE_COUNT_RANGE);
    }

    pub fn set_blade_curvature(&mut self, curvature: f32) {
        self.blade_curvature = clamp_f32(curvature, &BLADE_CURVATURE_RANGE);
    }

    pub fn set_blade_rotation(&mut self, degrees: f32) {
        self.blade_rotation = clamp_f32(degrees, &BLADE_ROTATION_RANGE);
    }

    /// Bind (or clear) the auto-focus target.
    pub fn set_focus_target(&mut self, target: Option<FocusTarget>) {
        self.focus_target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_component_defaults() {
        let s = EffectSettings::default();
        assert!(s.active);
        assert!(!s.auto_focus);
        assert_eq!(s.focus_target, None);
        assert_eq!(s.down_sample, 2);
        assert_eq!(s.focus_distance, 10.0);
        assert_eq!(s.aperture, 5.6);
        assert_eq!(s.blade_count, 5.0);
        assert_eq!(s.blade_curvature, 1.0);
        assert_eq!(s.blade_rotation, 0.0);
    }

    #[test]
    fn setters_clamp_to_ranges() {
        let mut s = EffectSettings::default();
        s.set_down_sample(1);
        assert_eq!(s.down_sample, 2);
        s.set_down_sample(20);
        assert_eq!(s.down_sample, 8);
        s.set_focus_distance(0.0);
        assert_eq!(s.focus_distance, 0.1);
        s.set_focus_distance(1000.0);
        assert_eq!(s.focus_distance, 300.0);
        s.set_aperture(0.5);
        assert_eq!(s.aperture, 1.0);
        s.set_blade_count(12.0);
        assert_eq!(s.blade_count, 9.0);
        s.set_blade_curvature(-0.3);
        assert_eq!(s.blade_curvature, 0.0);
        s.set_blade_rotation(270.0);
        assert_eq!(s.blade_rotation, 180.0);
    }

    #[test]
    fn in_range_values_are_kept() {
        let mut s = EffectSettings::default();
        s.set_down_sample(4);
        s.set_aperture(2.8);
        s.set_blade_rotation(-45.0);
        assert_eq!(s.down_sample, 4);
        assert_eq!(s.aperture, 2.8);
        assert_eq!(s.blade_rotation, -45.0);
    }
}
