//! Device-dependent view policy: zoom bounds, marker size, and which layers
//! are visible at a given scale factor.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

/// How pointer events reach the globe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Pointer,
    Touch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
    pub initial: f64,
    /// Wheel zoom never goes below this, even when `min` is smaller.
    pub wheel_min: f64,
}

impl ZoomBounds {
    pub fn for_device(device: DeviceClass) -> Self {
        match device {
            DeviceClass::Mobile => Self {
                min: 0.3,
                max: 4.0,
                initial: 0.7,
                wheel_min: 0.3,
            },
            DeviceClass::Desktop => Self {
                min: 0.5,
                max: 8.0,
                initial: 0.9,
                wheel_min: 0.8,
            },
        }
    }

    #[inline]
    pub fn clamp(&self, scale_factor: f64) -> f64 {
        scale_factor.clamp(self.min, self.max)
    }

    #[inline]
    pub fn clamp_wheel(&self, scale_factor: f64) -> f64 {
        scale_factor.clamp(self.wheel_min.max(self.min), self.max)
    }
}

/// Which scale-dependent layers are shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub show_boundaries: bool,
    pub show_labels: bool,
}

/// Layer visibility for a scale factor. Thresholds are strict: exactly 2.0
/// on desktop still hides boundaries.
pub fn visibility(device: DeviceClass, scale_factor: f64) -> Visibility {
    match device {
        DeviceClass::Desktop => Visibility {
            show_boundaries: scale_factor > 2.0,
            show_labels: scale_factor > 3.0,
        },
        DeviceClass::Mobile => Visibility {
            show_boundaries: scale_factor > 2.5,
            show_labels: false,
        },
    }
}

/// Marker glyph size in dots.
pub fn marker_size(device: DeviceClass) -> f64 {
    match device {
        DeviceClass::Mobile => 6.0,
        DeviceClass::Desktop => 8.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_thresholds() {
        let v = visibility(DeviceClass::Desktop, 2.0);
        assert!(!v.show_boundaries);
        assert!(!v.show_labels);

        let v = visibility(DeviceClass::Desktop, 2.5);
        assert!(v.show_boundaries);
        assert!(!v.show_labels);

        let v = visibility(DeviceClass::Desktop, 3.5);
        assert!(v.show_boundaries);
        assert!(v.show_labels);
    }

    #[test]
    fn test_mobile_never_shows_labels() {
        let v = visibility(DeviceClass::Mobile, 2.4);
        assert!(!v.show_boundaries);
        let v = visibility(DeviceClass::Mobile, 4.0);
        assert!(v.show_boundaries);
        assert!(!v.show_labels);
    }

    #[test]
    fn test_zoom_clamp() {
        let desktop = ZoomBounds::for_device(DeviceClass::Desktop);
        assert_eq!(desktop.clamp(0.1), 0.5);
        assert_eq!(desktop.clamp(20.0), 8.0);
        assert_eq!(desktop.clamp_wheel(0.6), 0.8);

        let mobile = ZoomBounds::for_device(DeviceClass::Mobile);
        assert_eq!(mobile.clamp(0.1), 0.3);
        assert_eq!(mobile.clamp(5.0), 4.0);
        assert_eq!(mobile.initial, 0.7);
    }
}
