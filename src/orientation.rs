//! Value types for a sensor's instantaneous rotation and the calibration
//! applied on top of it.

/// A sensor's instantaneous rotation, as raw wire components in the order
/// `w, x, y, z`.
///
/// The components are not necessarily a unit quaternion; nothing here clamps
/// or renormalizes, that is a rendering-time concern. Every inbound packet
/// replaces the whole sample at once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// Scalar component.
    pub w: f32,
    /// X component of the vector part.
    pub x: f32,
    /// Y component of the vector part.
    pub y: f32,
    /// Z component of the vector part.
    pub z: f32,
}

impl OrientationSample {
    /// The identity rotation, which every connection starts out holding.
    pub const IDENTITY: OrientationSample = OrientationSample {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Builds a sample from individual components.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        OrientationSample { w, x, y, z }
    }

    /// The components in wire order `[w, x, y, z]`, the same layout used by
    /// recorded frames.
    pub fn components(&self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// Rebuilds a sample from a `[w, x, y, z]` array, e.g. out of a
    /// recorded frame.
    pub fn from_components(components: [f32; 4]) -> Self {
        let [w, x, y, z] = components;
        OrientationSample { w, x, y, z }
    }
}

impl Default for OrientationSample {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A 3-axis Euler rotation in radians that consumers apply multiplicatively
/// to the raw sample before use.
///
/// Owned by the device connection and only ever replaced as a whole triple,
/// never one axis at a time, so readers cannot observe a half-applied
/// calibration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationOffset {
    /// Rotation around the X axis, radians.
    pub x: f32,
    /// Rotation around the Y axis, radians.
    pub y: f32,
    /// Rotation around the Z axis, radians.
    pub z: f32,
}

impl CalibrationOffset {
    /// Builds an offset from the three axis rotations.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        CalibrationOffset { x, y, z }
    }

    /// True for the default, untouched calibration.
    pub fn is_zero(&self) -> bool {
        *self == CalibrationOffset::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_round_trip() {
        let sample = OrientationSample::new(0.7, 0.1, -0.2, 0.3);
        assert_eq!(
            sample,
            OrientationSample::from_components(sample.components())
        );
    }

    #[test]
    fn default_is_identity() {
        let sample = OrientationSample::default();
        assert_eq!(sample.components(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn default_offset_is_zero() {
        assert!(CalibrationOffset::default().is_zero());
        assert!(!CalibrationOffset::new(0.1, 0.0, 0.0).is_zero());
    }
}
