//! Rigid rotations used to re-orient a model on the build plate.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Rotation3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

impl FromStr for Axis {
    type Err = MeshError;

    /// Parse `x`, `y` or `z`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(MeshError::InvalidAxis {
                axis: s.to_string(),
            }),
        }
    }
}

/// A rotation about the origin.
///
/// Only X and Y rotations are supported: spinning a model about the vertical
/// axis never changes which faces overhang.
///
/// # Example
///
/// ```
/// use mesh_overhang::{Axis, RigidTransform};
/// use nalgebra::Point3;
///
/// let t = RigidTransform::rotation(std::f64::consts::FRAC_PI_2, Axis::X).unwrap();
/// let p = t.apply(&Point3::new(0.0, 1.0, 0.0));
/// assert!((p.z - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    rotation: Rotation3<f64>,
    angle: f64,
    axis: Axis,
}

impl RigidTransform {
    /// Rotation by `angle` radians about `axis`.
    ///
    /// Fails with [`MeshError::UnsupportedOperation`] for [`Axis::Z`] and
    /// [`MeshError::InvalidConfig`] for a non-finite angle.
    pub fn rotation(angle: f64, axis: Axis) -> MeshResult<Self> {
        if !angle.is_finite() {
            return Err(MeshError::InvalidConfig {
                details: format!("rotation angle must be finite, got {angle}"),
            });
        }
        let unit = match axis {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => {
                return Err(MeshError::UnsupportedOperation {
                    operation: "rotation about the z axis".to_string(),
                })
            }
        };
        Ok(Self {
            rotation: Rotation3::from_axis_angle(&unit, angle),
            angle,
            axis,
        })
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Rotate a point about the origin.
    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation * point
    }

    /// The rotation undoing this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            rotation: self.rotation.inverse(),
            angle: -self.angle,
            axis: self.axis,
        }
    }
}
