// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Authoring-space geometry to SVG `transform` attribute.
//!
//! The host applies `translate(left, top)` followed by a CSS transform whose
//! rotation and scale pivot on `transform-origin`. An SVG `transform`
//! attribute has no origin property: its functions pivot on the user-space
//! origin and apply right to left. [`SvgTransform::from_geometry`] therefore
//! emits
//!
//! ```text
//! translate(left top) rotate(a ox oy) translate(-ox·(sx-1) -oy·(sy-1)) scale(sx sy)
//! ```
//!
//! which applies the scale first, shifts it back so the origin stays fixed,
//! rotates about the origin and finally positions the result. Rotation and
//! scale terms are left out when they are the identity.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, Point};

use crate::dom::Dom;
use crate::geometry::SourceGeometry;
use crate::id::ElementId;
use crate::scene::SnapshotCache;

/// One SVG transform function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformOp {
    /// `translate(x y)`.
    Translate {
        /// Horizontal offset.
        x: f64,
        /// Vertical offset.
        y: f64,
    },
    /// `rotate(degrees cx cy)`.
    Rotate {
        /// Angle in degrees, clockwise in a y-down space.
        degrees: f64,
        /// Pivot x.
        cx: f64,
        /// Pivot y.
        cy: f64,
    },
    /// `scale(x y)`.
    Scale {
        /// Horizontal factor.
        x: f64,
        /// Vertical factor.
        y: f64,
    },
}

impl TransformOp {
    /// The equivalent affine map.
    #[must_use]
    pub fn to_affine(self) -> Affine {
        match self {
            Self::Translate { x, y } => Affine::translate((x, y)),
            Self::Rotate { degrees, cx, cy } => {
                Affine::rotate_about(degrees.to_radians(), Point::new(cx, cy))
            }
            Self::Scale { x, y } => Affine::scale_non_uniform(x, y),
        }
    }
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Translate { x, y } => write!(f, "translate({} {})", Num(x), Num(y)),
            Self::Rotate { degrees, cx, cy } => {
                write!(f, "rotate({} {} {})", Num(degrees), Num(cx), Num(cy))
            }
            Self::Scale { x, y } => write!(f, "scale({} {})", Num(x), Num(y)),
        }
    }
}

/// An SVG `transform` attribute value: functions in attribute order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SvgTransform {
    ops: Vec<TransformOp>,
}

impl SvgTransform {
    /// Builds the transform equivalent to the host's placement of `geometry`.
    #[must_use]
    pub fn from_geometry(geometry: &SourceGeometry) -> Self {
        let (ox, oy) = if geometry.needs_origin() {
            geometry.origin.offsets(geometry.width, geometry.height)
        } else {
            (0.0, 0.0)
        };

        let mut ops = Vec::with_capacity(4);
        ops.push(TransformOp::Translate {
            x: geometry.left,
            y: geometry.top,
        });
        if geometry.rotate_z != 0.0 {
            ops.push(TransformOp::Rotate {
                degrees: geometry.rotate_z,
                cx: ox,
                cy: oy,
            });
        }
        if geometry.scale_x != 1.0 || geometry.scale_y != 1.0 {
            ops.push(TransformOp::Translate {
                x: -ox * (geometry.scale_x - 1.0),
                y: -oy * (geometry.scale_y - 1.0),
            });
            ops.push(TransformOp::Scale {
                x: geometry.scale_x,
                y: geometry.scale_y,
            });
        }
        Self { ops }
    }

    /// The functions in attribute order (the last one applies first).
    #[must_use]
    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// The composed affine map.
    #[must_use]
    pub fn to_affine(&self) -> Affine {
        self.ops
            .iter()
            .fold(Affine::IDENTITY, |acc, op| acc * op.to_affine())
    }
}

impl fmt::Display for SvgTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

/// Reads `source`'s geometry, records it as the scene's snapshot for
/// `source_id` and returns the matching SVG transform.
///
/// The snapshot is written on every call, whether or not it changed.
pub fn calculate_and_store<D: Dom + ?Sized>(
    dom: &D,
    snapshots: &mut SnapshotCache,
    source: &D::Node,
    source_id: &ElementId,
) -> SvgTransform {
    let geometry = SourceGeometry::read(dom, source);
    snapshots.insert(source_id.clone(), geometry.snapshot());
    SvgTransform::from_geometry(&geometry)
}

/// Formats a number the way a script engine stringifies it: no trailing
/// `.0` and no negative zero.
struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            f.write_str("0")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
