// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Authoring-space geometry of a mask source.
//!
//! The host positions every element with `left`/`top` plus a CSS transform
//! made of `scaleX`, `scaleY` and `rotateZ` around a `transform-origin`.
//! [`SourceGeometry`] captures those values; [`TransformSnapshot`] is the
//! subset cached per scene to detect later changes.

use crate::dom::Dom;

/// A numeric property exposed by the host's geometry accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryProperty {
    /// Horizontal offset in pixels.
    Left,
    /// Vertical offset in pixels.
    Top,
    /// Layout width in pixels.
    Width,
    /// Layout height in pixels.
    Height,
    /// Horizontal scale factor.
    ScaleX,
    /// Vertical scale factor.
    ScaleY,
    /// Rotation around the Z axis in degrees.
    RotateZ,
}

impl GeometryProperty {
    /// The property name used by the host accessor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::Width => "width",
            Self::Height => "height",
            Self::ScaleX => "scaleX",
            Self::ScaleY => "scaleY",
            Self::RotateZ => "rotateZ",
        }
    }
}

/// Horizontal or vertical position of a transform origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OriginAnchor {
    /// A fraction of the element's extent (`0.5` is the center).
    Fraction(f64),
    /// A fixed offset in pixels.
    Px(f64),
}

impl OriginAnchor {
    /// Resolves the anchor against an extent in pixels.
    #[must_use]
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Self::Fraction(f) => extent * f,
            Self::Px(px) => px,
        }
    }
}

/// The pivot for rotation and scale, like CSS `transform-origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformOrigin {
    /// Horizontal anchor.
    pub x: OriginAnchor,
    /// Vertical anchor.
    pub y: OriginAnchor,
}

impl TransformOrigin {
    /// The element's center (`50% 50%`), the CSS default.
    pub const CENTER: Self = Self {
        x: OriginAnchor::Fraction(0.5),
        y: OriginAnchor::Fraction(0.5),
    };

    /// Parses an inline `transform-origin` value.
    ///
    /// Accepts percentages, pixel lengths, unitless numbers (read as
    /// percentages, which is how the host serializes them) and the keywords
    /// `left`, `center`, `right`, `top`, `bottom`. A single component applies
    /// to the horizontal axis with the vertical axis centered. Returns `None`
    /// for anything else.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace();
        let first = parts.next()?;
        let second = parts.next();

        // Keywords can appear in either order ("top left").
        let (x_src, y_src) = match second {
            Some(second) if is_vertical_keyword(first) || is_horizontal_keyword(second) => {
                (second, Some(first))
            }
            _ => (first, second),
        };

        let x = parse_anchor(x_src, Axis::Horizontal)?;
        let y = match y_src {
            Some(src) => parse_anchor(src, Axis::Vertical)?,
            None => OriginAnchor::Fraction(0.5),
        };
        Some(Self { x, y })
    }

    /// Resolves the origin against an element box, returning pixel offsets.
    #[must_use]
    pub fn offsets(self, width: f64, height: f64) -> (f64, f64) {
        (self.x.resolve(width), self.y.resolve(height))
    }
}

impl Default for TransformOrigin {
    fn default() -> Self {
        Self::CENTER
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn is_horizontal_keyword(s: &str) -> bool {
    matches!(s, "left" | "right")
}

fn is_vertical_keyword(s: &str) -> bool {
    matches!(s, "top" | "bottom")
}

fn parse_anchor(src: &str, axis: Axis) -> Option<OriginAnchor> {
    match (src, axis) {
        ("center", _) => return Some(OriginAnchor::Fraction(0.5)),
        ("left", Axis::Horizontal) | ("top", Axis::Vertical) => {
            return Some(OriginAnchor::Fraction(0.0));
        }
        ("right", Axis::Horizontal) | ("bottom", Axis::Vertical) => {
            return Some(OriginAnchor::Fraction(1.0));
        }
        _ => {}
    }
    if let Some(pct) = src.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| OriginAnchor::Fraction(p / 100.0));
    }
    if let Some(px) = src.strip_suffix("px") {
        return px.trim().parse::<f64>().ok().map(OriginAnchor::Px);
    }
    src.parse::<f64>().ok().map(|p| OriginAnchor::Fraction(p / 100.0))
}

/// Live geometry of a mask source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceGeometry {
    /// Horizontal offset in pixels.
    pub left: f64,
    /// Vertical offset in pixels.
    pub top: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees.
    pub rotate_z: f64,
    /// Layout width in pixels.
    pub width: f64,
    /// Layout height in pixels.
    pub height: f64,
    /// Pivot for rotation and scale.
    pub origin: TransformOrigin,
}

impl Default for SourceGeometry {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotate_z: 0.0,
            width: 0.0,
            height: 0.0,
            origin: TransformOrigin::CENTER,
        }
    }
}

impl SourceGeometry {
    /// Whether the transform rotates or scales, i.e. whether the origin
    /// matters.
    #[must_use]
    pub fn needs_origin(&self) -> bool {
        self.rotate_z != 0.0 || self.scale_x != 1.0 || self.scale_y != 1.0
    }

    /// Reads the source's geometry through the host.
    ///
    /// Missing values default to the identity (`0` offsets and rotation,
    /// unit scale). Width, height and the transform origin are only read
    /// when the transform rotates or scales.
    #[must_use]
    pub fn read<D: Dom + ?Sized>(dom: &D, node: &D::Node) -> Self {
        let snapshot = TransformSnapshot::read(dom, node);
        let mut geometry = Self {
            left: snapshot.left,
            top: snapshot.top,
            scale_x: snapshot.scale_x,
            scale_y: snapshot.scale_y,
            rotate_z: snapshot.rotate_z,
            ..Self::default()
        };
        if geometry.needs_origin() {
            geometry.width = dom.geometry(node, GeometryProperty::Width).unwrap_or(0.0);
            geometry.height = dom.geometry(node, GeometryProperty::Height).unwrap_or(0.0);
            geometry.origin = dom
                .style_property(node, "transform-origin")
                .and_then(|v| TransformOrigin::parse(&v))
                .unwrap_or_default();
        }
        geometry
    }

    /// The change-detection subset of this geometry.
    #[must_use]
    pub fn snapshot(&self) -> TransformSnapshot {
        TransformSnapshot {
            left: self.left,
            top: self.top,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            rotate_z: self.rotate_z,
        }
    }
}

/// The last geometry a clip path was generated from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformSnapshot {
    /// Horizontal offset in pixels.
    pub left: f64,
    /// Vertical offset in pixels.
    pub top: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees.
    pub rotate_z: f64,
}

impl TransformSnapshot {
    /// Reads the live values of the snapshot fields through the host, with
    /// the same defaults as [`SourceGeometry::read`].
    #[must_use]
    pub fn read<D: Dom + ?Sized>(dom: &D, node: &D::Node) -> Self {
        let get = |p: GeometryProperty, default: f64| {
            dom.geometry(node, p).filter(|v| !v.is_nan()).unwrap_or(default)
        };
        Self {
            left: get(GeometryProperty::Left, 0.0),
            top: get(GeometryProperty::Top, 0.0),
            scale_x: get(GeometryProperty::ScaleX, 1.0),
            scale_y: get(GeometryProperty::ScaleY, 1.0),
            rotate_z: get(GeometryProperty::RotateZ, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_defaults_to_center() {
        assert_eq!(TransformOrigin::default(), TransformOrigin::CENTER);
        assert_eq!(TransformOrigin::CENTER.offsets(100.0, 50.0), (50.0, 25.0));
    }

    #[test]
    fn origin_percentages_and_pixels() {
        let o = TransformOrigin::parse("25% 75%").unwrap();
        assert_eq!(o.offsets(200.0, 100.0), (50.0, 75.0));

        let o = TransformOrigin::parse("10px 4px").unwrap();
        assert_eq!(o.offsets(200.0, 100.0), (10.0, 4.0));

        // Unitless components are percentages.
        let o = TransformOrigin::parse("0 100").unwrap();
        assert_eq!(o.offsets(200.0, 100.0), (0.0, 100.0));
    }

    #[test]
    fn origin_keywords_in_either_order() {
        let a = TransformOrigin::parse("left top").unwrap();
        let b = TransformOrigin::parse("top left").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.offsets(80.0, 40.0), (0.0, 0.0));

        let c = TransformOrigin::parse("right").unwrap();
        assert_eq!(c.offsets(80.0, 40.0), (80.0, 20.0));
    }

    #[test]
    fn origin_rejects_garbage() {
        assert_eq!(TransformOrigin::parse(""), None);
        assert_eq!(TransformOrigin::parse("sideways"), None);
        assert_eq!(TransformOrigin::parse("top top"), None);
    }

    #[test]
    fn pure_translation_needs_no_origin() {
        let g = SourceGeometry {
            left: 3.0,
            top: 4.0,
            ..SourceGeometry::default()
        };
        assert!(!g.needs_origin());
        assert!(
            SourceGeometry {
                rotate_z: 10.0,
                ..g
            }
            .needs_origin()
        );
    }
}
