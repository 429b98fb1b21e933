// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration and typed views of the declarative attributes.
//!
//! Consumers and sources are configured through `data-*` attributes in the
//! exported document. They are read once per evaluation into
//! [`ConsumerConfig`] and [`SourceConfig`]; malformed values are dropped at
//! this boundary so the synthesizer only sees valid settings.

use alloc::string::String;
use core::fmt;

use crate::dom::Dom;
use crate::time::{Duration, MICROS_PER_SEC};

/// Attribute and class names shared with the host document.
pub mod attr {
    /// Consumer: selector of its mask source.
    pub const CLIP_PATH: &str = "data-clip-path";
    /// Consumer: `clip-rule` override for the generated path.
    pub const CLIP_RULE: &str = "data-clip-path-clip-rule";
    /// Consumer: present when the clip must not be kept live.
    pub const STATIC: &str = "data-clip-path-static";
    /// Consumer or source: present when the source stays visible.
    pub const VISIBLE: &str = "data-clip-path-visible";
    /// Source: clip style variant.
    pub const STYLE: &str = "data-clip-path-style";
    /// Source: back-reference to the consumer selector it currently serves.
    pub const SELECTOR: &str = "data-clip-path-selector";

    /// Class the host puts on structural element containers.
    pub const CONTAINER_CLASS: &str = "HYPE_element_container";

    /// Selector matching every consumer.
    pub const CONSUMER_SELECTOR: &str = "[data-clip-path]";
}

/// SVG `clip-rule` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillRule {
    /// `nonzero`.
    NonZero,
    /// `evenodd`.
    EvenOdd,
}

impl FillRule {
    /// Parses a `clip-rule` value, case-insensitively. Returns `None` for
    /// anything but `nonzero` and `evenodd`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("nonzero") {
            Some(Self::NonZero)
        } else if value.eq_ignore_ascii_case("evenodd") {
            Some(Self::EvenOdd)
        } else {
            None
        }
    }

    /// The attribute value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonZero => "nonzero",
            Self::EvenOdd => "evenodd",
        }
    }
}

/// How a source's clip is attached to its consumers.
///
/// Only one variant exists; unknown or absent declarations fall back to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipStyle {
    /// A `clipPath` definition referenced with `clip-path: url("#id")`.
    #[default]
    UrlReference,
}

impl ClipStyle {
    /// Parses a declared style, falling back to the default.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("url") | Some("") | None => Self::UrlReference,
            Some(_) => Self::default(),
        }
    }
}

/// A consumer's declarative configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Selector of the mask source; `None` when absent or empty.
    pub selector: Option<String>,
    /// Validated `clip-rule` override.
    pub clip_rule: Option<FillRule>,
    /// Whether live observation is disabled for this consumer.
    pub is_static: bool,
    /// Whether the source stays visible after donating its geometry.
    pub source_visible: bool,
}

impl ConsumerConfig {
    /// Reads the configuration from `node`'s attributes.
    #[must_use]
    pub fn read<D: Dom + ?Sized>(dom: &D, node: &D::Node) -> Self {
        Self {
            selector: dom
                .attribute(node, attr::CLIP_PATH)
                .filter(|s| !s.trim().is_empty()),
            clip_rule: dom
                .attribute(node, attr::CLIP_RULE)
                .and_then(|v| FillRule::parse(&v)),
            is_static: dom.has_attribute(node, attr::STATIC),
            source_visible: is_flag_set(dom.attribute(node, attr::VISIBLE)),
        }
    }
}

/// A source's declarative configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Clip style variant.
    pub style: ClipStyle,
    /// Whether the source stays visible after donating its geometry.
    pub visible: bool,
}

impl SourceConfig {
    /// Reads the configuration from `node`'s attributes.
    #[must_use]
    pub fn read<D: Dom + ?Sized>(dom: &D, node: &D::Node) -> Self {
        Self {
            style: ClipStyle::parse(dom.attribute(node, attr::STYLE).as_deref()),
            visible: is_flag_set(dom.attribute(node, attr::VISIBLE)),
        }
    }
}

/// Dataset flags are set when present with any non-empty value.
fn is_flag_set(value: Option<String>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// A validated frame-rate cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRate(u32);

/// Reasons a frame-rate cap is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRateError {
    /// Zero or negative rate.
    NotPositive(i64),
    /// At or above the display's nominal rate, where a cap does nothing.
    TooHigh(i64),
}

impl fmt::Display for FrameRateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(fps) => write!(f, "frame rate must be positive (got {fps})"),
            Self::TooHigh(fps) => write!(
                f,
                "frame rate must be below {} (got {fps})",
                FrameRate::MAX.0 + 1
            ),
        }
    }
}

impl core::error::Error for FrameRateError {}

impl FrameRate {
    /// Highest accepted cap.
    pub const MAX: Self = Self(59);

    /// Validates a cap; accepts `1..=59`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameRateError`] for values outside that range.
    pub fn new(fps: i64) -> Result<Self, FrameRateError> {
        if fps <= 0 {
            Err(FrameRateError::NotPositive(fps))
        } else if fps > i64::from(Self::MAX.0) {
            Err(FrameRateError::TooHigh(fps))
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "checked to be in 1..=59"
            )]
            Ok(Self(fps as u32))
        }
    }

    /// Frames per second.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Time between flushes.
    #[must_use]
    pub const fn interval(self) -> Duration {
        Duration(MICROS_PER_SEC / self.0 as u64)
    }
}

/// When queued updates are flushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Pacing {
    /// On every tick.
    #[default]
    Uncapped,
    /// At most once per frame interval of the given rate.
    Fixed(FrameRate),
}

impl Pacing {
    /// Pacing for a requested frame rate: capped for `1..=59`, uncapped for
    /// anything else.
    #[must_use]
    pub fn from_fps(fps: i64) -> Self {
        FrameRate::new(fps).map_or(Self::Uncapped, Self::Fixed)
    }
}

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Flush pacing.
    pub pacing: Pacing,
    /// Whether the engine runs inside the authoring tool's live preview.
    ///
    /// Preview mode observes static consumers too, never hides sources,
    /// keeps `defs` last in its parent, widens source fan-out to the whole
    /// document and starts the loop on the next frame.
    pub preview: bool,
    /// Whether the host supports clip paths. A disabled engine is inert.
    pub enabled: bool,
}

impl EngineConfig {
    /// Configuration for an exported document.
    #[must_use]
    pub const fn runtime() -> Self {
        Self {
            pacing: Pacing::Uncapped,
            preview: false,
            enabled: true,
        }
    }

    /// Configuration for the authoring tool's live preview.
    #[must_use]
    pub const fn preview() -> Self {
        Self {
            pacing: Pacing::Uncapped,
            preview: true,
            enabled: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::runtime()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn fill_rule_parsing() {
        assert_eq!(FillRule::parse("evenodd"), Some(FillRule::EvenOdd));
        assert_eq!(FillRule::parse(" NonZero "), Some(FillRule::NonZero));
        assert_eq!(FillRule::parse("even-odd"), None);
        assert_eq!(FillRule::parse(""), None);
    }

    #[test]
    fn clip_style_falls_back_to_url() {
        assert_eq!(ClipStyle::parse(None), ClipStyle::UrlReference);
        assert_eq!(ClipStyle::parse(Some("mask")), ClipStyle::UrlReference);
    }

    #[test]
    fn frame_rate_bounds() {
        assert_eq!(FrameRate::new(1).map(FrameRate::get), Ok(1));
        assert_eq!(FrameRate::new(59).map(FrameRate::get), Ok(59));
        assert_eq!(FrameRate::new(0), Err(FrameRateError::NotPositive(0)));
        assert_eq!(FrameRate::new(-5), Err(FrameRateError::NotPositive(-5)));
        assert_eq!(FrameRate::new(60), Err(FrameRateError::TooHigh(60)));
        assert_eq!(
            FrameRateError::TooHigh(60).to_string(),
            "frame rate must be below 60 (got 60)"
        );
    }

    #[test]
    fn pacing_from_fps() {
        assert_eq!(Pacing::from_fps(0), Pacing::Uncapped);
        assert_eq!(Pacing::from_fps(60), Pacing::Uncapped);
        assert_eq!(Pacing::from_fps(120), Pacing::Uncapped);
        let Pacing::Fixed(rate) = Pacing::from_fps(30) else {
            panic!("30 fps should be capped");
        };
        assert_eq!(rate.interval(), Duration(33_333));
    }
}
