// Copyright 2026 the Glaze Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion between logical units, device pixels and texture pixels.
//!
//! Logical coordinates stay continuous (`f64`); anything that allocates
//! pixels goes through [`Scale::scaled_ceil`] so allocations are integral and
//! never smaller than the logical area they back.

use core::fmt;

use kurbo::Size;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::error::{GraphicsError, Result};

/// A pixel width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Creates a pixel size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of pixels covered, or `None` if that overflows `usize`.
    #[inline]
    #[must_use]
    pub const fn checked_area(self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Whether either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A display scale factor.
///
/// The factor is always finite and strictly positive. A factor of `2.0`
/// means one logical unit covers two device pixels along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    factor: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self::ONE
    }
}

impl Scale {
    /// The identity scale.
    pub const ONE: Self = Self { factor: 1.0 };

    /// Creates a scale from a factor.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if `factor` is not finite or
    /// not strictly positive.
    pub fn new(factor: f64) -> Result<Self> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self { factor })
        } else {
            Err(GraphicsError::InvalidArgument(
                "scale factor must be finite and > 0",
            ))
        }
    }

    /// Returns the raw factor.
    #[inline]
    #[must_use]
    pub const fn factor(self) -> f64 {
        self.factor
    }

    /// Returns the scale that undoes this one.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidArgument`] if the reciprocal is not
    /// representable, as for subnormal factors.
    pub fn inverse(self) -> Result<Self> {
        Self::new(1.0 / self.factor)
    }

    /// Converts a logical length to (fractional) pixels.
    #[inline]
    #[must_use]
    pub fn to_pixels(self, logical: f64) -> f64 {
        logical * self.factor
    }

    /// Converts a pixel length to logical units.
    #[inline]
    #[must_use]
    pub fn to_logical(self, pixels: f64) -> f64 {
        pixels / self.factor
    }

    /// Returns `ceil(logical * factor)` as a pixel count.
    ///
    /// Negative and NaN inputs yield 0; values past `u32::MAX` saturate.
    #[inline]
    #[must_use]
    pub fn scaled_ceil(self, logical: f64) -> u32 {
        to_pixel_count(self.to_pixels(logical).ceil())
    }

    /// Returns `floor(logical * factor)` as a pixel count.
    ///
    /// Negative and NaN inputs yield 0; values past `u32::MAX` saturate.
    #[inline]
    #[must_use]
    pub fn scaled_floor(self, logical: f64) -> u32 {
        to_pixel_count(self.to_pixels(logical).floor())
    }

    /// Resolves the backing pixel size for a logical size.
    #[inline]
    #[must_use]
    pub fn pixel_size(self, logical: Size) -> PixelSize {
        PixelSize::new(
            self.scaled_ceil(logical.width),
            self.scaled_ceil(logical.height),
        )
    }

    /// Converts a pixel size back to logical units.
    #[inline]
    #[must_use]
    pub fn logical_size(self, pixels: PixelSize) -> Size {
        Size::new(
            self.to_logical(f64::from(pixels.width)),
            self.to_logical(f64::from(pixels.height)),
        )
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` saturates; the range is clamped first anyway"
)]
fn to_pixel_count(v: f64) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else if v >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        v as u32
    }
}
