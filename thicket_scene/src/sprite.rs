// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprites: a texture reference plus the frame of it that is displayed.

use kurbo::{Point, Rect, Size};

/// Opaque renderer texture handle. Copied into render data, never interpreted.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct TextureHandle(pub u32);

/// A texture known to the renderer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Texture {
    /// Renderer handle.
    pub handle: TextureHandle,
    /// Dimensions in pixels.
    pub size: Size,
}

/// Displayed region of a texture. The default sprite has no texture.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Sprite {
    texture: Option<Texture>,
    frame: Rect,
}

impl Sprite {
    /// Sprite showing the whole texture.
    pub fn new(texture: Texture) -> Self {
        Self {
            texture: Some(texture),
            frame: Rect::from_origin_size(Point::ZERO, texture.size),
        }
    }

    /// Restrict the sprite to `frame`, in texture pixels.
    pub fn crop(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    /// Whether a texture is bound.
    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Bound texture, if any.
    pub fn texture(&self) -> Option<Texture> {
        self.texture
    }

    /// Frame in texture pixels.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Displayed size in pixels.
    pub fn size(&self) -> Size {
        self.frame.size()
    }

    /// Frame as normalized texture coordinates `(top_left, bottom_right)`.
    pub fn display_rect(&self) -> Option<(Point, Point)> {
        let texture = self.texture?;
        let (w, h) = (texture.size.width, texture.size.height);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        Some((
            Point::new(self.frame.x0 / w, self.frame.y0 / h),
            Point::new(self.frame.x1 / w, self.frame.y1 / h),
        ))
    }

    /// Map a shape texture coordinate into the displayed frame.
    pub(crate) fn remap_uv(top_left: Point, bottom_right: Point, uv: Point) -> Point {
        Point::new(
            top_left.x + (bottom_right.x - top_left.x) * uv.x,
            top_left.y + (bottom_right.y - top_left.y) * uv.y,
        )
    }
}
