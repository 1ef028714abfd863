// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local geometry of a node: vertices for rendering and points for collision and bounds.

use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::TAU;

use kurbo::{Point, Rect, Size};

use crate::error::{Error, Result};
use crate::types::Color;

/// Number of segments used to approximate a circle.
const CIRCLE_SEGMENTS: u16 = 32;

/// A single render vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    /// Position in the x/y plane.
    pub position: Point,
    /// Depth, passed through transforms unchanged.
    pub z: f64,
    /// Texture coordinate in `[0, 1]²` before sprite remapping.
    pub uv: Point,
    /// Per-vertex color.
    pub color: Color,
}

impl Vertex {
    /// White vertex at `position` with texture coordinate `uv`.
    pub fn new(position: Point, uv: Point) -> Self {
        Self {
            position,
            z: 0.0,
            uv,
            color: Color::WHITE,
        }
    }
}

/// Kind of geometry a [`Shape`] was built from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShapeKind {
    /// Line segment between two points.
    Segment,
    /// Axis-aligned box centered on the origin.
    Box,
    /// Circle approximated by a regular polygon.
    Circle,
    /// Convex polygon.
    Polygon,
    /// Caller-supplied vertices and indices.
    Freeform,
}

/// Local geometry of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    points: Vec<Point>,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    vertices_bbox: Rect,
}

impl Shape {
    /// Segment from `a` to `b`.
    pub fn segment(a: Point, b: Point) -> Self {
        let vertices = vec![
            Vertex::new(a, Point::new(0.0, 0.0)),
            Vertex::new(b, Point::new(1.0, 1.0)),
        ];
        Self::build(ShapeKind::Segment, vec![a, b], vertices, vec![0, 1])
    }

    /// Box of the given size centered on the origin.
    pub fn rect(size: Size) -> Self {
        let (hw, hh) = (size.width * 0.5, size.height * 0.5);
        let points = vec![
            Point::new(-hw, -hh),
            Point::new(hw, -hh),
            Point::new(hw, hh),
            Point::new(-hw, hh),
        ];
        let uvs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let vertices = points
            .iter()
            .zip(uvs)
            .map(|(&p, uv)| Vertex::new(p, uv.into()))
            .collect();
        Self::build(ShapeKind::Box, points, vertices, vec![0, 1, 2, 0, 2, 3])
    }

    /// Circle of `radius` around `center`.
    pub fn circle(center: Point, radius: f64) -> Self {
        let points: Vec<Point> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let angle = TAU * f64::from(i) / f64::from(CIRCLE_SEGMENTS);
                center + radius * kurbo::Vec2::from_angle(angle)
            })
            .collect();
        Self::fan(ShapeKind::Circle, center, points)
    }

    /// Convex polygon through `points`, triangulated as a fan.
    ///
    /// Fails with [`Error::InvalidOperation`] for fewer than three points.
    pub fn polygon(points: Vec<Point>) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::InvalidOperation(
                "a polygon needs at least three points",
            ));
        }
        if points.len() >= usize::from(u16::MAX) {
            return Err(Error::InvalidOperation("polygon has too many points"));
        }
        let sum = points
            .iter()
            .fold(kurbo::Vec2::ZERO, |acc, p| acc + p.to_vec2());
        let centroid = (sum / points.len() as f64).to_point();
        Ok(Self::fan(ShapeKind::Polygon, centroid, points))
    }

    /// Arbitrary geometry. Collision and bounds use the vertex positions.
    pub fn freeform(indices: Vec<u16>, vertices: Vec<Vertex>) -> Self {
        let points = vertices.iter().map(|v| v.position).collect();
        Self::build(ShapeKind::Freeform, points, vertices, indices)
    }

    /// What this shape was built from.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Outline points, used for collision and bounding boxes.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Render vertices in local space.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Triangle (or line) indices into [`Shape::vertices`].
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Bounding box of the vertex positions.
    pub fn vertices_bbox(&self) -> Rect {
        self.vertices_bbox
    }

    fn fan(kind: ShapeKind, center: Point, points: Vec<Point>) -> Self {
        let bbox = bounding_rect(&points);
        let uv_of = |p: Point| {
            let u = if bbox.width() > 0.0 { (p.x - bbox.x0) / bbox.width() } else { 0.0 };
            let v = if bbox.height() > 0.0 { (p.y - bbox.y0) / bbox.height() } else { 0.0 };
            Point::new(u, v)
        };
        let mut vertices = Vec::with_capacity(points.len() + 1);
        vertices.push(Vertex::new(center, uv_of(center)));
        vertices.extend(points.iter().map(|&p| Vertex::new(p, uv_of(p))));

        #[allow(
            clippy::cast_possible_truncation,
            reason = "callers cap the outline below u16::MAX points."
        )]
        let outline = points.len() as u16;
        let mut indices = Vec::with_capacity(usize::from(outline) * 3);
        for i in 1..=outline {
            let next = if i == outline { 1 } else { i + 1 };
            indices.extend_from_slice(&[0, i, next]);
        }
        Self::build(kind, points, vertices, indices)
    }

    fn build(
        kind: ShapeKind,
        points: Vec<Point>,
        vertices: Vec<Vertex>,
        indices: Vec<u16>,
    ) -> Self {
        let positions: Vec<Point> = vertices.iter().map(|v| v.position).collect();
        Self {
            kind,
            points,
            vertices_bbox: bounding_rect(&positions),
            vertices,
            indices,
        }
    }
}

/// Smallest rectangle containing all `points`, or [`Rect::ZERO`] when empty.
pub(crate) fn bounding_rect(points: &[Point]) -> Rect {
    let mut it = points.iter().copied();
    let Some(first) = it.next() else {
        return Rect::ZERO;
    };
    it.fold(Rect::from_points(first, first), |acc, p| acc.union_pt(p))
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn rect_is_centered_on_origin() {
        let shape = Shape::rect(Size::new(4.0, 2.0));
        assert_eq!(shape.kind(), ShapeKind::Box);
        assert_eq!(shape.vertices_bbox(), Rect::new(-2.0, -1.0, 2.0, 1.0));
        assert_eq!(shape.indices().len(), 6);
        assert_eq!(shape.vertices()[2].uv, Point::new(1.0, 1.0));
    }

    #[test]
    fn polygon_needs_three_points() {
        let err = Shape::polygon(vec![Point::ZERO, Point::new(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)), "got {err:?}");
    }

    #[test]
    fn polygon_is_fanned_around_its_centroid() {
        let shape = Shape::polygon(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ])
        .unwrap();
        assert_eq!(shape.vertices()[0].position, Point::new(1.0, 1.0));
        assert_eq!(shape.vertices()[0].uv, Point::new(0.5, 0.5));
        assert_eq!(shape.indices().len(), 12);
        assert_eq!(shape.points().len(), 4);
    }

    #[test]
    fn circle_bounds_cover_the_radius() {
        let shape = Shape::circle(Point::new(1.0, 1.0), 2.0);
        assert_eq!(shape.kind(), ShapeKind::Circle);
        let bbox = shape.vertices_bbox();
        assert!((bbox.x0 + 1.0).abs() < 1e-9, "x0 = {}", bbox.x0);
        assert!((bbox.x1 - 3.0).abs() < 1e-9, "x1 = {}", bbox.x1);
    }

    #[test]
    fn empty_freeform_has_zero_bounds() {
        let shape = Shape::freeform(Vec::new(), Vec::new());
        assert_eq!(shape.vertices_bbox(), Rect::ZERO);
        assert!(shape.points().is_empty(), "no vertices were given");
    }
}
