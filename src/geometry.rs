use geo_clipper::Clipper;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};

use crate::error::{EvalError, Result};

/// Added to the union area so two degenerate polygons never divide by zero.
pub const IOU_EPS: f64 = 1e-6;

/// Largest scaled coordinate Clipper accepts (its `hiRange`).
const CLIPPER_MAX_COORD: f64 = 4.6e18;

/// Rings at or below this area are treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

/// Build a closed polygon from an ordered point list.
///
/// The ring may be given open or already closed. It is rejected when it has
/// fewer than three distinct vertices, a non-finite coordinate, a coordinate
/// that overflows Clipper's integer range once scaled by `factor`, zero area,
/// or crossing edges.
pub fn build_polygon(points: &[Coord<f64>], factor: f64) -> Result<Polygon<f64>> {
    if let Some(bad) = points.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(EvalError::Geometry(format!(
            "non-finite vertex ({}, {})",
            bad.x, bad.y
        )));
    }
    let limit = CLIPPER_MAX_COORD / factor;
    if let Some(bad) = points.iter().find(|c| c.x.abs() >= limit || c.y.abs() >= limit) {
        return Err(EvalError::Geometry(format!(
            "vertex ({}, {}) is out of range at scale {}",
            bad.x, bad.y, factor
        )));
    }

    // Repeated consecutive vertices and an explicit closing vertex are dropped.
    let mut open = points.to_vec();
    open.dedup();
    if open.len() > 1 && open.first() == open.last() {
        open.pop();
    }

    if open.len() < 3 {
        return Err(EvalError::Geometry(format!(
            "polygon needs at least 3 vertices, got {}",
            open.len()
        )));
    }

    let mut ring = open.clone();
    ring.push(open[0]);
    let ring = LineString::from(ring);

    let enclosed = ring_area(&ring);
    if open.iter().all(|&c| orientation(open[0], open[1], c) == 0.0) {
        return Err(EvalError::Geometry(format!(
            "degenerate polygon with area {}",
            enclosed
        )));
    }
    // Bowtie lobes cancel in the shoelace sum.
    if let Some((i, j)) = first_crossing(&open) {
        return Err(EvalError::Geometry(format!(
            "self-intersecting polygon: edges {} and {} cross",
            i, j
        )));
    }
    if !(enclosed > DEGENERATE_AREA) {
        return Err(EvalError::Geometry(format!(
            "degenerate polygon with area {}",
            enclosed
        )));
    }

    Ok(Polygon::new(ring, vec![]))
}

fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// `c` lies within the bounding box of segment `ab` (collinearity checked by the caller).
fn within_segment(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> bool {
    c.x >= a.x.min(b.x) && c.x <= a.x.max(b.x) && c.y >= a.y.min(b.y) && c.y <= a.y.max(b.y)
}

fn segments_touch(p1: Coord<f64>, p2: Coord<f64>, p3: Coord<f64>, p4: Coord<f64>) -> bool {
    let d1 = orientation(p3, p4, p1);
    let d2 = orientation(p3, p4, p2);
    let d3 = orientation(p1, p2, p3);
    let d4 = orientation(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && within_segment(p3, p4, p1))
        || (d2 == 0.0 && within_segment(p3, p4, p2))
        || (d3 == 0.0 && within_segment(p1, p2, p3))
        || (d4 == 0.0 && within_segment(p1, p2, p4))
}

/// First pair of non-adjacent edges of the open ring that touch or cross.
fn first_crossing(open: &[Coord<f64>]) -> Option<(usize, usize)> {
    let n = open.len();
    for i in 0..n {
        for j in (i + 2)..n {
            // Edge n-1 shares vertex 0 with edge 0.
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments_touch(open[i], open[(i + 1) % n], open[j], open[(j + 1) % n]) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Unsigned shoelace area of a single ring.
fn ring_area(ring: &LineString<f64>) -> f64 {
    let coords = &ring.0;
    if coords.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..coords.len() {
        let j = (i + 1) % coords.len();
        area += coords[i].x * coords[j].y - coords[j].x * coords[i].y;
    }
    (area * 0.5).abs()
}

pub fn area(polygon: &Polygon<f64>) -> f64 {
    let holes: f64 = polygon.interiors().iter().map(ring_area).sum();
    (ring_area(polygon.exterior()) - holes).max(0.0)
}

fn multi_area(polygons: &MultiPolygon<f64>) -> f64 {
    polygons.0.iter().map(area).sum()
}

/// Overlapping region of two polygons; empty when they are disjoint.
pub fn intersect(a: &Polygon<f64>, b: &Polygon<f64>, factor: f64) -> MultiPolygon<f64> {
    a.intersection(b, factor)
}

pub fn intersection_area(a: &Polygon<f64>, b: &Polygon<f64>, factor: f64) -> f64 {
    let overlap = intersect(a, b, factor);
    if overlap.0.is_empty() {
        0.0
    } else {
        multi_area(&overlap)
    }
}

pub fn union_area(a: &Polygon<f64>, b: &Polygon<f64>, factor: f64) -> f64 {
    area(a) + area(b) - intersection_area(a, b, factor)
}

/// Intersection over union, with `IOU_EPS` guarding the denominator.
pub fn iou(a: &Polygon<f64>, b: &Polygon<f64>, factor: f64) -> f64 {
    let inter = intersection_area(a, b, factor);
    let union = area(a) + area(b) - inter;
    inter / (union + IOU_EPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTOR: f64 = 1e4;

    fn coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    fn square(x: f64, y: f64, side: f64) -> Polygon<f64> {
        let ring = coords(&[(x, y), (x + side, y), (x + side, y + side), (x, y + side)]);
        build_polygon(&ring, FACTOR).unwrap()
    }

    #[test]
    fn test_area_ignores_winding() {
        let cw = build_polygon(&coords(&[(0.0, 0.0), (0.0, 2.0), (3.0, 2.0), (3.0, 0.0)]), FACTOR)
            .unwrap();
        assert!((area(&cw) - 6.0).abs() < 1e-12);
        assert!((area(&square(0.0, 0.0, 2.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_closed_input_ring_is_accepted() {
        let closed = coords(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (0.0, 0.0)]);
        let poly = build_polygon(&closed, FACTOR).unwrap();
        assert_eq!(poly.exterior().0.len(), 4);
        assert!((area(&poly) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_concave_ring_is_accepted() {
        let notched = coords(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (2.0, 1.0), (0.0, 4.0)]);
        let poly = build_polygon(&notched, FACTOR).unwrap();
        assert!((area(&poly) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_malformed_polygons() {
        let two = coords(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(matches!(build_polygon(&two, FACTOR), Err(EvalError::Geometry(_))));

        let nan = coords(&[(0.0, 0.0), (f64::NAN, 1.0), (1.0, 0.0)]);
        assert!(matches!(build_polygon(&nan, FACTOR), Err(EvalError::Geometry(_))));
    }

    #[test]
    fn test_rejects_self_intersecting_ring() {
        let bowtie = coords(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        match build_polygon(&bowtie, FACTOR) {
            Err(EvalError::Geometry(msg)) => assert!(msg.contains("self-intersecting")),
            other => panic!("expected geometry error, got {:?}", other),
        }

        // Unequal lobes leave a positive shoelace area.
        let lopsided = coords(&[(0.0, 0.0), (4.0, 4.0), (4.0, 0.0), (0.0, 1.0)]);
        assert!(matches!(build_polygon(&lopsided, FACTOR), Err(EvalError::Geometry(_))));

        // Touches itself at a vertex.
        let pinched = coords(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (2.0, 2.0),
            (4.0, 4.0),
            (0.0, 4.0),
            (2.0, 2.0),
        ]);
        assert!(matches!(build_polygon(&pinched, FACTOR), Err(EvalError::Geometry(_))));
    }

    #[test]
    fn test_rejects_zero_area_rings() {
        let collinear = coords(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        match build_polygon(&collinear, FACTOR) {
            Err(EvalError::Geometry(msg)) => assert!(msg.contains("degenerate")),
            other => panic!("expected geometry error, got {:?}", other),
        }

        let repeated = coords(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert!(matches!(build_polygon(&repeated, FACTOR), Err(EvalError::Geometry(_))));
    }

    #[test]
    fn test_duplicate_vertices_are_collapsed() {
        let ring = coords(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        let poly = build_polygon(&ring, FACTOR).unwrap();
        assert_eq!(poly.exterior().0.len(), 5);
        assert!((area(&poly) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_coordinates_beyond_clipper_range() {
        let huge = coords(&[(0.0, 0.0), (1e15, 0.0), (1e15, 1e15), (0.0, 1e15)]);
        match build_polygon(&huge, FACTOR) {
            Err(EvalError::Geometry(msg)) => assert!(msg.contains("out of range")),
            other => panic!("expected geometry error, got {:?}", other),
        }
        // The same ring fits at unit scale.
        assert!(build_polygon(&huge, 1.0).is_ok());
    }

    #[test]
    fn test_disjoint_intersection_is_zero() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(5.0, 5.0, 1.0);
        assert!(intersect(&a, &b, FACTOR).0.is_empty());
        assert_eq!(intersection_area(&a, &b, FACTOR), 0.0);
        assert!((union_area(&a, &b, FACTOR) - 2.0).abs() < 1e-9);
        assert_eq!(iou(&a, &b, FACTOR), 0.0);
    }

    #[test]
    fn test_half_overlap() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 0.0, 2.0);
        assert!((intersection_area(&a, &b, FACTOR) - 2.0).abs() < 1e-6);
        assert!((union_area(&a, &b, FACTOR) - 6.0).abs() < 1e-6);
        assert!((iou(&a, &b, FACTOR) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_identical_polygons() {
        let a = square(10.0, 10.0, 1.0);
        let v = iou(&a, &a, FACTOR);
        assert!(v > 0.999 && v < 1.0);
    }
}
