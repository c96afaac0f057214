// Copyright (C) 2024 GLStudios
// SPDX-License-Identifier: LGPL-2.1-only

use glam::Vec3;

use super::*;

fn unit_box() -> BoundingBox {
    BoundingBox::new(Vec3::ZERO, Vec3::ONE)
}

// ============================================================================
// Construction & validity
// ============================================================================

#[test]
fn test_degenerate_boxes_are_valid() {
    let flat = BoundingBox::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
    let point = BoundingBox::new(Vec3::ONE, Vec3::ONE);

    assert!(flat.is_valid());
    assert!(point.is_valid());
    assert_eq!(point.surface_area(), 0.0);
}

#[test]
fn test_inverted_or_nan_boxes_are_invalid() {
    let inverted = BoundingBox::new(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE);
    let nan = BoundingBox::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ONE);

    assert!(!inverted.is_valid());
    assert!(!nan.is_valid());
    assert!(!BoundingBox::EMPTY.is_valid());
}

#[test]
fn test_from_points() {
    let bounds = BoundingBox::from_points([
        Vec3::new(1.0, -2.0, 3.0),
        Vec3::new(-1.0, 2.0, 0.0),
        Vec3::new(0.0, 0.0, 5.0),
    ])
    .expect("points given");

    assert_eq!(bounds.min(), Vec3::new(-1.0, -2.0, 0.0));
    assert_eq!(bounds.max(), Vec3::new(1.0, 2.0, 5.0));
    assert!(BoundingBox::from_points(std::iter::empty()).is_none());
}

// ============================================================================
// Set operations
// ============================================================================

#[test]
fn test_union_contains_both() {
    let a = unit_box();
    let b = BoundingBox::new(Vec3::new(2.0, -1.0, 0.5), Vec3::new(3.0, 0.5, 0.75));
    let union = a.union(&b);

    assert!(union.contains(&a));
    assert!(union.contains(&b));
    assert_eq!(union.min(), Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(union.max(), Vec3::new(3.0, 1.0, 1.0));
}

#[test]
fn test_contains_shared_faces() {
    let outer = unit_box();
    let inner = BoundingBox::new(Vec3::new(0.0, 0.25, 0.25), Vec3::new(1.0, 0.75, 0.75));
    let poking = BoundingBox::new(Vec3::splat(0.5), Vec3::splat(1.5));

    assert!(outer.contains(&outer));
    assert!(outer.contains(&inner));
    assert!(!outer.contains(&poking));
    assert!(!inner.contains(&outer));
}

#[test]
fn test_overlaps_counts_touching() {
    let a = unit_box();
    let touching = BoundingBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
    let apart = BoundingBox::new(Vec3::new(1.01, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

    assert!(a.overlaps(&touching));
    assert!(touching.overlaps(&a));
    assert!(!a.overlaps(&apart));
}

#[test]
fn test_expanded_and_swept() {
    let fat = unit_box().expanded(0.5);
    assert_eq!(fat.min(), Vec3::splat(-0.5));
    assert_eq!(fat.max(), Vec3::splat(1.5));

    let swept = unit_box().swept(Vec3::new(2.0, -3.0, 0.0));
    assert_eq!(swept.min(), Vec3::new(0.0, -3.0, 0.0));
    assert_eq!(swept.max(), Vec3::new(3.0, 1.0, 1.0));
}

#[test]
fn test_surface_area() {
    let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));

    assert_eq!(bounds.half_surface_area(), 11.0);
    assert_eq!(bounds.surface_area(), 22.0);
}

// ============================================================================
// Ray slab test
// ============================================================================

#[test]
fn test_ray_hits_box_ahead() {
    let ray = Ray::new(Vec3::new(0.5, 0.5, -4.0), Vec3::Z);

    assert_eq!(unit_box().intersects(&ray), Some(4.0));
}

#[test]
fn test_ray_misses_box_behind() {
    let ray = Ray::new(Vec3::new(0.5, 0.5, -4.0), Vec3::NEG_Z);

    assert_eq!(unit_box().intersects(&ray), None);
}

#[test]
fn test_ray_from_inside_hits_at_zero() {
    let ray = Ray::new(Vec3::splat(0.5), Vec3::new(1.0, 2.0, -0.5));

    assert_eq!(unit_box().intersects(&ray), Some(0.0));
}

#[test]
fn test_axis_parallel_ray_outside_slab_misses() {
    let ray = Ray::new(Vec3::new(2.0, 0.5, -4.0), Vec3::Z);

    assert_eq!(unit_box().intersects(&ray), None);
}

#[test]
fn test_ray_grazing_face_hits() {
    // Direction has zero x and the origin sits on the x = 1 face
    let ray = Ray::new(Vec3::new(1.0, 0.5, -4.0), Vec3::Z);

    assert!(unit_box().intersects(&ray).is_some());
}

#[test]
fn test_segment_stops_short() {
    let short = Ray::segment(Vec3::new(0.5, 0.5, -4.0), Vec3::new(0.5, 0.5, -1.0));
    let long = Ray::segment(Vec3::new(0.5, 0.5, -4.0), Vec3::new(0.5, 0.5, 0.5));

    assert_eq!(unit_box().intersects(&short), None);
    assert!(unit_box().intersects(&long).is_some());
}

#[test]
fn test_ray_hits_flat_box() {
    let flat = BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
    let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);

    assert_eq!(flat.intersects(&ray), Some(5.0));
}

// ============================================================================
// Plane classification
// ============================================================================

#[test]
fn test_classify_plane() {
    // Inside is x >= 0.5
    let plane = Plane::new(Vec3::X, -0.5);

    let right = BoundingBox::new(Vec3::new(0.6, 0.0, 0.0), Vec3::ONE);
    let left = BoundingBox::new(Vec3::ZERO, Vec3::new(0.4, 1.0, 1.0));

    assert_eq!(right.classify_plane(&plane), PlaneSide::Inside);
    assert_eq!(left.classify_plane(&plane), PlaneSide::Outside);
    assert_eq!(unit_box().classify_plane(&plane), PlaneSide::Straddling);
}

#[test]
fn test_classify_plane_touching_is_inside() {
    let plane = Plane::new(Vec3::NEG_Y, 1.0);

    assert_eq!(unit_box().classify_plane(&plane), PlaneSide::Inside);
}
