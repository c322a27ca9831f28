//! Conversions between the f64 feature surface and Rapier's f32 storage.

use nalgebra::{Isometry3, Point3, Vector3};

pub fn vector_to_f64(v: &Vector3<f32>) -> Vector3<f64> {
    v.cast::<f64>()
}

pub fn vector_to_f32(v: &Vector3<f64>) -> Vector3<f32> {
    v.cast::<f32>()
}

pub fn point_to_f64(p: &Point3<f32>) -> Point3<f64> {
    p.cast::<f64>()
}

pub fn isometry_to_f64(iso: &Isometry3<f32>) -> Isometry3<f64> {
    nalgebra::convert(*iso)
}
