//! Great-circle distance and nearest-franchise selection.
//!
//! Coordinates and distances are `f64`; this is the only module that opts
//! into float arithmetic.

#![allow(clippy::float_arithmetic)]

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both coordinates are within their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// An active franchise as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FranchiseLocation {
    /// Franchise id.
    pub id: Uuid,
    /// Store location.
    pub location: GeoPoint,
    /// Delivery radius in kilometres.
    pub delivery_radius_km: f64,
}

/// Picks the closest franchise whose delivery radius covers `customer`.
///
/// Returns the franchise and its distance, or `None` when nobody delivers there.
#[must_use]
pub fn select_nearest_franchise(
    customer: GeoPoint,
    franchises: &[FranchiseLocation],
) -> Option<(FranchiseLocation, f64)> {
    franchises
        .iter()
        .map(|franchise| (*franchise, haversine_km(customer, franchise.location)))
        .filter(|(franchise, distance)| *distance <= franchise.delivery_radius_km)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}
