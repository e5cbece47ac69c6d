pub mod geo;
pub mod goal;
pub mod status;

pub use geo::GeoPoint;
