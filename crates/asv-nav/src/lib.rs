pub mod geodesy;
pub mod heading;
pub mod planner;
pub mod telemetry;

pub use asv_proto::GeoPoint;
