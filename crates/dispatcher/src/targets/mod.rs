//! Target implementations

mod common;
mod influxdb;
mod legacy;
mod vendor_cloud;

pub use influxdb::{InfluxDbTarget, DEFAULT_INFLUXDB_INTERVAL};
pub use legacy::{LegacyHttpTarget, DEFAULT_LEGACY_INTERVAL};
pub use vendor_cloud::{VendorCloudTarget, DEFAULT_VENDOR_INTERVAL};
