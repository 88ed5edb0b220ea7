//! CLI command implementations

pub mod check_rc;
pub mod index;
pub mod lifecycle_status;
pub mod patch;
pub mod prepare;
pub mod standardize;
pub mod unzip;
pub mod zip;
