//! Address to geometry resolution.
//!
//! A free-text address is geocoded to a center point, and where possible to a
//! building outline. Outlines come either inline from the geocoder or from a
//! dedicated outline service queried around the resolved center.

pub mod config;
pub mod error;
pub mod memory;
pub mod nominatim;
pub mod outline;
pub mod overpass;
pub mod provider;
pub mod resolver;

pub use config::*;
pub use error::*;
pub use memory::*;
pub use nominatim::*;
pub use outline::*;
pub use overpass::*;
pub use provider::*;
pub use resolver::*;
