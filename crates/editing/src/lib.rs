//! Interactive polygon editing for the admin map.
//!
//! [`GeometryEditSession`] owns the geometry of one form and arbitrates
//! between auto-resolution, click-to-add drawing and vertex dragging.
//! [`ResolutionScheduler`] debounces address input into resolution attempts,
//! and [`DrawMap`] ties both to a map surface.

pub mod controller;
pub mod scheduler;
pub mod session;
pub mod surface;
pub mod viewport;

pub use controller::*;
pub use scheduler::*;
pub use session::*;
pub use surface::*;
pub use viewport::*;
