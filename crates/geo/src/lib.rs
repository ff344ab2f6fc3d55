//! pawtrack geo - distance and nearest named place matching.
//!
//! Both operations are pure functions over a snapshot of named places, so
//! they are reentrant and need no locking.
//!
//! # Example
//!
//! ```rust
//! use pawtrack_geo::{nearest_match, Coordinate, Place};
//!
//! struct Spot(&'static str, Coordinate, f64);
//!
//! impl Place for Spot {
//!     fn coordinate(&self) -> Coordinate {
//!         self.1
//!     }
//!     fn radius_meters(&self) -> f64 {
//!         self.2
//!     }
//! }
//!
//! let places = [Spot("home", Coordinate::new(52.5200, 13.4050), 50.0)];
//! let here = Coordinate::new(52.5201, 13.4050);
//! let found = nearest_match(here, &places).unwrap();
//! assert_eq!(found.place.0, "home");
//! assert!(found.distance < 50.0);
//! ```

pub mod coordinate;
pub mod matcher;

pub use coordinate::{haversine_distance, Coordinate, CoordinateError, EARTH_RADIUS_METERS};
pub use matcher::{nearest_match, Match, Place};
