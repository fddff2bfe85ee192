//! Firefleet services - HTTP clients for routing and reverse geocoding
//!
//! Implements the core `RoutingService` and `Geocoder` traits against
//! OpenRouteService and Nominatim.

mod http;
pub mod nominatim;
pub mod ors;

pub use nominatim::{NominatimClient, DEFAULT_NOMINATIM_URL, DEFAULT_USER_AGENT};
pub use ors::{OrsClient, DEFAULT_ORS_URL};
