//! Endpoint-specific API implementations
//!
//! | Module | Service | Description |
//! |--------|---------|-------------|
//! | `sms` | SMS relay (`POST /send-sms`) | Outbound reminder text messages |
//! | `geocoding` | Nominatim (`GET /search`) | Place name to coordinates |

pub mod geocoding;
pub mod sms;

pub use geocoding::{GeocodeMatch, GeocodingApi};
pub use sms::{SmsApi, SmsReceipt};
