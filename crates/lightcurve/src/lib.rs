//! Light Curve Input Handling
//!
//! Provides the flux series type, text parsing, best-effort numeric coercion
//! and minimum-length validation for incoming light curves.

pub mod coerce;
mod error;
mod parser;
mod series;
mod validator;

pub use error::InputError;
pub use parser::{decode_upload, parse_flux_text, parse_flux_text_report, ParsedText};
pub use series::{FluxSeries, MINUTES_PER_DAY};
pub use validator::{SeriesValidator, DEFAULT_MIN_POINTS};
