//! Temporal literal handling for typed SQL engines
//!
//! Parses DATE, TIME and TIMESTAMP literals against configurable patterns in
//! an explicit timezone, encodes the results into order-preserving byte
//! layouts, and rounds instants to calendar granularities.
//!
//! ```
//! use octofhir_temporal::{TemporalConfig, TemporalContext};
//!
//! let ctx = TemporalContext::new(TemporalConfig::default())?;
//! let value = ctx.parse_timestamp("1970-01-01 00:00:10.5")?;
//! assert_eq!(value.millis(), 10_000);
//! assert_eq!(value.nanos(), 500_000_000);
//! # Ok::<(), octofhir_temporal::TemporalError>(())
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod expression;
pub mod format;
pub mod rounding;
pub mod timezone;
pub mod types;
pub mod value;

// Re-export main types
pub use codec::TemporalCodec;
pub use config::TemporalConfig;
pub use context::TemporalContext;
pub use error::{TemporalError, TemporalResult};
pub use expression::{DateScalarFunction, RoundingExpression};
pub use format::FormatParser;
pub use rounding::{Granularity, RoundingMode, round_instant, truncate};
pub use timezone::Timezone;
pub use types::{LogicalType, SortOrder, TemporalKind};
pub use value::ParsedTemporal;
