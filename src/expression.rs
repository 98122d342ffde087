//! Temporal scalar functions exposed to the expression framework
//!
//! The enclosing engine owns expression trees and their serialization. It
//! only needs the narrow [`DateScalarFunction`] surface: what codec the input
//! is read with, and how to turn one encoded input into one encoded output.

use crate::codec::TemporalCodec;
use crate::context::TemporalContext;
use crate::error::TemporalResult;
use crate::rounding::{Granularity, RoundingMode, round_instant};
use crate::timezone::Timezone;
use crate::types::{LogicalType, SortOrder};
use crate::value::ParsedTemporal;

/// Scalar function over one encoded temporal input
pub trait DateScalarFunction: Send + Sync {
    /// Display name, e.g. `FLOOR(MONTH)`
    fn name(&self) -> &str;

    /// Codec the input column is decoded with
    fn input_codec(&self) -> &TemporalCodec;

    /// Type of the encoded result
    fn return_type(&self) -> LogicalType;

    /// Evaluate against one encoded input value
    fn evaluate(&self, input: &[u8]) -> TemporalResult<Vec<u8>>;

    /// Check if this function is pure (deterministic with no side effects)
    fn is_pure(&self) -> bool {
        true
    }
}

/// Floor or ceiling of a temporal value to a calendar granularity
///
/// All derived state (the input codec, the display name) is computed by the
/// constructor; a built expression is immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundingExpression {
    name: String,
    granularity: Granularity,
    mode: RoundingMode,
    input_codec: TemporalCodec,
    zone: Timezone,
    sort_order: SortOrder,
}

impl RoundingExpression {
    /// Round values of `input_type` to `granularity`, computing periods in `zone`
    pub fn new(
        input_type: LogicalType,
        granularity: Granularity,
        mode: RoundingMode,
        zone: Timezone,
    ) -> TemporalResult<Self> {
        let input_codec = TemporalCodec::for_type(input_type)?;
        Ok(Self {
            name: format!("{mode}({granularity})"),
            granularity,
            mode,
            input_codec,
            zone,
            sort_order: SortOrder::Asc,
        })
    }

    /// Floor to `granularity` in `zone`
    pub fn floor(
        input_type: LogicalType,
        granularity: Granularity,
        zone: Timezone,
    ) -> TemporalResult<Self> {
        Self::new(input_type, granularity, RoundingMode::Floor, zone)
    }

    /// Round in the session's default zone
    pub fn from_context(
        context: &TemporalContext,
        input_type: LogicalType,
        granularity: Granularity,
        mode: RoundingMode,
    ) -> TemporalResult<Self> {
        Self::new(input_type, granularity, mode, *context.default_timezone())
    }

    /// Read and write encodings in `order`
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Granularity rounded to
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Rounding direction
    pub fn mode(&self) -> RoundingMode {
        self.mode
    }

    /// Zone calendar periods are computed in
    pub fn zone(&self) -> &Timezone {
        &self.zone
    }

    /// Round a decoded value to epoch millis
    pub fn round(&self, value: &ParsedTemporal) -> TemporalResult<i64> {
        round_instant(value, self.granularity, self.mode, &self.zone)
    }
}

impl DateScalarFunction for RoundingExpression {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_codec(&self) -> &TemporalCodec {
        &self.input_codec
    }

    fn return_type(&self) -> LogicalType {
        self.input_codec.logical_type()
    }

    fn evaluate(&self, input: &[u8]) -> TemporalResult<Vec<u8>> {
        let value = self.input_codec.decode_with_order(input, self.sort_order)?;
        let rounded = ParsedTemporal::from_millis(self.round(&value)?);
        self.input_codec.encode_with_order(&rounded, self.sort_order)
    }
}
