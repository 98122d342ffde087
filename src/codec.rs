// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Order-preserving binary codecs for temporal types
//!
//! Layouts:
//!
//! - millisecond types: 8 bytes of big-endian epoch millis. Signed types flip
//!   the sign bit so negative values sort first; unsigned types refuse values
//!   before the epoch.
//! - timestamp types: the same 8 bytes followed by 4 bytes of big-endian
//!   nanoseconds within the millisecond (`0..1_000_000`).
//!
//! Comparing two encodings byte by byte gives the order of the instants.
//! [`SortOrder::Desc`] inverts every byte.

use crate::error::{TemporalError, TemporalResult};
use crate::types::{LogicalType, SortOrder};
use crate::value::{NANOS_PER_MILLI, ParsedTemporal};

const SIGN_BIT: u64 = 1 << 63;
const MILLIS_WIDTH: usize = 8;
const NANOS_WIDTH: usize = 4;

/// Codec for one temporal logical type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporalCodec {
    logical_type: LogicalType,
}

impl TemporalCodec {
    /// Codec for `logical_type`, refused for non-temporal types
    pub fn for_type(logical_type: LogicalType) -> TemporalResult<Self> {
        if !logical_type.is_temporal() {
            return Err(TemporalError::UnsupportedTemporalType { logical_type });
        }
        Ok(Self { logical_type })
    }

    /// Type this codec encodes
    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    /// Width of every encoding produced by this codec
    pub fn byte_size(&self) -> usize {
        if self.logical_type.has_nanos() {
            MILLIS_WIDTH + NANOS_WIDTH
        } else {
            MILLIS_WIDTH
        }
    }

    /// Reduce a value to the precision this codec stores
    pub fn truncate(&self, value: &ParsedTemporal) -> ParsedTemporal {
        if self.logical_type.has_nanos() {
            value.normalized()
        } else {
            value.truncated_to_millis()
        }
    }

    /// Encode in ascending order
    pub fn encode(&self, value: &ParsedTemporal) -> TemporalResult<Vec<u8>> {
        self.encode_with_order(value, SortOrder::Asc)
    }

    /// Encode with an explicit sort order
    pub fn encode_with_order(
        &self,
        value: &ParsedTemporal,
        order: SortOrder,
    ) -> TemporalResult<Vec<u8>> {
        let stored = self.truncate(value);
        let mut bytes = Vec::with_capacity(self.byte_size());
        bytes.extend_from_slice(&self.millis_bytes(stored.millis())?);
        if self.logical_type.has_nanos() {
            bytes.extend_from_slice(&(stored.nanos() as u32).to_be_bytes());
        }
        order.apply(&mut bytes);
        Ok(bytes)
    }

    /// Decode an ascending encoding
    pub fn decode(&self, bytes: &[u8]) -> TemporalResult<ParsedTemporal> {
        self.decode_with_order(bytes, SortOrder::Asc)
    }

    /// Decode an encoding written with `order`
    pub fn decode_with_order(
        &self,
        bytes: &[u8],
        order: SortOrder,
    ) -> TemporalResult<ParsedTemporal> {
        if bytes.len() != self.byte_size() {
            return Err(self.invalid(format!(
                "expected {} bytes, got {}",
                self.byte_size(),
                bytes.len()
            )));
        }

        let mut buf = [0u8; MILLIS_WIDTH + NANOS_WIDTH];
        let buf = &mut buf[..bytes.len()];
        buf.copy_from_slice(bytes);
        order.apply(buf);

        let (millis_part, nanos_part) = buf.split_at(MILLIS_WIDTH);
        let mut raw = [0u8; MILLIS_WIDTH];
        raw.copy_from_slice(millis_part);
        let millis = self.millis_from_bytes(u64::from_be_bytes(raw))?;

        let nanos = if nanos_part.is_empty() {
            0
        } else {
            let mut raw = [0u8; NANOS_WIDTH];
            raw.copy_from_slice(nanos_part);
            let nanos = u32::from_be_bytes(raw);
            if nanos >= NANOS_PER_MILLI as u32 {
                return Err(self.invalid(format!("sub-millisecond nanos {nanos} out of range")));
            }
            nanos as i32
        };

        ParsedTemporal::new(millis, nanos)
    }

    /// Encode whole epoch millis in ascending order
    pub fn encode_millis(&self, millis: i64) -> TemporalResult<Vec<u8>> {
        self.encode(&ParsedTemporal::from_millis(millis))
    }

    /// Decode an ascending encoding to whole epoch millis
    pub fn decode_millis(&self, bytes: &[u8]) -> TemporalResult<i64> {
        Ok(self.decode(bytes)?.epoch_millis())
    }

    fn millis_bytes(&self, millis: i64) -> TemporalResult<[u8; MILLIS_WIDTH]> {
        if self.logical_type.is_unsigned() {
            if millis < 0 {
                return Err(TemporalError::ValueOutOfRange {
                    logical_type: self.logical_type,
                    reason: format!("{millis} ms is before the epoch"),
                });
            }
            Ok((millis as u64).to_be_bytes())
        } else {
            Ok(((millis as u64) ^ SIGN_BIT).to_be_bytes())
        }
    }

    fn millis_from_bytes(&self, raw: u64) -> TemporalResult<i64> {
        if self.logical_type.is_unsigned() {
            i64::try_from(raw)
                .map_err(|_| self.invalid(format!("{raw} exceeds the largest millis value")))
        } else {
            Ok((raw ^ SIGN_BIT) as i64)
        }
    }

    fn invalid(&self, reason: String) -> TemporalError {
        TemporalError::InvalidEncoding {
            logical_type: self.logical_type,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(millis: i64, nanos: i32) -> ParsedTemporal {
        ParsedTemporal::new(millis, nanos).unwrap()
    }

    fn codec(logical_type: LogicalType) -> TemporalCodec {
        TemporalCodec::for_type(logical_type).unwrap()
    }

    #[test]
    fn test_non_temporal_types_are_refused() {
        assert_eq!(
            TemporalCodec::for_type(LogicalType::Integer),
            Err(TemporalError::UnsupportedTemporalType {
                logical_type: LogicalType::Integer
            })
        );
    }

    #[test]
    fn test_widths() {
        assert_eq!(codec(LogicalType::Date).byte_size(), 8);
        assert_eq!(codec(LogicalType::UnsignedTime).byte_size(), 8);
        assert_eq!(codec(LogicalType::Timestamp).byte_size(), 12);
    }

    #[test]
    fn test_timestamp_keeps_nanos() {
        let codec = codec(LogicalType::Timestamp);
        let original = value(10_000, 123_456_789);
        let bytes = codec.encode(&original).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.millis(), 10_123);
        assert_eq!(decoded.nanos(), 456_789);
    }

    #[test]
    fn test_date_truncates_to_millis() {
        let codec = codec(LogicalType::Date);
        let bytes = codec.encode(&value(10_000, 123_456_789)).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), ParsedTemporal::from_millis(10_123));
        assert_eq!(codec.decode_millis(&bytes), Ok(10_123));
    }

    #[test]
    fn test_decode_then_encode_is_idempotent() {
        let codec = codec(LogicalType::Timestamp);
        let bytes = codec.encode(&value(-5, 999_999_999)).unwrap();
        let again = codec.encode(&codec.decode(&bytes).unwrap()).unwrap();
        assert_eq!(bytes, again);
    }

    fn assert_order_and_round_trip(logical_type: LogicalType, values: &[ParsedTemporal]) {
        let codec = codec(logical_type);
        for v in values {
            let bytes = codec.encode(v).unwrap();
            assert_eq!(bytes.len(), codec.byte_size());
            assert_eq!(codec.decode(&bytes), Ok(codec.truncate(v)), "{logical_type}: {v:?}");
        }
        for pair in values.windows(2) {
            let (a, b) = (codec.truncate(&pair[0]), codec.truncate(&pair[1]));
            if a == b {
                continue;
            }
            assert!(
                codec.encode(&a).unwrap() < codec.encode(&b).unwrap(),
                "{logical_type}: {a:?} < {b:?}"
            );
        }
    }

    #[test]
    fn test_signed_encoding_preserves_order() {
        let values = [
            value(i64::MIN, 0),
            value(-86_400_000, 0),
            value(-1, 999_999),
            value(0, 0),
            value(0, 1),
            value(120_055, 60),
            value(120_100, 60),
            value(120_100, 61),
            value(i64::MAX - 1, 0),
        ];
        for logical_type in [LogicalType::Date, LogicalType::Time, LogicalType::Timestamp] {
            assert_order_and_round_trip(logical_type, &values);
        }
    }

    #[test]
    fn test_unsigned_encoding_preserves_order() {
        let values = [
            value(0, 0),
            value(0, 1),
            value(0, 999_999),
            value(1, 0),
            value(255, 0),
            value(256, 0),
            value(120_055, 60),
            value(120_100, 60),
            value(120_100, 61),
            value(86_400_000, 0),
            value(i64::MAX - 1, 0),
        ];
        for logical_type in [
            LogicalType::UnsignedDate,
            LogicalType::UnsignedTime,
            LogicalType::UnsignedTimestamp,
        ] {
            assert_order_and_round_trip(logical_type, &values);
        }

        // Only the timestamp codec tells sub-millisecond neighbours apart
        let timestamp = codec(LogicalType::UnsignedTimestamp);
        assert!(
            timestamp.encode(&value(120_100, 60)).unwrap()
                < timestamp.encode(&value(120_100, 61)).unwrap()
        );
        let date = codec(LogicalType::UnsignedDate);
        assert_eq!(
            date.encode(&value(120_100, 60)).unwrap(),
            date.encode(&value(120_100, 61)).unwrap()
        );
    }

    #[test]
    fn test_descending_reverses_order() {
        let codec = codec(LogicalType::Timestamp);
        let earlier = value(-1, 5);
        let later = value(7, 0);
        let a = codec.encode_with_order(&earlier, SortOrder::Desc).unwrap();
        let b = codec.encode_with_order(&later, SortOrder::Desc).unwrap();
        assert!(a > b);
        assert_eq!(codec.decode_with_order(&a, SortOrder::Desc), Ok(earlier));
    }

    #[test]
    fn test_unsigned_rejects_negative_millis() {
        let codec = codec(LogicalType::UnsignedTimestamp);
        assert!(matches!(
            codec.encode_millis(-1),
            Err(TemporalError::ValueOutOfRange { .. })
        ));
        let bytes = codec.encode(&value(42, 7)).unwrap();
        assert_eq!(&bytes[..8], &42u64.to_be_bytes());
        assert_eq!(codec.decode(&bytes), Ok(value(42, 7)));

        let corrupt = [0xff; 12];
        assert!(matches!(
            codec.decode(&corrupt),
            Err(TemporalError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let codec = codec(LogicalType::Timestamp);
        assert!(matches!(
            codec.decode(&[0u8; 8]),
            Err(TemporalError::InvalidEncoding { .. })
        ));

        let mut bytes = codec.encode_millis(0).unwrap();
        bytes[8..].copy_from_slice(&1_000_000u32.to_be_bytes());
        assert!(matches!(
            codec.decode(&bytes),
            Err(TemporalError::InvalidEncoding { .. })
        ));
    }
}
