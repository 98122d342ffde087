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

//! Error types for temporal parsing, encoding and rounding

use crate::types::LogicalType;
use thiserror::Error;

/// Result type for temporal operations
pub type TemporalResult<T> = Result<T, TemporalError>;

/// Errors raised while parsing, encoding, decoding or rounding temporal values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemporalError {
    /// Timezone identifier could not be resolved
    #[error("Invalid timezone '{id}'")]
    InvalidTimezone {
        /// Identifier as supplied by the caller
        id: String,
    },

    /// A codec or parser was requested for a non-temporal type
    #[error("Type {logical_type} is not a temporal type")]
    UnsupportedTemporalType {
        /// Requested type
        logical_type: LogicalType,
    },

    /// Literal text does not match the expected grammar
    #[error("Malformed temporal literal '{literal}': {reason}")]
    MalformedTemporalLiteral {
        /// Offending literal
        literal: String,
        /// What did not match
        reason: String,
    },

    /// Fractional seconds have more than nine digits
    #[error("Fractional seconds of '{literal}' have {digits} digits, at most 9 are allowed")]
    FractionalSecondOverflow {
        /// Offending literal
        literal: String,
        /// Number of fractional digits found
        digits: usize,
    },

    /// Format pattern could not be compiled
    #[error("Invalid format pattern '{pattern}': {reason}")]
    InvalidFormatPattern {
        /// Offending pattern
        pattern: String,
        /// What is wrong with it
        reason: String,
    },

    /// Binary value is not a valid encoding for the type
    #[error("Invalid {logical_type} encoding: {reason}")]
    InvalidEncoding {
        /// Type whose codec rejected the bytes
        logical_type: LogicalType,
        /// What is wrong with the bytes
        reason: String,
    },

    /// Value cannot be represented by the type
    #[error("Value out of range for {logical_type}: {reason}")]
    ValueOutOfRange {
        /// Target type
        logical_type: LogicalType,
        /// Why the value does not fit
        reason: String,
    },

    /// Configuration document could not be read
    #[error("Invalid temporal configuration: {0}")]
    InvalidConfiguration(String),
}

impl TemporalError {
    /// Shorthand for [`TemporalError::MalformedTemporalLiteral`]
    pub fn malformed(literal: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTemporalLiteral {
            literal: literal.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TemporalError::InvalidFormatPattern`]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormatPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the literal text rather than configuration
    pub fn is_literal_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedTemporalLiteral { .. } | Self::FractionalSecondOverflow { .. }
        )
    }
}
