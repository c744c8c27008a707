// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions from smithy timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn to_chrono(dt: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// RFC 3339 rendering used in resource attributes.
pub fn to_rfc3339(dt: &aws_smithy_types::DateTime) -> Option<String> {
    to_chrono(dt).map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_epoch_seconds() {
        let dt = aws_smithy_types::DateTime::from_secs(1_767_225_600);
        assert_eq!(to_rfc3339(&dt).as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(to_chrono(&dt).map(|ts| ts.timestamp()), Some(1_767_225_600));
    }
}
