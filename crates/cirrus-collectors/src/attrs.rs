// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for building resource attribute maps.

use cirrus_core::Attributes;
use serde_json::Value;

/// Fluent builder over an attribute map. Absent optional values become `null`.
#[derive(Debug, Default)]
pub(crate) struct Attrs(Attributes);

impl Attrs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        self.set(key, value.map_or(Value::Null, Into::into))
    }

    pub(crate) fn build(self) -> Attributes {
        self.0
    }
}

/// Collapse key/value tag pairs into a map. Pairs missing either side are dropped.
pub(crate) fn tag_map<'a>(
    pairs: impl IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
) -> Attributes {
    pairs
        .into_iter()
        .filter_map(|(k, v)| Some((k?.to_string(), Value::from(v?))))
        .collect()
}

/// The `Name` tag, or an empty string.
pub(crate) fn name_tag(tags: &Attributes) -> String {
    tags.get("Name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// RFC 3339 timestamp, or `null`.
pub(crate) fn timestamp(dt: Option<&aws_smithy_types::DateTime>) -> Value {
    dt.and_then(cirrus_aws::time::to_rfc3339)
        .map_or(Value::Null, Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_nulls_missing_values() {
        let attrs = Attrs::new()
            .set("state", "running")
            .opt("public_ip", None::<&str>)
            .opt("private_ip", Some("10.0.0.4"))
            .build();
        assert_eq!(attrs["state"], "running");
        assert!(attrs["public_ip"].is_null());
        assert_eq!(attrs["private_ip"], "10.0.0.4");
    }

    #[test]
    fn tags_drop_incomplete_pairs() {
        let tags = tag_map([
            (Some("Name"), Some("web")),
            (None, Some("orphan")),
            (Some("Team"), None),
        ]);
        assert_eq!(tags.len(), 1);
        assert_eq!(name_tag(&tags), "web");
        assert_eq!(name_tag(&Attributes::new()), "");
    }

    #[test]
    fn timestamps_render_or_null() {
        let dt = aws_smithy_types::DateTime::from_secs(0);
        assert_eq!(timestamp(Some(&dt)), "1970-01-01T00:00:00Z");
        assert!(timestamp(None).is_null());
    }
}
