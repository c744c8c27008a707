// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status and security counts over a set of stored records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cirrus_core::{ResourceRecord, ServiceKind};

const RUNNING: &[&str] = &["running", "available", "active"];
const STOPPED: &[&str] = &["stopped", "stopping"];
const ERRORED: &[&str] = &["error", "failed"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub errors: usize,
    pub security_issues: usize,
}

/// The lifecycle word of a record: `state` where the service reports one, else `status`.
fn lifecycle(record: &ResourceRecord) -> Option<String> {
    ["state", "status"]
        .iter()
        .find_map(|key| record.attributes.get(*key).and_then(Value::as_str))
        .map(str::to_lowercase)
}

/// Public or unencrypted buckets, and unencrypted databases.
fn has_security_issue(service: ServiceKind, record: &ResourceRecord) -> bool {
    let attrs = &record.attributes;
    match service {
        ServiceKind::ObjectStore => {
            attrs.get("public").and_then(Value::as_bool).unwrap_or(false)
                || attrs.get("encryption").and_then(Value::as_str) == Some("None")
        }
        ServiceKind::RelationalDb => !attrs.get("encrypted").and_then(Value::as_bool).unwrap_or(false),
        _ => false,
    }
}

pub fn summarize(service: ServiceKind, records: &[ResourceRecord]) -> InventorySummary {
    let mut summary = InventorySummary {
        total: records.len(),
        ..InventorySummary::default()
    };
    for record in records {
        if let Some(word) = lifecycle(record) {
            let word = word.as_str();
            if RUNNING.contains(&word) {
                summary.running += 1;
            } else if STOPPED.contains(&word) {
                summary.stopped += 1;
            } else if ERRORED.contains(&word) {
                summary.errors += 1;
            }
        }
        if has_security_issue(service, record) {
            summary.security_issues += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(service: ServiceKind, id: &str, attrs: Value) -> ResourceRecord {
        let Value::Object(attributes) = attrs else {
            panic!("attributes must be an object");
        };
        ResourceRecord {
            service,
            account_id: "111".into(),
            region: "us-east-1".into(),
            resource_id: id.into(),
            attributes,
            collected_at: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn counts_instance_states() {
        let s = ServiceKind::ComputeInstance;
        let records = vec![
            record(s, "i-1", json!({"state": "running"})),
            record(s, "i-2", json!({"state": "Stopped"})),
            record(s, "i-3", json!({"state": "terminated"})),
            record(s, "i-4", json!({})),
        ];
        let summary = summarize(s, &records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.running, 1);
        assert_eq!(summary.stopped, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.security_issues, 0);
    }

    #[test]
    fn flags_public_or_unencrypted_buckets() {
        let s = ServiceKind::ObjectStore;
        let records = vec![
            record(s, "a", json!({"public": true, "encryption": "AES256"})),
            record(s, "b", json!({"public": false, "encryption": "None"})),
            record(s, "c", json!({"public": false, "encryption": "aws:kms"})),
        ];
        assert_eq!(summarize(s, &records).security_issues, 2);
    }

    #[test]
    fn flags_unencrypted_databases_and_failed_status() {
        let s = ServiceKind::RelationalDb;
        let records = vec![
            record(s, "db1", json!({"status": "available", "encrypted": true})),
            record(s, "db2", json!({"status": "failed", "encrypted": false})),
        ];
        let summary = summarize(s, &records);
        assert_eq!(summary.running, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.security_issues, 1);
    }
}
