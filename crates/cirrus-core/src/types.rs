// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by collectors, the orchestrator and the stores.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Current time at millisecond precision, the resolution timestamps are stored at.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Open, service-specific attribute map carried by every resource record.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Pseudo-region used for services that only exist globally.
pub const GLOBAL_REGION: &str = "global";

/// Regions scanned when configuration does not narrow the list.
pub const DEFAULT_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-south-1",
    "ca-central-1",
    "sa-east-1",
];

/// The resource kinds the engine knows how to collect.
///
/// Displays as the canonical kebab-case name and also parses from the AWS
/// short service name (`ec2`, `s3`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum ServiceKind {
    #[strum(to_string = "compute-instance", serialize = "ec2")]
    ComputeInstance,
    #[strum(to_string = "object-store", serialize = "s3")]
    ObjectStore,
    #[strum(to_string = "relational-db", serialize = "rds")]
    RelationalDb,
    #[strum(to_string = "kv-table", serialize = "dynamodb")]
    KvTable,
    #[strum(to_string = "iam-role", serialize = "iam")]
    IamRole,
    #[strum(to_string = "network", serialize = "vpc")]
    Network,
    #[strum(to_string = "container-cluster-a", serialize = "eks")]
    ContainerClusterA,
    #[strum(to_string = "container-cluster-b", serialize = "ecs")]
    ContainerClusterB,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 8] = [
        ServiceKind::ComputeInstance,
        ServiceKind::ObjectStore,
        ServiceKind::RelationalDb,
        ServiceKind::KvTable,
        ServiceKind::IamRole,
        ServiceKind::Network,
        ServiceKind::ContainerClusterA,
        ServiceKind::ContainerClusterB,
    ];

    /// The AWS short name of the backing service.
    pub fn aws_name(self) -> &'static str {
        match self {
            Self::ComputeInstance => "ec2",
            Self::ObjectStore => "s3",
            Self::RelationalDb => "rds",
            Self::KvTable => "dynamodb",
            Self::IamRole => "iam",
            Self::Network => "vpc",
            Self::ContainerClusterA => "eks",
            Self::ContainerClusterB => "ecs",
        }
    }
}

/// How a collector maps onto regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionCoverage {
    /// One listing per supported region.
    Regional,
    /// A single listing under [`GLOBAL_REGION`], served from `home_region`.
    Global { home_region: String },
}

/// A (service, account, region) combination: the unit of collection and freshness.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Triple {
    pub service: ServiceKind,
    pub account_id: String,
    pub region: String,
}

impl Triple {
    pub fn new(service: ServiceKind, account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service,
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    /// Inventory partition key: `service#accountId#region`.
    pub fn partition_key(&self) -> String {
        format!("{}#{}#{}", self.service, self.account_id, self.region)
    }

    /// Freshness ledger sort key: `accountId#region`.
    pub fn ledger_key(&self) -> String {
        format!("{}#{}", self.account_id, self.region)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.account_id, self.region)
    }
}

/// A scan target produced by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    pub account_name: String,
}

impl AccountInfo {
    pub fn new(account_id: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            account_name: account_name.into(),
        }
    }
}

/// Identifier of one orchestration run. Also tags every record the run writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Scheduled,
    OnDemand,
}

/// The provenance stamp applied to every record one run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    pub run_id: RunId,
    pub collected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RunStamp {
    pub fn new(run_id: RunId, collected_at: DateTime<Utc>, retention: chrono::Duration) -> Self {
        let collected_at = collected_at.trunc_subsecs(3);
        Self {
            run_id,
            collected_at,
            expires_at: collected_at + retention,
        }
    }
}

/// One resource as a collector reports it, before provenance is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredResource {
    pub resource_id: String,
    pub attributes: Attributes,
}

impl DiscoveredResource {
    pub fn new(resource_id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            resource_id: resource_id.into(),
            attributes,
        }
    }
}

/// One discovered AWS resource as held by the inventory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub service: ServiceKind,
    pub account_id: String,
    pub region: String,
    pub resource_id: String,
    pub attributes: Attributes,
    pub collected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Applies a run stamp to a discovered resource within a triple.
    pub fn stamped(triple: &Triple, stamp: &RunStamp, resource: DiscoveredResource) -> Self {
        Self {
            service: triple.service,
            account_id: triple.account_id.clone(),
            region: triple.region.clone(),
            resource_id: resource.resource_id,
            attributes: resource.attributes,
            collected_at: stamp.collected_at,
            expires_at: stamp.expires_at,
        }
    }

    pub fn triple(&self) -> Triple {
        Triple::new(self.service, self.account_id.clone(), self.region.clone())
    }
}

/// Freshness marker for one triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessRecord {
    pub service: ServiceKind,
    pub account_id: String,
    pub region: String,
    /// Absent until the first successful collection.
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: DateTime<Utc>,
    pub resource_count: u64,
    pub last_error: Option<String>,
}

impl FreshnessRecord {
    pub fn triple(&self) -> Triple {
        Triple::new(self.service, self.account_id.clone(), self.region.clone())
    }
}
