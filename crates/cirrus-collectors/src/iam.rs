// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! iam-role: IAM roles. IAM is global, so this collector only answers for
//! the `global` pseudo-region and signs its calls in the home region.

use async_trait::async_trait;
use aws_sdk_iam::types::Role;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{
    CirrusError, Collector, Credential, DiscoveredResource, GLOBAL_REGION, RegionCoverage,
    ServiceKind,
};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::debug;

use crate::attrs::{timestamp, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{collect_all, Listing, Page};

pub struct IamRoleCollector {
    ctx: CollectorContext,
    home_region: String,
}

impl IamRoleCollector {
    pub fn new(ctx: CollectorContext, home_region: impl Into<String>) -> Self {
        Self {
            ctx,
            home_region: home_region.into(),
        }
    }
}

#[async_trait]
impl Collector for IamRoleCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::IamRole
    }

    fn coverage(&self) -> RegionCoverage {
        RegionCoverage::Global {
            home_region: self.home_region.clone(),
        }
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        if region != GLOBAL_REGION {
            debug!(region, "iam is global, nothing to list for a concrete region");
            return Ok(Vec::new());
        }

        let client = aws_sdk_iam::Client::new(&self.ctx.sdk_config(credential, &self.home_region));
        let listing = Listing {
            service: self.service(),
            region,
            operation: "iam:ListRoles",
        };
        collect_all(&self.ctx, listing, |marker| {
            let client = client.clone();
            async move {
                let out = client
                    .list_roles()
                    .set_marker(marker)
                    .max_items(1000)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(&e))?;
                let items = out.roles().iter().map(project_role).collect();
                let next = if out.is_truncated() { out.marker() } else { None };
                Ok(Page::new(items, next))
            }
        })
        .await
    }
}

/// IAM returns policy documents URL-encoded. Decode and parse them, keeping
/// the raw text when it is not valid JSON.
pub(crate) fn decode_policy(document: &str) -> Value {
    let decoded = percent_decode_str(document).decode_utf8_lossy();
    serde_json::from_str(&decoded).unwrap_or_else(|_| Value::from(decoded.into_owned()))
}

pub(crate) fn project_role(role: &Role) -> DiscoveredResource {
    let arn = role.arn();
    let attributes = Attrs::new()
        .set("role_name", role.role_name())
        .set("arn", arn)
        .set("role_id", role.role_id())
        .set("path", role.path())
        .set("created", timestamp(Some(role.create_date())))
        .set(
            "assume_role_policy",
            role.assume_role_policy_document()
                .map_or(Value::Null, decode_policy),
        )
        .opt("description", role.description())
        .build();
    DiscoveredResource::new(arn, attributes)
}
