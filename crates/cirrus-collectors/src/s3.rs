// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! object-store: S3 buckets located in the requested region.

use async_trait::async_trait;
use aws_sdk_s3::types::Bucket;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};
use tracing::debug;

use crate::attrs::{timestamp, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{best_effort, collect_all, Listing, Page};

const VERSIONING_DISABLED: &str = "Disabled";
const ENCRYPTION_NONE: &str = "None";

pub struct S3BucketCollector {
    ctx: CollectorContext,
}

impl S3BucketCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

/// Best-effort bucket settings. Lookups that fail keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BucketDetails {
    pub versioning: String,
    pub encryption: String,
    pub public: bool,
}

impl Default for BucketDetails {
    fn default() -> Self {
        Self {
            versioning: VERSIONING_DISABLED.into(),
            encryption: ENCRYPTION_NONE.into(),
            public: false,
        }
    }
}

async fn bucket_details(client: &aws_sdk_s3::Client, bucket: &str) -> BucketDetails {
    let versioning = best_effort("s3:GetBucketVersioning", bucket, async {
        let out = client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        Ok(out.status().map(|s| s.as_str().to_string()))
    });
    let encryption = best_effort("s3:GetBucketEncryption", bucket, async {
        let out = client
            .get_bucket_encryption()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        Ok(out
            .server_side_encryption_configuration()
            .and_then(|c| c.rules().first())
            .and_then(|r| r.apply_server_side_encryption_by_default())
            .map(|d| d.sse_algorithm().as_str().to_string()))
    });
    let public = best_effort("s3:GetBucketPolicyStatus", bucket, async {
        let out = client
            .get_bucket_policy_status()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        Ok(out.policy_status().and_then(|p| p.is_public()))
    });
    let (versioning, encryption, public) = tokio::join!(versioning, encryption, public);

    let defaults = BucketDetails::default();
    BucketDetails {
        versioning: versioning.flatten().unwrap_or(defaults.versioning),
        encryption: encryption.flatten().unwrap_or(defaults.encryption),
        public: public.flatten().unwrap_or(defaults.public),
    }
}

#[async_trait]
impl Collector for S3BucketCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::ObjectStore
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_s3::Client::new(&self.ctx.sdk_config(credential, region));
        let buckets: Vec<Bucket> = collect_all(
            &self.ctx,
            Listing {
                service: self.service(),
                region,
                operation: "s3:ListBuckets",
            },
            |token| {
                let client = client.clone();
                let region = region.to_string();
                async move {
                    let out = client
                        .list_buckets()
                        .bucket_region(region)
                        .set_continuation_token(token)
                        .max_buckets(1000)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    Ok(Page::new(out.buckets().to_vec(), out.continuation_token()))
                }
            },
        )
        .await?;

        let mut resources = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let Some(name) = bucket.name() else { continue };
            // Older endpoints ignore the region filter; double-check when the region is reported.
            if let Some(bucket_region) = bucket.bucket_region()
                && bucket_region != region
            {
                debug!(bucket = name, bucket_region, region, "bucket outside region, skipping");
                continue;
            }
            let details = bucket_details(&client, name).await;
            resources.push(project_bucket(bucket, name, &details));
        }
        Ok(resources)
    }
}

pub(crate) fn project_bucket(bucket: &Bucket, name: &str, details: &BucketDetails) -> DiscoveredResource {
    let attributes = Attrs::new()
        .set("bucket_name", name)
        .set("versioning", details.versioning.as_str())
        .set("encryption", details.encryption.as_str())
        .set("public", details.public)
        .set("creation_date", timestamp(bucket.creation_date()))
        .build();
    DiscoveredResource::new(name, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_unconfigured_bucket() {
        let details = BucketDetails::default();
        assert_eq!(details.versioning, "Disabled");
        assert_eq!(details.encryption, "None");
        assert!(!details.public);
    }

    #[test]
    fn projects_bucket() {
        let bucket = Bucket::builder()
            .name("audit-logs")
            .creation_date(aws_smithy_types::DateTime::from_secs(1_767_225_600))
            .build();
        let details = BucketDetails {
            versioning: "Enabled".into(),
            encryption: "aws:kms".into(),
            public: true,
        };
        let resource = project_bucket(&bucket, "audit-logs", &details);
        let a = &resource.attributes;
        assert_eq!(resource.resource_id, "audit-logs");
        assert_eq!(a["versioning"], "Enabled");
        assert_eq!(a["encryption"], "aws:kms");
        assert_eq!(a["public"], true);
        assert_eq!(a["creation_date"], "2026-01-01T00:00:00Z");
    }
}
