// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! container-cluster-b: ECS clusters.

use async_trait::async_trait;
use aws_sdk_ecs::types::Cluster;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};
use tracing::debug;

use crate::attrs::Attrs;
use crate::context::CollectorContext;
use crate::paginate::{collect_all, describe, Listing, Page};

/// DescribeClusters accepts at most this many cluster ARNs per call.
const DESCRIBE_BATCH: usize = 10;

pub struct EcsClusterCollector {
    ctx: CollectorContext,
}

impl EcsClusterCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Collector for EcsClusterCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::ContainerClusterB
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_ecs::Client::new(&self.ctx.sdk_config(credential, region));
        let arns: Vec<String> = collect_all(
            &self.ctx,
            Listing {
                service: self.service(),
                region,
                operation: "ecs:ListClusters",
            },
            |token| {
                let client = client.clone();
                async move {
                    let out = client
                        .list_clusters()
                        .set_next_token(token)
                        .max_results(100)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    Ok(Page::new(out.cluster_arns().to_vec(), out.next_token()))
                }
            },
        )
        .await?;

        let mut resources = Vec::with_capacity(arns.len());
        for batch in arns.chunks(DESCRIBE_BATCH) {
            let label = format!("{} cluster(s)", batch.len());
            let clusters = describe(&self.ctx, "ecs:DescribeClusters", &label, || {
                let client = client.clone();
                let batch = batch.to_vec();
                async move {
                    let out = client
                        .describe_clusters()
                        .set_clusters(Some(batch))
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    if !out.failures().is_empty() {
                        debug!(
                            missing = out.failures().len(),
                            "clusters vanished before describe, skipping"
                        );
                    }
                    Ok(out.clusters().to_vec())
                }
            })
            .await?
            .unwrap_or_default();
            resources.extend(clusters.iter().filter_map(project_cluster));
        }
        Ok(resources)
    }
}

pub(crate) fn project_cluster(cluster: &Cluster) -> Option<DiscoveredResource> {
    let arn = cluster.cluster_arn()?;
    let attributes = Attrs::new()
        .opt("cluster_name", cluster.cluster_name())
        .opt("status", cluster.status())
        .set("active_services", cluster.active_services_count())
        .set("running_tasks", cluster.running_tasks_count())
        .set("pending_tasks", cluster.pending_tasks_count())
        .set(
            "registered_container_instances",
            cluster.registered_container_instances_count(),
        )
        .build();
    Some(DiscoveredResource::new(arn, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_task_counts() {
        let cluster = Cluster::builder()
            .cluster_arn("arn:aws:ecs:us-east-1:111111111111:cluster/batch")
            .cluster_name("batch")
            .status("ACTIVE")
            .active_services_count(3)
            .running_tasks_count(7)
            .pending_tasks_count(1)
            .registered_container_instances_count(2)
            .build();
        let resource = project_cluster(&cluster).unwrap();
        let a = &resource.attributes;
        assert_eq!(resource.resource_id, "arn:aws:ecs:us-east-1:111111111111:cluster/batch");
        assert_eq!(a["status"], "ACTIVE");
        assert_eq!(a["running_tasks"], 7);
        assert_eq!(a["registered_container_instances"], 2);
    }

    #[test]
    fn batches_respect_describe_limit() {
        let arns: Vec<String> = (0..23).map(|i| format!("arn:{i}")).collect();
        let sizes: Vec<usize> = arns.chunks(DESCRIBE_BATCH).map(<[String]>::len).collect();
        assert_eq!(sizes, [10, 10, 3]);
    }
}
