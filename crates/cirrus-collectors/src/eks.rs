// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! container-cluster-a: EKS clusters and their node groups.

use async_trait::async_trait;
use aws_sdk_eks::types::Cluster;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};

use crate::attrs::{timestamp, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{collect_all, describe, Listing, Page};

pub struct EksClusterCollector {
    ctx: CollectorContext,
}

impl EksClusterCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Collector for EksClusterCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::ContainerClusterA
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_eks::Client::new(&self.ctx.sdk_config(credential, region));
        let names: Vec<String> = collect_all(
            &self.ctx,
            Listing {
                service: self.service(),
                region,
                operation: "eks:ListClusters",
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
                    Ok(Page::new(out.clusters().to_vec(), out.next_token()))
                }
            },
        )
        .await?;

        let mut resources = Vec::with_capacity(names.len());
        for name in &names {
            let cluster = describe(&self.ctx, "eks:DescribeCluster", name, || {
                let client = client.clone();
                let name = name.clone();
                async move {
                    let out = client
                        .describe_cluster()
                        .name(name)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    Ok(out.cluster().cloned())
                }
            })
            .await?
            .flatten();
            let Some(cluster) = cluster else { continue };

            let node_groups: Vec<String> = collect_all(
                &self.ctx,
                Listing {
                    service: self.service(),
                    region,
                    operation: "eks:ListNodegroups",
                },
                |token| {
                    let client = client.clone();
                    let name = name.clone();
                    async move {
                        let out = client
                            .list_nodegroups()
                            .cluster_name(name)
                            .set_next_token(token)
                            .max_results(100)
                            .send()
                            .await
                            .map_err(|e| classify_sdk_error(&e))?;
                        Ok(Page::new(out.nodegroups().to_vec(), out.next_token()))
                    }
                },
            )
            .await?;

            if let Some(resource) = project_cluster(&cluster, &node_groups) {
                resources.push(resource);
            }
        }
        Ok(resources)
    }
}

pub(crate) fn project_cluster(cluster: &Cluster, node_groups: &[String]) -> Option<DiscoveredResource> {
    let arn = cluster.arn()?;
    let attributes = Attrs::new()
        .opt("cluster_name", cluster.name())
        .opt("status", cluster.status().map(|s| s.as_str()))
        .opt("version", cluster.version())
        .opt("endpoint", cluster.endpoint())
        .set("node_groups", node_groups.to_vec())
        .set("created_at", timestamp(cluster.created_at()))
        .build();
    Some(DiscoveredResource::new(arn, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_eks::types::ClusterStatus;

    #[test]
    fn projects_cluster_with_node_groups() {
        let cluster = Cluster::builder()
            .arn("arn:aws:eks:us-east-1:111111111111:cluster/platform")
            .name("platform")
            .status(ClusterStatus::Active)
            .version("1.31")
            .endpoint("https://ABC.gr7.us-east-1.eks.amazonaws.com")
            .build();
        let resource = project_cluster(&cluster, &["system".to_string(), "workers".to_string()]).unwrap();
        let a = &resource.attributes;
        assert_eq!(a["cluster_name"], "platform");
        assert_eq!(a["status"], "ACTIVE");
        assert_eq!(a["version"], "1.31");
        assert_eq!(a["node_groups"], serde_json::json!(["system", "workers"]));
    }

    #[test]
    fn cluster_without_arn_is_dropped() {
        let cluster = Cluster::builder().name("orphan").build();
        assert!(project_cluster(&cluster, &[]).is_none());
    }
}
