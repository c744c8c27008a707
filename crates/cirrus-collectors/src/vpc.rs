// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! network: VPCs with their subnet ids.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_ec2::types::{Subnet, Vpc};
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};
use serde_json::Value;

use crate::attrs::{name_tag, tag_map, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{collect_all, Listing, Page};

pub struct VpcCollector {
    ctx: CollectorContext,
}

impl VpcCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Collector for VpcCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::Network
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_ec2::Client::new(&self.ctx.sdk_config(credential, region));

        let vpcs: Vec<Vpc> = collect_all(
            &self.ctx,
            Listing {
                service: self.service(),
                region,
                operation: "ec2:DescribeVpcs",
            },
            |token| {
                let client = client.clone();
                async move {
                    let out = client
                        .describe_vpcs()
                        .set_next_token(token)
                        .max_results(1000)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    Ok(Page::new(out.vpcs().to_vec(), out.next_token()))
                }
            },
        )
        .await?;

        if vpcs.is_empty() {
            return Ok(Vec::new());
        }

        // One region-wide subnet listing instead of a call per VPC.
        let subnets: Vec<Subnet> = collect_all(
            &self.ctx,
            Listing {
                service: self.service(),
                region,
                operation: "ec2:DescribeSubnets",
            },
            |token| {
                let client = client.clone();
                async move {
                    let out = client
                        .describe_subnets()
                        .set_next_token(token)
                        .max_results(1000)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    Ok(Page::new(out.subnets().to_vec(), out.next_token()))
                }
            },
        )
        .await?;

        let by_vpc = group_subnets(&subnets);
        Ok(vpcs
            .iter()
            .filter_map(|vpc| project_vpc(vpc, &by_vpc))
            .collect())
    }
}

fn group_subnets(subnets: &[Subnet]) -> BTreeMap<&str, Vec<&str>> {
    let mut by_vpc: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for subnet in subnets {
        if let (Some(vpc_id), Some(subnet_id)) = (subnet.vpc_id(), subnet.subnet_id()) {
            by_vpc.entry(vpc_id).or_default().push(subnet_id);
        }
    }
    by_vpc
}

pub(crate) fn project_vpc(
    vpc: &Vpc,
    subnets: &BTreeMap<&str, Vec<&str>>,
) -> Option<DiscoveredResource> {
    let id = vpc.vpc_id()?;
    let tags = tag_map(vpc.tags().iter().map(|t| (t.key(), t.value())));
    let subnet_ids: Vec<Value> = subnets
        .get(id)
        .map(|ids| ids.iter().copied().map(Value::from).collect())
        .unwrap_or_default();

    let attributes = Attrs::new()
        .set("vpc_id", id)
        .set("name", name_tag(&tags))
        .opt("cidr_block", vpc.cidr_block())
        .opt("state", vpc.state().map(|s| s.as_str()))
        .set("is_default", vpc.is_default().unwrap_or(false))
        .set("subnets", subnet_ids)
        .set("tags", tags)
        .build();
    Some(DiscoveredResource::new(id, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{Tag, VpcState};

    #[test]
    fn attaches_subnets_to_their_vpc() {
        let subnets = vec![
            Subnet::builder().vpc_id("vpc-1").subnet_id("subnet-a").build(),
            Subnet::builder().vpc_id("vpc-2").subnet_id("subnet-b").build(),
            Subnet::builder().vpc_id("vpc-1").subnet_id("subnet-c").build(),
        ];
        let grouped = group_subnets(&subnets);

        let vpc = Vpc::builder()
            .vpc_id("vpc-1")
            .cidr_block("10.0.0.0/16")
            .state(VpcState::Available)
            .is_default(true)
            .tags(Tag::builder().key("Name").value("main").build())
            .build();
        let resource = project_vpc(&vpc, &grouped).unwrap();
        let a = &resource.attributes;
        assert_eq!(resource.resource_id, "vpc-1");
        assert_eq!(a["name"], "main");
        assert_eq!(a["state"], "available");
        assert_eq!(a["is_default"], true);
        assert_eq!(a["subnets"], serde_json::json!(["subnet-a", "subnet-c"]));
    }

    #[test]
    fn vpc_without_subnets_has_empty_list() {
        let vpc = Vpc::builder().vpc_id("vpc-9").build();
        let resource = project_vpc(&vpc, &BTreeMap::new()).unwrap();
        assert_eq!(resource.attributes["subnets"], serde_json::json!([]));
        assert_eq!(resource.attributes["is_default"], false);
    }
}
