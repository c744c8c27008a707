// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! compute-instance: EC2 instances.

use async_trait::async_trait;
use aws_sdk_ec2::types::Instance;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};
use serde_json::Value;

use crate::attrs::{name_tag, tag_map, timestamp, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{collect_all, Listing, Page};

pub struct Ec2InstanceCollector {
    ctx: CollectorContext,
}

impl Ec2InstanceCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Collector for Ec2InstanceCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::ComputeInstance
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_ec2::Client::new(&self.ctx.sdk_config(credential, region));
        let listing = Listing {
            service: self.service(),
            region,
            operation: "ec2:DescribeInstances",
        };
        collect_all(&self.ctx, listing, |token| {
            let client = client.clone();
            async move {
                let out = client
                    .describe_instances()
                    .set_next_token(token)
                    .max_results(1000)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(&e))?;
                let items = out
                    .reservations()
                    .iter()
                    .flat_map(|r| r.instances())
                    .filter_map(project_instance)
                    .collect();
                Ok(Page::new(items, out.next_token()))
            }
        })
        .await
    }
}

pub(crate) fn project_instance(instance: &Instance) -> Option<DiscoveredResource> {
    let id = instance.instance_id()?;
    let tags = tag_map(instance.tags().iter().map(|t| (t.key(), t.value())));
    let security_groups: Vec<Value> = instance
        .security_groups()
        .iter()
        .filter_map(|g| g.group_name())
        .map(Value::from)
        .collect();

    let attributes = Attrs::new()
        .set("instance_id", id)
        .set("name", name_tag(&tags))
        .opt(
            "state",
            instance
                .state()
                .and_then(|s| s.name())
                .map(|n| n.as_str()),
        )
        .opt("instance_type", instance.instance_type().map(|t| t.as_str()))
        .opt("private_ip", instance.private_ip_address())
        .opt("public_ip", instance.public_ip_address())
        .set("security_groups", security_groups)
        .opt("vpc_id", instance.vpc_id())
        .opt("subnet_id", instance.subnet_id())
        .set("launch_time", timestamp(instance.launch_time()))
        .set("tags", tags)
        .build();
    Some(DiscoveredResource::new(id, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{GroupIdentifier, InstanceState, InstanceStateName, InstanceType, Tag};

    #[test]
    fn projects_instance_fields() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .state(InstanceState::builder().name(InstanceStateName::Running).build())
            .instance_type(InstanceType::T3Micro)
            .private_ip_address("10.0.1.5")
            .security_groups(GroupIdentifier::builder().group_name("web-sg").build())
            .vpc_id("vpc-1")
            .tags(Tag::builder().key("Name").value("web-1").build())
            .tags(Tag::builder().key("Env").value("prod").build())
            .build();

        let resource = project_instance(&instance).unwrap();
        assert_eq!(resource.resource_id, "i-0abc");
        let a = &resource.attributes;
        assert_eq!(a["name"], "web-1");
        assert_eq!(a["state"], "running");
        assert_eq!(a["instance_type"], "t3.micro");
        assert!(a["public_ip"].is_null());
        assert_eq!(a["security_groups"][0], "web-sg");
        assert_eq!(a["tags"]["Env"], "prod");
        assert!(a["launch_time"].is_null());
    }

    #[test]
    fn instance_without_id_is_dropped() {
        assert!(project_instance(&Instance::builder().build()).is_none());
    }
}
