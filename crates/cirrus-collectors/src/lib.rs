// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS service collectors for the Cirrus inventory engine.
//!
//! One [`Collector`] per resource kind. Each follows continuation tokens to
//! the end of its listing and projects raw SDK items into a flat attribute
//! map keyed by a service-scoped resource id.

pub mod context;
pub mod dynamodb;
pub mod ec2;
pub mod ecs;
pub mod eks;
pub mod iam;
pub mod paginate;
pub mod rds;
pub mod s3;
pub mod vpc;

mod attrs;

use std::sync::Arc;

use cirrus_core::{Collector, CollectorRegistry, ServiceKind};

pub use context::{CollectorContext, DEFAULT_MAX_PAGES};
pub use dynamodb::DynamoTableCollector;
pub use ec2::Ec2InstanceCollector;
pub use ecs::EcsClusterCollector;
pub use eks::EksClusterCollector;
pub use iam::IamRoleCollector;
pub use rds::RdsInstanceCollector;
pub use s3::S3BucketCollector;
pub use vpc::VpcCollector;

/// The collector for `service`. IAM calls are signed in `home_region`.
pub fn builtin(service: ServiceKind, ctx: &CollectorContext, home_region: &str) -> Arc<dyn Collector> {
    let ctx = ctx.clone();
    match service {
        ServiceKind::ComputeInstance => Arc::new(Ec2InstanceCollector::new(ctx)),
        ServiceKind::ObjectStore => Arc::new(S3BucketCollector::new(ctx)),
        ServiceKind::RelationalDb => Arc::new(RdsInstanceCollector::new(ctx)),
        ServiceKind::KvTable => Arc::new(DynamoTableCollector::new(ctx)),
        ServiceKind::IamRole => Arc::new(IamRoleCollector::new(ctx, home_region)),
        ServiceKind::Network => Arc::new(VpcCollector::new(ctx)),
        ServiceKind::ContainerClusterA => Arc::new(EksClusterCollector::new(ctx)),
        ServiceKind::ContainerClusterB => Arc::new(EcsClusterCollector::new(ctx)),
    }
}

/// A registry holding the builtin collectors for `services`.
pub fn builtin_registry(
    services: &[ServiceKind],
    ctx: &CollectorContext,
    home_region: &str,
) -> CollectorRegistry {
    let mut registry = CollectorRegistry::new();
    for &service in services {
        registry.register(builtin(service, ctx, home_region));
    }
    registry
}
