// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! relational-db: RDS database instances.

use async_trait::async_trait;
use aws_sdk_rds::types::DbInstance;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};

use crate::attrs::{timestamp, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{collect_all, Listing, Page};

pub struct RdsInstanceCollector {
    ctx: CollectorContext,
}

impl RdsInstanceCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Collector for RdsInstanceCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::RelationalDb
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_rds::Client::new(&self.ctx.sdk_config(credential, region));
        let listing = Listing {
            service: self.service(),
            region,
            operation: "rds:DescribeDBInstances",
        };
        collect_all(&self.ctx, listing, |marker| {
            let client = client.clone();
            async move {
                let out = client
                    .describe_db_instances()
                    .set_marker(marker)
                    .max_records(100)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(&e))?;
                let items = out.db_instances().iter().filter_map(project_db_instance).collect();
                Ok(Page::new(items, out.marker()))
            }
        })
        .await
    }
}

pub(crate) fn project_db_instance(db: &DbInstance) -> Option<DiscoveredResource> {
    let id = db.db_instance_identifier()?;
    let endpoint = db.endpoint().and_then(|e| {
        let address = e.address()?;
        Some(match e.port() {
            Some(port) => format!("{address}:{port}"),
            None => address.to_string(),
        })
    });

    let attributes = Attrs::new()
        .set("db_identifier", id)
        .opt("engine", db.engine())
        .opt("engine_version", db.engine_version())
        .opt("status", db.db_instance_status())
        .opt("instance_class", db.db_instance_class())
        .opt("endpoint", endpoint)
        .set("encrypted", db.storage_encrypted().unwrap_or(false))
        .set("multi_az", db.multi_az().unwrap_or(false))
        .set("created_at", timestamp(db.instance_create_time()))
        .build();
    Some(DiscoveredResource::new(id, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rds::types::Endpoint;

    #[test]
    fn projects_db_instance() {
        let db = DbInstance::builder()
            .db_instance_identifier("orders-db")
            .engine("postgres")
            .engine_version("16.3")
            .db_instance_status("available")
            .db_instance_class("db.t4g.medium")
            .endpoint(
                Endpoint::builder()
                    .address("orders-db.abc.us-east-1.rds.amazonaws.com")
                    .port(5432)
                    .build(),
            )
            .storage_encrypted(true)
            .build();

        let resource = project_db_instance(&db).unwrap();
        let a = &resource.attributes;
        assert_eq!(resource.resource_id, "orders-db");
        assert_eq!(a["engine"], "postgres");
        assert_eq!(a["endpoint"], "orders-db.abc.us-east-1.rds.amazonaws.com:5432");
        assert_eq!(a["encrypted"], true);
        assert_eq!(a["multi_az"], false);
        assert!(a["created_at"].is_null());
    }

    #[test]
    fn instance_still_creating_has_null_endpoint() {
        let db = DbInstance::builder()
            .db_instance_identifier("new-db")
            .db_instance_status("creating")
            .build();
        let resource = project_db_instance(&db).unwrap();
        assert!(resource.attributes["endpoint"].is_null());
    }
}
