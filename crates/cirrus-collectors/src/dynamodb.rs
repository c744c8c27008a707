// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! kv-table: DynamoDB tables, listed by name then described one at a time.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableDescription;
use cirrus_aws::classify_sdk_error;
use cirrus_core::{CirrusError, Collector, Credential, DiscoveredResource, ServiceKind};

use crate::attrs::{timestamp, Attrs};
use crate::context::CollectorContext;
use crate::paginate::{collect_all, describe, Listing, Page};

const DEFAULT_BILLING_MODE: &str = "PROVISIONED";

pub struct DynamoTableCollector {
    ctx: CollectorContext,
}

impl DynamoTableCollector {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Collector for DynamoTableCollector {
    fn service(&self) -> ServiceKind {
        ServiceKind::KvTable
    }

    async fn collect(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Vec<DiscoveredResource>, CirrusError> {
        let client = aws_sdk_dynamodb::Client::new(&self.ctx.sdk_config(credential, region));
        let listing = Listing {
            service: self.service(),
            region,
            operation: "dynamodb:ListTables",
        };
        let names: Vec<String> = collect_all(&self.ctx, listing, |start| {
            let client = client.clone();
            async move {
                let out = client
                    .list_tables()
                    .set_exclusive_start_table_name(start)
                    .limit(100)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(&e))?;
                Ok(Page::new(out.table_names().to_vec(), out.last_evaluated_table_name()))
            }
        })
        .await?;

        let mut resources = Vec::with_capacity(names.len());
        for name in &names {
            let table = describe(&self.ctx, "dynamodb:DescribeTable", name, || {
                let client = client.clone();
                let name = name.clone();
                async move {
                    let out = client
                        .describe_table()
                        .table_name(name)
                        .send()
                        .await
                        .map_err(|e| classify_sdk_error(&e))?;
                    Ok(out.table().cloned())
                }
            })
            .await?;
            if let Some(resource) = table.flatten().as_ref().and_then(project_table) {
                resources.push(resource);
            }
        }
        Ok(resources)
    }
}

pub(crate) fn project_table(table: &TableDescription) -> Option<DiscoveredResource> {
    let arn = table.table_arn()?;
    let billing_mode = table
        .billing_mode_summary()
        .and_then(|b| b.billing_mode())
        .map_or(DEFAULT_BILLING_MODE, |m| m.as_str());

    let attributes = Attrs::new()
        .opt("table_name", table.table_name())
        .opt("status", table.table_status().map(|s| s.as_str()))
        .set("billing_mode", billing_mode)
        .set("item_count", table.item_count().unwrap_or(0))
        .set("created_at", timestamp(table.creation_date_time()))
        .build();
    Some(DiscoveredResource::new(arn, attributes))
}
