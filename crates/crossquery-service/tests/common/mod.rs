//! Shared builders for service integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crossquery_client::{MemoryQueryClient, Record};
use crossquery_domain::schema;
use crossquery_service::{ClientSettings, FilterParams, ServiceConfig, TimeEntryQueryHandler};
use serde_json::json;

/// A handler over `client` with default engine settings.
pub fn handler(client: &Arc<MemoryQueryClient>) -> TimeEntryQueryHandler<MemoryQueryClient> {
    handler_with(client, &ServiceConfig::default())
}

pub fn handler_with(
    client: &Arc<MemoryQueryClient>,
    config: &ServiceConfig,
) -> TimeEntryQueryHandler<MemoryQueryClient> {
    TimeEntryQueryHandler::new(Arc::clone(client), config).unwrap()
}

/// Parameters with the mandatory posting status set.
pub fn params(status: &str) -> FilterParams {
    FilterParams::new().with("posting_status", status)
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().map(|r| r.id().unwrap()).collect();
    ids.sort_unstable();
    ids
}

/// `total` unrelated time entries; those for which `posted` holds get a labour
/// billing item and, when divisible by 7, an extra expense item that never counts.
pub fn ledger_workload(
    settings: &ClientSettings,
    total: i64,
    latency: Option<Duration>,
    posted: impl Fn(i64) -> bool,
) -> Arc<MemoryQueryClient> {
    let mut client = settings.memory_client();
    if let Some(latency) = latency {
        client = client.with_latency(latency);
    }

    let entries = (1..=total).map(|id| {
        Record::from_value(json!({
            "id": id,
            "resourceID": 100 + id % 4,
            "dateWorked": "2024-05-02",
            "hoursWorked": 1.5,
            "isNonBillable": id % 10 == 0
        }))
        .unwrap()
    });
    client.insert(schema::TIME_ENTRIES, entries);

    let mut items = Vec::new();
    for id in 1..=total {
        if posted(id) {
            items.push(json!({ "id": id * 10, "timeEntryID": id, "billingItemType": 1 }));
        }
        if id % 7 == 0 {
            items.push(json!({ "id": id * 10 + 1, "timeEntryID": id, "billingItemType": 4 }));
        }
    }
    client
        .insert_json(schema::BILLING_ITEMS, serde_json::Value::Array(items))
        .unwrap();

    Arc::new(client)
}

/// A small help desk: two managers, tickets and project tasks, one posted entry.
///
/// | entry | parent          | company (owner) | ticket status/queue | ledger |
/// |-------|-----------------|-----------------|---------------------|--------|
/// | 1     | ticket 10       | 1 (500)         | 1 / 2               | posted |
/// | 2     | ticket 11       | 2 (600)         | 8 / 2               |        |
/// | 3     | ticket 12       | 1 (500)         | 1 / 9               |        |
/// | 4     | task 20 / p30   | 2 (600)         |                     |        |
/// | 5     | task 21 / p31   | 1 (500)         |                     |        |
/// | 6     | none            |                 |                     |        |
pub fn help_desk() -> Arc<MemoryQueryClient> {
    let client = MemoryQueryClient::new().with_page_size(2);
    let rows = [
        (schema::COMPANIES, json!([
            { "id": 1, "ownerResourceID": 500 },
            { "id": 2, "ownerResourceID": 600 }
        ])),
        (schema::PROJECTS, json!([
            { "id": 30, "companyID": 2 },
            { "id": 31, "companyID": 1 }
        ])),
        (schema::TASKS, json!([
            { "id": 20, "status": 1, "projectID": 30 },
            { "id": 21, "status": 5, "projectID": 31 }
        ])),
        (schema::TICKETS, json!([
            { "id": 10, "status": 1, "queueID": 2, "companyID": 1, "dueDateTime": "2024-05-03T12:00:00Z" },
            { "id": 11, "status": 8, "queueID": 2, "companyID": 2, "dueDateTime": null },
            { "id": 12, "status": 1, "queueID": 9, "companyID": 1, "dueDateTime": "2024-06-01T12:00:00Z" }
        ])),
        (schema::BILLING_ITEMS, json!([
            { "id": 900, "timeEntryID": 1, "billingItemType": 6 }
        ])),
        (schema::TIME_ENTRIES, json!([
            { "id": 1, "ticketID": 10, "resourceID": 7, "dateWorked": "2024-05-01", "hoursWorked": 2.0 },
            { "id": 2, "ticketID": 11, "resourceID": 7, "dateWorked": "2024-05-01", "hoursWorked": 0.5 },
            { "id": 3, "ticketID": 12, "resourceID": 8, "dateWorked": "2024-05-02", "hoursWorked": 3.0 },
            { "id": 4, "taskID": 20, "resourceID": 8, "dateWorked": "2024-05-02", "hoursWorked": 1.0 },
            { "id": 5, "taskID": 21, "resourceID": 7, "dateWorked": "2024-05-03", "hoursWorked": 4.0 },
            { "id": 6, "resourceID": 9, "dateWorked": "2024-05-03", "hoursWorked": 1.0 }
        ])),
    ];
    for (entity, data) in rows {
        client.insert_json(entity, data).unwrap();
    }
    Arc::new(client)
}
