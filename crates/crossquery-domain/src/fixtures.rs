//! Shared test fixtures: record builders and a small service-desk dataset.

use std::sync::Arc;

use crossquery_client::{MemoryQueryClient, Record};
use serde_json::{json, Value};

use crate::collector::QueryEngine;
use crate::config::EngineConfig;
use crate::lookup::BatchedLookup;
use crate::resolver::FilterResolver;
use crate::schema;

/// Builds a time entry with default work fields, overridden by `fields`.
pub(crate) fn time_entry(id: i64, fields: Value) -> Record {
    let mut entry = json!({
        "id": id,
        "resourceID": 11,
        "dateWorked": "2024-03-01",
        "hoursWorked": 1.0,
        "isNonBillable": false
    });
    if let (Value::Object(base), Value::Object(overrides)) = (&mut entry, fields) {
        base.extend(overrides);
    }
    Record::from_value(entry).unwrap()
}

pub(crate) fn resolver(client: &Arc<MemoryQueryClient>) -> FilterResolver<MemoryQueryClient> {
    let lookup = BatchedLookup::new(Arc::clone(client), &EngineConfig::default());
    FilterResolver::new(Arc::new(lookup))
}

pub(crate) fn engine(client: &Arc<MemoryQueryClient>, config: EngineConfig) -> QueryEngine<MemoryQueryClient> {
    QueryEngine::new(Arc::clone(client), config).unwrap()
}

pub(crate) fn ids(records: &[Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().map(|r| r.id().unwrap()).collect();
    ids.sort_unstable();
    ids
}

/// Eight time entries spread over tickets, tasks and neither.
///
/// | entry | parent          | company (owner) | contract (type) | ledger        |
/// |-------|-----------------|-----------------|-----------------|---------------|
/// | 1     | ticket 500      | 100 (7)         | 70 (1)          | labour        |
/// | 2     | ticket 501      | 200 (8)         | 71 (3)          |               |
/// | 3     | ticket 502      | 300 (7)         |                 |               |
/// | 4     | task 1000 / p10 | 100 (7)         | 70 (1)          | labour adjust |
/// | 5     | task 1001 / p20 | 200 (8)         |                 | expense       |
/// | 6     | task 1002 / p30 | 300 (7)         | 71 (3)          |               |
/// | 7     | none            |                 |                 |               |
/// | 8     | ticket 503      | none            |                 |               |
pub(crate) fn service_desk() -> MemoryQueryClient {
    let client = MemoryQueryClient::new();
    client
        .insert_json(
            schema::COMPANIES,
            json!([
                { "id": 100, "ownerResourceID": 7 },
                { "id": 200, "ownerResourceID": 8 },
                { "id": 300, "ownerResourceID": 7 }
            ]),
        )
        .unwrap();
    client
        .insert_json(
            schema::PROJECTS,
            json!([
                { "id": 10, "companyID": 100 },
                { "id": 20, "companyID": 200 },
                { "id": 30, "companyID": 300 }
            ]),
        )
        .unwrap();
    client
        .insert_json(
            schema::TASKS,
            json!([
                { "id": 1000, "status": 1, "projectID": 10 },
                { "id": 1001, "status": 5, "projectID": 20 },
                { "id": 1002, "status": 1, "projectID": 30 }
            ]),
        )
        .unwrap();
    client
        .insert_json(
            schema::TICKETS,
            json!([
                { "id": 500, "status": 1, "queueID": 3, "companyID": 100, "dueDateTime": "2024-03-05T17:00:00Z" },
                { "id": 501, "status": 5, "queueID": 3, "companyID": 200, "dueDateTime": null },
                { "id": 502, "status": 1, "queueID": 4, "companyID": 300, "dueDateTime": "2024-03-20T09:00:00+01:00" },
                { "id": 503, "status": 1, "queueID": 3, "companyID": null }
            ]),
        )
        .unwrap();
    client
        .insert_json(
            schema::CONTRACTS,
            json!([
                { "id": 70, "contractType": 1 },
                { "id": 71, "contractType": 3 }
            ]),
        )
        .unwrap();
    client
        .insert_json(
            schema::BILLING_ITEMS,
            json!([
                { "id": 9001, "timeEntryID": 1, "billingItemType": 1 },
                { "id": 9002, "timeEntryID": 4, "billingItemType": 6 },
                { "id": 9003, "timeEntryID": 5, "billingItemType": 2 }
            ]),
        )
        .unwrap();
    client.insert(schema::TIME_ENTRIES, service_desk_entries());
    client
}

pub(crate) fn service_desk_entries() -> Vec<Record> {
    vec![
        time_entry(1, json!({ "ticketID": 500, "contractID": 70 })),
        time_entry(2, json!({ "ticketID": 501, "contractID": 71 })),
        time_entry(3, json!({ "ticketID": 502 })),
        time_entry(4, json!({ "taskID": 1000, "contractID": 70 })),
        time_entry(5, json!({ "taskID": 1001 })),
        time_entry(6, json!({ "taskID": 1002, "contractID": 71 })),
        time_entry(7, json!({})),
        time_entry(8, json!({ "ticketID": 503 })),
    ]
}
