//! Entity and field names of the remote service used by the engine.

pub const TIME_ENTRIES: &str = "TimeEntries";
pub const TICKETS: &str = "Tickets";
pub const TASKS: &str = "Tasks";
pub const PROJECTS: &str = "Projects";
pub const COMPANIES: &str = "Companies";
pub const CONTRACTS: &str = "Contracts";
pub const BILLING_ITEMS: &str = "BillingItems";

pub const ID: &str = "id";

// TimeEntries
pub const TICKET_ID: &str = "ticketID";
pub const TASK_ID: &str = "taskID";
pub const CONTRACT_ID: &str = "contractID";
pub const RESOURCE_ID: &str = "resourceID";
pub const DATE_WORKED: &str = "dateWorked";
pub const HOURS_WORKED: &str = "hoursWorked";
pub const IS_NON_BILLABLE: &str = "isNonBillable";

// Tickets, Tasks
pub const STATUS: &str = "status";
pub const QUEUE_ID: &str = "queueID";
pub const DUE_DATE_TIME: &str = "dueDateTime";
pub const PROJECT_ID: &str = "projectID";

// Tickets, Projects, Companies
pub const COMPANY_ID: &str = "companyID";
pub const OWNER_RESOURCE_ID: &str = "ownerResourceID";

// Contracts
pub const CONTRACT_TYPE: &str = "contractType";

// BillingItems
pub const TIME_ENTRY_ID: &str = "timeEntryID";
pub const BILLING_ITEM_TYPE: &str = "billingItemType";

/// Fields of a time entry the engine needs to navigate relationships.
pub const TIME_ENTRY_CORE_FIELDS: [&str; 8] = [
    ID,
    TICKET_ID,
    TASK_ID,
    CONTRACT_ID,
    RESOURCE_ID,
    DATE_WORKED,
    HOURS_WORKED,
    IS_NON_BILLABLE,
];
