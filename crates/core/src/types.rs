/// Aggregate and child entity identifiers are random UUIDs.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Actor recorded in audit fields when the caller does not name one.
pub const SYSTEM_USER: &str = "system";

/// Resolve an optional actor to the value stored in audit fields.
pub fn actor_or_system(actor: Option<&str>) -> String {
    actor
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(SYSTEM_USER)
        .to_string()
}
