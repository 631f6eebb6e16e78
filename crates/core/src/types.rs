/// All timestamps are local wall-clock time, matching the portal's own dates.
pub type Timestamp = chrono::DateTime<chrono::Local>;

/// One output record: field name to scalar value, in server field order.
pub type NormalizedRow = serde_json::Map<String, serde_json::Value>;
