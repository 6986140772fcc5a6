/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// New opaque identifier (UUID v4, hyphenated)
///
/// Transaction ids double as the payment gateway reference, so they must
/// be unguessable and unique across restarts.
pub fn new_reference() -> String {
    uuid::Uuid::new_v4().to_string()
}
