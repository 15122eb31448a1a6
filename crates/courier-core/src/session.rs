//! Session id generation

use rand::Rng;

/// New session id in the form `{epochMillis}-{six random digits}`
pub fn generate_session_id() -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    format!("{timestamp}-{random}")
}
