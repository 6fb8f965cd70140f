use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,   // "ok" | "degraded"
    pub database: String, // "up" | "down"
    pub time: DateTime<Utc>,
}
