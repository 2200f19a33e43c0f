//! Response types for the API.

use lead_intake_core::{Lead, Timestamp};
use serde::Serialize;

/// Successful intake response: the affected rows as stored
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub success: bool,
    pub data: Vec<Lead>,
}

impl LeadResponse {
    pub fn new(data: Vec<Lead>) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub version: String,
}

impl HealthResponse {
    pub fn new(is_healthy: bool) -> Self {
        Self {
            status: if is_healthy {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            timestamp: Timestamp::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
