use serde::Serialize;
use std::time::Instant;

use crate::errors::GatewayError;

/// Snapshot de santé interne de la passerelle, exposé sur /system/health
#[derive(Debug, Serialize)]
pub struct GatewayHealth {
    pub uptime_seconds: u64,
    pub requests_served: u32,
    pub token_renewals: u32,
    pub upstream_failures: u32,
    pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    requests_served: std::sync::Arc<std::sync::atomic::AtomicU32>,
    token_renewals: std::sync::Arc<std::sync::atomic::AtomicU32>,
    upstream_failures: std::sync::Arc<std::sync::atomic::AtomicU32>,
    last_error: std::sync::Arc<parking_lot::Mutex<Option<String>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests_served: std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0)),
            token_renewals: std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0)),
            upstream_failures: std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0)),
            last_error: std::sync::Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    pub fn mark_request(&self) {
        self.requests_served.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn mark_token_renewal(&self) {
        self.token_renewals.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn mark_failure(&self, error: &GatewayError) {
        self.upstream_failures.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        *self.last_error.lock() = Some(error.to_string());
    }

    pub fn snapshot(&self) -> GatewayHealth {
        GatewayHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            requests_served: self.requests_served.load(std::sync::atomic::Ordering::Relaxed),
            token_renewals: self.token_renewals.load(std::sync::atomic::Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(std::sync::atomic::Ordering::Relaxed),
            last_error: self.last_error.lock().clone(),
        }
    }
}
