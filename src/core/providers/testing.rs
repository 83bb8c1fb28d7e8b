//! Scripted backends for tests

use super::{BackendError, BackendResponse, ProviderBackend};
use crate::core::types::{RequestContext, StopReason};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Backend that always returns a clone of a fixed result and counts calls
pub struct FixedBackend {
    result: Result<BackendResponse, BackendError>,
    calls: AtomicU32,
}

impl FixedBackend {
    pub fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(BackendResponse {
                text: text.to_string(),
                input_tokens: 10,
                output_tokens: 20,
                stop_reason: StopReason::EndTurn,
            }),
            calls: AtomicU32::new(0),
        })
    }

    pub fn err(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProviderBackend for FixedBackend {
    async fn invoke(
        &self,
        _native_model: &str,
        _ctx: &RequestContext,
    ) -> Result<BackendResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.result.clone()
    }
}
