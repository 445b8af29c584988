//! Batch driver
//!
//! Runs the [`ExtractionWorker`] over every image of a request with bounded
//! concurrency. Completion order is free; the result order always matches the
//! input order.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::info;

use crate::models::{BatchResult, ImageItem, ScanContext};
use crate::services::extraction_worker::ExtractionWorker;

/// Request-level precondition failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("No images submitted")]
    NoImages,
}

pub struct BatchCoordinator {
    worker: Arc<ExtractionWorker>,
    max_concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(worker: Arc<ExtractionWorker>, max_concurrency: usize) -> Self {
        Self {
            worker,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Process every image; per-image failures land in the outcomes
    ///
    /// Fails only when `images` is empty, before any extraction starts.
    /// Takes its inputs by value so the returned future is `Send` and can be
    /// driven from an axum handler.
    pub async fn process_batch(
        &self,
        images: Vec<ImageItem>,
        context: ScanContext,
    ) -> Result<BatchResult, BatchError> {
        if images.is_empty() {
            return Err(BatchError::NoImages);
        }

        let image_count = images.len();
        info!(
            user_id = context.user_id,
            images = image_count,
            room = context.room_number.as_deref().unwrap_or(""),
            detail = context.detail.as_str(),
            "Processing scan batch"
        );

        let context = Arc::new(context);
        let worker = self.worker.clone();
        let batch_context = context.clone();

        // Each future owns its image; `buffered` keeps input order
        let outcomes = stream::iter(images)
            .map(move |image| {
                let worker = worker.clone();
                let context = batch_context.clone();
                async move { worker.process(&image, &context).await }
            })
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;

        let result = BatchResult::from_outcomes(outcomes);

        info!(
            user_id = context.user_id,
            images = image_count,
            persisted = result.persisted_count(),
            failed = result.had_error,
            "Scan batch finished"
        );

        Ok(result)
    }
}
