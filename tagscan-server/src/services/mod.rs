//! Scan pipeline services
//!
//! Leaves first:
//! - `tag_normalizer` / `asset_url`: pure functions
//! - `vision_client`: extraction capability
//! - `extraction_worker`: one image end to end
//! - `batch_coordinator`: ordered, failure-isolated batches
//! - `subscription_registry`: live listener fan-out

pub mod asset_url;
pub mod batch_coordinator;
pub mod extraction_worker;
pub mod subscription_registry;
pub mod tag_normalizer;
pub mod vision_client;

pub use batch_coordinator::{BatchCoordinator, BatchError};
pub use extraction_worker::ExtractionWorker;
pub use subscription_registry::{
    DeliveryError, DeliveryReport, ListenerChannel, SubscriptionRegistry, SubscriptionScope,
};
pub use vision_client::{ExtractionError, TagExtractor, VisionClient};
