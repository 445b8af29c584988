//! Single-image processing
//!
//! extract → normalize → derive URL → persist → broadcast
//!
//! Every failure is folded into the returned [`ExtractionOutcome`]; nothing
//! here propagates an error to the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::{NewAssetTag, TagStore};
use crate::models::{ExtractionOutcome, ImageItem, OutcomeError, ScanContext};
use crate::services::asset_url::build_asset_url_with;
use crate::services::subscription_registry::SubscriptionRegistry;
use crate::services::tag_normalizer::normalize_tag;
use crate::services::vision_client::{ExtractionError, TagExtractor, TAG_INSTRUCTION};

/// Processes one image at a time; cheap to share across concurrent tasks
pub struct ExtractionWorker {
    extractor: Arc<dyn TagExtractor>,
    store: Arc<dyn TagStore>,
    registry: Arc<SubscriptionRegistry>,
    timeout: Duration,
    url_template: String,
}

impl ExtractionWorker {
    pub fn new(
        extractor: Arc<dyn TagExtractor>,
        store: Arc<dyn TagStore>,
        registry: Arc<SubscriptionRegistry>,
        timeout: Duration,
        url_template: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            store,
            registry,
            timeout,
            url_template: url_template.into(),
        }
    }

    /// Process one image
    pub async fn process(&self, image: &ImageItem, context: &ScanContext) -> ExtractionOutcome {
        let image_name = image.filename.as_deref().unwrap_or("<unnamed>");

        let raw_text = match self.extract_with_timeout(image, context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    image = image_name,
                    user_id = context.user_id,
                    error = %e,
                    "Tag extraction failed"
                );
                return ExtractionOutcome::extraction_failed(OutcomeError::extraction(
                    e.code(),
                    e.to_string(),
                ));
            }
        };

        let normalized_tag = normalize_tag(&raw_text);
        let asset_url = build_asset_url_with(&self.url_template, normalized_tag.as_deref());

        let (Some(tag), Some(url)) = (normalized_tag.clone(), asset_url.clone()) else {
            debug!(image = image_name, raw = %raw_text.trim(), "No asset tag in model output");
            return ExtractionOutcome {
                raw_text,
                normalized_tag: None,
                asset_url: None,
                persisted: false,
                error: None,
            };
        };

        let new_tag = NewAssetTag {
            asset_tag: tag,
            asset_url: url,
            scanned_at: Utc::now(),
            source_image_name: image.filename.clone(),
            owner_user_id: context.user_id,
            owner_email: context.user_email.clone(),
            room_number: context.room_number.clone(),
        };

        match self.store.insert(new_tag).await {
            Ok(record) => {
                info!(
                    record_id = record.id,
                    asset_tag = %record.asset_tag,
                    user_id = record.owner_user_id,
                    "Asset tag stored"
                );
                self.registry.broadcast(&record);
                ExtractionOutcome {
                    raw_text,
                    normalized_tag,
                    asset_url,
                    persisted: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!(
                    image = image_name,
                    user_id = context.user_id,
                    error = %e,
                    "Asset tag extracted but not stored"
                );
                ExtractionOutcome {
                    raw_text,
                    normalized_tag,
                    asset_url,
                    persisted: false,
                    error: Some(OutcomeError::persistence(e.code(), e.to_string())),
                }
            }
        }
    }

    async fn extract_with_timeout(
        &self,
        image: &ImageItem,
        context: &ScanContext,
    ) -> Result<String, ExtractionError> {
        tokio::time::timeout(
            self.timeout,
            self.extractor.extract(image, TAG_INSTRUCTION, context.detail),
        )
        .await
        .map_err(|_| ExtractionError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PersistenceError;
    use crate::models::{DetailLevel, ErrorKind};
    use crate::services::subscription_registry::SubscriptionScope;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tagscan_common::{AssetTagRecord, TagEvent};

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedExtractor(Reply);

    #[async_trait]
    impl TagExtractor for ScriptedExtractor {
        async fn extract(
            &self,
            _image: &ImageItem,
            _instruction: &str,
            _detail: DetailLevel,
        ) -> Result<String, ExtractionError> {
            match self.0 {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(ExtractionError::Api(503, "overloaded".to_string())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        fail: bool,
        rows: Mutex<Vec<NewAssetTag>>,
    }

    #[async_trait]
    impl TagStore for MemoryStore {
        async fn insert(&self, tag: NewAssetTag) -> Result<AssetTagRecord, PersistenceError> {
            if self.fail {
                return Err(PersistenceError::InvalidRow("disk full".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            rows.push(tag.clone());
            Ok(AssetTagRecord {
                id: rows.len() as i64,
                asset_tag: tag.asset_tag,
                asset_url: tag.asset_url,
                scanned_at: tag.scanned_at,
                source_image_name: tag.source_image_name,
                owner_user_id: tag.owner_user_id,
                owner_email: tag.owner_email,
                room_number: tag.room_number,
            })
        }
    }

    fn context() -> ScanContext {
        ScanContext {
            user_id: 11,
            user_email: "eleven@example.test".to_string(),
            room_number: Some("Lab 3".to_string()),
            detail: DetailLevel::Auto,
        }
    }

    fn image() -> ImageItem {
        ImageItem::new(vec![1, 2, 3], "image/png", Some("label.png".to_string()))
    }

    fn worker(reply: Reply, store: Arc<MemoryStore>, registry: Arc<SubscriptionRegistry>) -> ExtractionWorker {
        ExtractionWorker::new(
            Arc::new(ScriptedExtractor(reply)),
            store,
            registry,
            Duration::from_millis(50),
            "https://example.test/{tag}",
        )
    }

    #[tokio::test]
    async fn test_tag_stored_and_broadcast() {
        let store = Arc::new(MemoryStore::default());
        let registry = Arc::new(SubscriptionRegistry::new(8));
        let (ch, mut rx) = registry.open_channel();
        registry.subscribe(SubscriptionScope::User(11), ch);

        let outcome = worker(Reply::Text(" \"00123\" "), store.clone(), registry)
            .process(&image(), &context())
            .await;

        assert_eq!(outcome.raw_text, " \"00123\" ");
        assert_eq!(outcome.normalized_tag.as_deref(), Some("00123"));
        assert_eq!(outcome.asset_url.as_deref(), Some("https://example.test/000000000123"));
        assert!(outcome.persisted);
        assert!(outcome.error.is_none());

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].room_number.as_deref(), Some("Lab 3"));
        assert_eq!(rows[0].source_image_name.as_deref(), Some("label.png"));
        assert_eq!(rows[0].owner_email, "eleven@example.test");

        match rx.try_recv() {
            Ok(TagEvent::NewTag { tag }) => assert_eq!(tag.asset_tag, "00123"),
            other => panic!("expected newTag, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_tag_is_not_an_error() {
        let store = Arc::new(MemoryStore::default());
        let outcome = worker(Reply::Text("I cannot see a tag"), store.clone(), Arc::new(SubscriptionRegistry::new(8)))
            .process(&image(), &context())
            .await;

        assert_eq!(outcome.raw_text, "I cannot see a tag");
        assert!(outcome.normalized_tag.is_none());
        assert!(outcome.asset_url.is_none());
        assert!(!outcome.persisted);
        assert!(outcome.error.is_none());
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capability_failure_recorded() {
        let outcome = worker(Reply::Fail, Arc::new(MemoryStore::default()), Arc::new(SubscriptionRegistry::new(8)))
            .process(&image(), &context())
            .await;

        assert_eq!(outcome.raw_text, "");
        let error = outcome.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Extraction);
        assert_eq!(error.code, "API_ERROR");
    }

    #[tokio::test]
    async fn test_hanging_capability_times_out() {
        let outcome = worker(Reply::Hang, Arc::new(MemoryStore::default()), Arc::new(SubscriptionRegistry::new(8)))
            .process(&image(), &context())
            .await;

        assert_eq!(outcome.raw_text, "");
        assert_eq!(outcome.error.unwrap().code, "TIMEOUT");
    }

    #[tokio::test]
    async fn test_persistence_failure_suppresses_broadcast() {
        let store = Arc::new(MemoryStore { fail: true, ..Default::default() });
        let registry = Arc::new(SubscriptionRegistry::new(8));
        let (ch, mut rx) = registry.open_channel();
        registry.subscribe(SubscriptionScope::All, ch);

        let outcome = worker(Reply::Text("4521"), store, registry)
            .process(&image(), &context())
            .await;

        assert_eq!(outcome.normalized_tag.as_deref(), Some("4521"));
        assert!(outcome.asset_url.is_some());
        assert!(!outcome.persisted);
        assert_eq!(outcome.error.unwrap().kind, ErrorKind::Persistence);
        assert!(rx.try_recv().is_err());
    }
}
