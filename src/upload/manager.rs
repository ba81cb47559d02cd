use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinSet;

use crate::api::images::PresignedUpload;
use crate::api::ImagesApi;
use crate::error::{AppError, AppResult};

use super::image::{load_image, AttachedImage, AttachmentId, UploadStatus, MAX_RETURN_IMAGE_BYTES};

/// Seam between the upload pipeline and the backend/storage pair
#[async_trait]
pub trait ImageGateway: Send + Sync + 'static {
    async fn presign(&self, image_type: &str, file_name: &str) -> AppResult<PresignedUpload>;
    async fn put(&self, url: &str, data: Bytes, content_type: &str) -> AppResult<()>;
}

#[async_trait]
impl ImageGateway for ImagesApi {
    async fn presign(&self, image_type: &str, file_name: &str) -> AppResult<PresignedUpload> {
        self.presign_upload(image_type, file_name).await
    }

    async fn put(&self, url: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        self.upload_direct(url, data, content_type).await
    }
}

/// Tracks the images attached to one form and drives their uploads.
/// Images upload concurrently and settle independently; a form may only
/// submit while every attached image is in `Success`.
pub struct UploadManager<G: ImageGateway> {
    gateway: Arc<G>,
    image_type: String,
    max_bytes: u64,
    max_images: usize,
    images: Vec<AttachedImage>,
}

impl UploadManager<ImagesApi> {
    /// Return flow: exactly one evidence photo, 10 MB cap
    pub fn for_return_evidence(api: ImagesApi) -> Self {
        Self::new(api, "RETURN_EVIDENCE", MAX_RETURN_IMAGE_BYTES, 1)
    }

    /// Unit registration: a grid of photos
    pub fn for_unit_registration(api: ImagesApi, max_images: usize) -> Self {
        Self::new(api, "UNIT_PHOTO", MAX_RETURN_IMAGE_BYTES, max_images)
    }
}

impl<G: ImageGateway> UploadManager<G> {
    pub fn new(gateway: G, image_type: &str, max_bytes: u64, max_images: usize) -> Self {
        Self {
            gateway: Arc::new(gateway),
            image_type: image_type.to_string(),
            max_bytes,
            max_images,
            images: Vec::new(),
        }
    }

    /// Attach a local file. Validation failures surface here, before any
    /// network traffic.
    pub fn attach(&mut self, path: &Path) -> AppResult<AttachmentId> {
        if self.images.len() >= self.max_images {
            return Err(AppError::Validation(format!(
                "at most {} images allowed",
                self.max_images
            )));
        }
        let image = load_image(path, self.max_bytes)?;
        let id = image.id;
        self.images.push(image);
        Ok(id)
    }

    /// Drop an image; its preview bytes are freed with it
    pub fn remove(&mut self, id: AttachmentId) -> bool {
        let before = self.images.len();
        self.images.retain(|i| i.id != id);
        self.images.len() != before
    }

    /// Re-select the file behind a failed (or pending) image. The slot
    /// keeps its id and returns to `Pending`; other images are untouched.
    pub fn replace(&mut self, id: AttachmentId, path: &Path) -> AppResult<()> {
        let slot = self
            .images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::Validation("unknown attachment".to_string()))?;
        let mut image = load_image(path, self.max_bytes)?;
        image.id = id;
        *slot = image;
        Ok(())
    }

    pub fn images(&self) -> &[AttachedImage] {
        &self.images
    }

    pub fn get(&self, id: AttachmentId) -> Option<&AttachedImage> {
        self.images.iter().find(|i| i.id == id)
    }

    /// True when every attached image uploaded; gates form submission
    pub fn all_succeeded(&self) -> bool {
        !self.images.is_empty() && self.images.iter().all(|i| i.status == UploadStatus::Success)
    }

    pub fn successful_keys(&self) -> Vec<String> {
        self.images.iter().filter_map(|i| i.key.clone()).collect()
    }

    /// Storage key for single-image forms (the return flow)
    pub fn single_key(&self) -> Option<&str> {
        match self.images.as_slice() {
            [only] if only.status == UploadStatus::Success => only.key.as_deref(),
            _ => None,
        }
    }

    /// Upload every image not yet in `Success`, concurrently. Each task
    /// requests a presigned URL then PUTs the bytes straight to storage;
    /// settlements are reconciled by attachment id, in whatever order
    /// they arrive.
    pub async fn upload_all(&mut self) {
        let mut tasks: JoinSet<(AttachmentId, AppResult<String>)> = JoinSet::new();

        for image in &mut self.images {
            if image.status == UploadStatus::Success {
                continue;
            }
            image.status = UploadStatus::Uploading;
            let gateway = self.gateway.clone();
            let image_type = self.image_type.clone();
            let id = image.id;
            let file_name = image.file_name.clone();
            let content_type = image.content_type.clone();
            let data = image.data.clone();
            tasks.spawn(async move {
                let result = async {
                    let grant = gateway.presign(&image_type, &file_name).await?;
                    gateway.put(&grant.url, data, &content_type).await?;
                    Ok(grant.key)
                }
                .await;
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (id, result) = match joined {
                Ok(settled) => settled,
                Err(e) => {
                    tracing::error!("upload task panicked: {}", e);
                    continue;
                }
            };
            if let Some(image) = self.images.iter_mut().find(|i| i.id == id) {
                match result {
                    Ok(key) => {
                        tracing::debug!("upload succeeded: id={} key={}", id, key);
                        image.key = Some(key);
                        image.status = UploadStatus::Success;
                    }
                    Err(e) => {
                        tracing::warn!("upload failed: id={} error={}", id, e);
                        image.status = UploadStatus::Error(e.user_message().to_string());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeGateway {
        presign_calls: AtomicUsize,
        put_calls: AtomicUsize,
        fail_file: Option<String>,
    }

    #[async_trait]
    impl ImageGateway for FakeGateway {
        async fn presign(&self, _image_type: &str, file_name: &str) -> AppResult<PresignedUpload> {
            self.presign_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PresignedUpload {
                key: format!("uploads/{}", file_name),
                url: format!("https://storage.example/{}", file_name),
            })
        }

        async fn put(&self, url: &str, _data: Bytes, _content_type: &str) -> AppResult<()> {
            self.put_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(fail) = &self.fail_file {
                if url.ends_with(fail.as_str()) {
                    return Err(AppError::Upload("storage rejected the object".to_string()));
                }
            }
            Ok(())
        }
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    fn manager(gateway: FakeGateway, max_bytes: u64, max_images: usize) -> UploadManager<FakeGateway> {
        UploadManager::new(gateway, "UNIT_PHOTO", max_bytes, max_images)
    }

    #[tokio::test]
    async fn test_oversize_rejected_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "big.jpg", &[0u8; 64]);
        let mut manager = manager(FakeGateway::default(), 32, 4);

        let result = manager.attach(&path);
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(manager.gateway.presign_calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.gateway.put_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_settle_independently() {
        let dir = tempfile::tempdir().unwrap();
        let ok_path = write_file(&dir, "front.jpg", b"front");
        let bad_path = write_file(&dir, "back.jpg", b"back");
        let gateway = FakeGateway {
            fail_file: Some("back.jpg".to_string()),
            ..Default::default()
        };
        let mut manager = manager(gateway, 1024, 4);

        let ok_id = manager.attach(&ok_path).unwrap();
        let bad_id = manager.attach(&bad_path).unwrap();
        manager.upload_all().await;

        assert_eq!(manager.get(ok_id).unwrap().status, UploadStatus::Success);
        assert!(matches!(manager.get(bad_id).unwrap().status, UploadStatus::Error(_)));
        assert!(!manager.all_succeeded());
    }

    #[tokio::test]
    async fn test_retry_failed_image_leaves_successful_one_alone() {
        let dir = tempfile::tempdir().unwrap();
        let ok_path = write_file(&dir, "front.jpg", b"front");
        let bad_path = write_file(&dir, "back.jpg", b"back");
        let fixed_path = write_file(&dir, "back2.jpg", b"back-retake");
        let gateway = FakeGateway {
            fail_file: Some("back.jpg".to_string()),
            ..Default::default()
        };
        let mut manager = manager(gateway, 1024, 4);

        let ok_id = manager.attach(&ok_path).unwrap();
        let bad_id = manager.attach(&bad_path).unwrap();
        manager.upload_all().await;
        assert!(!manager.all_succeeded());
        let puts_after_first_round = manager.gateway.put_calls.load(Ordering::SeqCst);
        assert_eq!(puts_after_first_round, 2);

        manager.replace(bad_id, &fixed_path).unwrap();
        manager.upload_all().await;

        // only the replaced image went out again
        assert_eq!(manager.gateway.put_calls.load(Ordering::SeqCst), puts_after_first_round + 1);
        assert_eq!(manager.get(ok_id).unwrap().status, UploadStatus::Success);
        assert_eq!(manager.get(bad_id).unwrap().status, UploadStatus::Success);
        assert!(manager.all_succeeded());
        assert_eq!(manager.successful_keys().len(), 2);
    }

    #[tokio::test]
    async fn test_image_count_capped() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(&dir, "a.jpg", b"a");
        let second = write_file(&dir, "b.jpg", b"b");
        let mut manager = manager(FakeGateway::default(), 1024, 1);

        manager.attach(&first).unwrap();
        assert!(matches!(manager.attach(&second), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_single_key_for_return_flow() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "evidence.jpg", b"evidence");
        let mut manager = manager(FakeGateway::default(), 1024, 1);

        let id = manager.attach(&path).unwrap();
        assert_eq!(manager.single_key(), None);
        manager.upload_all().await;
        assert_eq!(manager.single_key(), Some("uploads/evidence.jpg"));
        assert!(manager.get(id).unwrap().key.is_some());
    }

    #[tokio::test]
    async fn test_remove_frees_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.jpg", b"a");
        let mut manager = manager(FakeGateway::default(), 1024, 1);

        let id = manager.attach(&path).unwrap();
        assert!(manager.remove(id));
        assert!(manager.images().is_empty());
        // the slot is reusable after removal
        manager.attach(&path).unwrap();
    }
}
