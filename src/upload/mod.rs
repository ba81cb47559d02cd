pub mod image;
pub mod manager;

pub use image::{load_image, AttachedImage, AttachmentId, UploadStatus, MAX_RETURN_IMAGE_BYTES};
pub use manager::{ImageGateway, UploadManager};
