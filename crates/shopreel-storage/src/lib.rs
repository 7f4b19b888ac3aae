//! Aliyun OSS storage client.
//!
//! OSS speaks the S3 API, so uploads go through `aws-sdk-s3` with
//! virtual-hosted addressing. Objects are public-read and addressed as
//! `https://{bucket}.{region}.aliyuncs.com/{key}`, which is the URL handed
//! to downstream providers (TTS audio for VideoRetalk, user uploads).

pub mod client;
pub mod config;
pub mod error;
pub mod keys;

pub use client::OssClient;
pub use config::OssConfig;
pub use error::{StorageError, StorageResult};
pub use keys::{content_type_for, generated_audio_key, upload_key, MediaKind};
