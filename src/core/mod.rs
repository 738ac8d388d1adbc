/// コアシステムモジュール
pub mod capture_task;
pub mod config;
pub mod config_validation;
pub mod uploader;

pub use capture_task::{CaptureReport, CaptureTask, TaskError};
pub use config::{AppConfig, ConfigError};
pub use uploader::{ImageUploader, StreamUploader, UploadError};
