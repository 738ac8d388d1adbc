/// 定期撮影タスク
///
/// 撮影 → タイムスタンプ付与 → 引き渡し を一定周期で繰り返す。
/// 撮影や引き渡しに失敗してもログを残して次の周期へ進む。
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{error, info, warn};

use crate::core::uploader::{ImageUploader, UploadError};
use crate::hardware::camera::driver::{PinDriver, SensorDriver};
use crate::hardware::camera::error::CameraError;
use crate::hardware::camera::manager::CameraManager;
use crate::hardware::memory::{MemoryPools, MemoryTier};

/// タイムスタンプの書式
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 1周期分のエラー
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("撮影に失敗しました: {0}")]
    Capture(#[from] CameraError),
    #[error("画像が文字列として不正です: {0}")]
    InvalidImage(#[from] std::str::Utf8Error),
    #[error("画像の引き渡しに失敗しました: {0}")]
    Upload(#[from] UploadError),
}

/// 1周期の結果
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub timestamp: String,
    pub encoded_len: usize,
    pub tier: MemoryTier,
}

pub struct CaptureTask<'a, S, P, M, U>
where
    S: SensorDriver,
    P: PinDriver,
    M: MemoryPools,
    U: ImageUploader,
{
    camera: &'a CameraManager<S, P, M>,
    uploader: U,
    period: Duration,
}

impl<'a, S, P, M, U> CaptureTask<'a, S, P, M, U>
where
    S: SensorDriver,
    P: PinDriver,
    M: MemoryPools,
    U: ImageUploader,
{
    pub fn new(camera: &'a CameraManager<S, P, M>, uploader: U, period: Duration) -> Self {
        Self {
            camera,
            uploader,
            period,
        }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn into_uploader(self) -> U {
        self.uploader
    }

    /// 1回撮影して引き渡す
    pub fn run_once(&mut self) -> Result<CaptureReport, TaskError> {
        let image = self.camera.capture_encoded()?;
        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        self.uploader.upload(image.as_str()?, &timestamp)?;

        info!(
            "Image sent: {} bytes ({}, {})",
            image.len(),
            image.tier(),
            timestamp
        );
        Ok(CaptureReport {
            timestamp,
            encoded_len: image.len(),
            tier: image.tier(),
        })
    }

    /// 1周期分の処理。失敗はログに残して `None` を返す
    pub fn tick(&mut self) -> Option<CaptureReport> {
        match self.run_once() {
            Ok(report) => Some(report),
            Err(TaskError::Capture(e)) if e.is_capture_failure() => {
                warn!("撮影失敗、次の周期で再試行します: {}", e);
                None
            }
            Err(TaskError::Capture(CameraError::InvalidState(reason))) => {
                error!("カメラが使用できません: {}", reason);
                None
            }
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    /// 周期的に撮影を続ける（戻らない）
    pub fn run_forever(&mut self) -> ! {
        info!("撮影ループを開始します (周期 {} 秒)", self.period.as_secs());
        loop {
            let started = Instant::now();
            self.tick();

            if let Some(rest) = self.period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }
}
