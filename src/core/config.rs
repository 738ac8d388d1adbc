use std::time::Duration;

use crate::core::config_validation::{
    parse_frame_size, parse_pixel_format, validate_capture_interval, validate_fb_count,
    validate_jpeg_quality, validate_retry_count, ValidationError,
};
use crate::hardware::camera::config::{CameraConfig, CaptureSettings, FrameSize, PixelFormat};

/// アプリケーション設定
///
/// この構造体はビルド時に`cfg.toml`ファイルから読み込まれた設定を保持します。
/// ファイルが無い場合は各項目のデフォルト値が使われます。
#[toml_cfg::toml_config]
pub struct Config {
    #[default(30)]
    capture_interval_seconds: u64,

    #[default("JPEG")]
    pixel_format: &'static str,

    #[default("QVGA")]
    frame_size: &'static str,

    #[default(12)] // 0-63、小さいほど高品質
    jpeg_quality: u8,

    #[default(1)]
    fb_count: u8,

    #[default(500)]
    min_capture_interval_ms: u64,

    #[default(3)]
    max_capture_retries: u32,

    #[default(100)]
    retry_delay_ms: u64,

    #[default(2000)]
    retry_deadline_ms: u64,

    #[default(200)]
    flash_warmup_ms: u64,

    #[default(100)]
    flash_stabilize_ms: u64,

    #[default(8192)]
    psram_threshold_bytes: usize,
}

/// 設定エラー
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("frame_size が不明です: {0}")]
    InvalidFrameSize(String),
    #[error("pixel_format が不明です: {0}")]
    InvalidPixelFormat(String),
    #[error("jpeg_quality の値が無効です (0-63): {0}")]
    InvalidJpegQuality(u8),
    #[error("fb_count の値が無効です (1以上): {0}")]
    InvalidFrameBufferCount(u8),
    #[error("capture_interval_seconds の値が無効です (1以上): {0}")]
    InvalidCaptureInterval(u64),
    #[error("max_capture_retries の値が無効です (1-10): {0}")]
    InvalidRetryCount(u32),
}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownFrameSize(v) => ConfigError::InvalidFrameSize(v),
            ValidationError::UnknownPixelFormat(v) => ConfigError::InvalidPixelFormat(v),
            ValidationError::InvalidJpegQuality(v) => ConfigError::InvalidJpegQuality(v),
            ValidationError::InvalidFrameBufferCount(v) => ConfigError::InvalidFrameBufferCount(v),
            ValidationError::InvalidCaptureInterval(v) => ConfigError::InvalidCaptureInterval(v),
            ValidationError::InvalidRetryCount(v) => ConfigError::InvalidRetryCount(v),
        }
    }
}

/// アプリケーション設定を表す構造体
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 撮影周期
    pub capture_interval: Duration,

    /// ピクセルフォーマット
    pub pixel_format: PixelFormat,

    /// フレームサイズ
    pub frame_size: FrameSize,

    /// JPEG品質
    pub jpeg_quality: u8,

    /// フレームバッファ数
    pub fb_count: u8,

    /// 連続撮影の最小間隔（ミリ秒）
    pub min_capture_interval_ms: u64,

    /// 撮影リトライ回数
    pub max_capture_retries: u32,

    /// リトライ間隔の基準値（ミリ秒）
    pub retry_delay_ms: u64,

    /// リトライ全体の制限時間（ミリ秒）
    pub retry_deadline_ms: u64,

    /// フラッシュ点灯後の待機時間（ミリ秒）
    pub flash_warmup_ms: u64,

    /// 撮影直前の安定待ち（ミリ秒）
    pub flash_stabilize_ms: u64,

    /// PSRAMを優先する確保サイズの閾値（バイト）
    pub psram_threshold_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let camera = CameraConfig::default();
        let settings = CaptureSettings::default();
        Self {
            capture_interval: Duration::from_secs(30),
            pixel_format: camera.pixel_format,
            frame_size: camera.frame_size,
            jpeg_quality: camera.jpeg_quality,
            fb_count: camera.fb_count,
            min_capture_interval_ms: settings.min_capture_interval.as_millis() as u64,
            max_capture_retries: settings.max_attempts,
            retry_delay_ms: settings.retry_base_delay.as_millis() as u64,
            retry_deadline_ms: settings.retry_deadline.as_millis() as u64,
            flash_warmup_ms: settings.flash_warmup.as_millis() as u64,
            flash_stabilize_ms: settings.flash_stabilize.as_millis() as u64,
            psram_threshold_bytes: settings.slow_pool_threshold,
        }
    }
}

impl AppConfig {
    /// 設定ファイルから設定をロードします
    pub fn load() -> Result<Self, ConfigError> {
        // toml_cfg によって生成された定数
        let config = CONFIG;

        let capture_interval =
            Duration::from_secs(validate_capture_interval(config.capture_interval_seconds)?);

        // カメラ設定を取得・検証
        let pixel_format = parse_pixel_format(config.pixel_format)?;
        let frame_size = parse_frame_size(config.frame_size)?;
        let jpeg_quality = validate_jpeg_quality(config.jpeg_quality)?;
        let fb_count = validate_fb_count(config.fb_count)?;

        let max_capture_retries = validate_retry_count(config.max_capture_retries)?;

        Ok(AppConfig {
            capture_interval,
            pixel_format,
            frame_size,
            jpeg_quality,
            fb_count,
            min_capture_interval_ms: config.min_capture_interval_ms,
            max_capture_retries,
            retry_delay_ms: config.retry_delay_ms,
            retry_deadline_ms: config.retry_deadline_ms,
            flash_warmup_ms: config.flash_warmup_ms,
            flash_stabilize_ms: config.flash_stabilize_ms,
            psram_threshold_bytes: config.psram_threshold_bytes,
        })
    }

    /// センサー初期化パラメータ
    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            pixel_format: self.pixel_format,
            frame_size: self.frame_size,
            jpeg_quality: self.jpeg_quality,
            fb_count: self.fb_count,
        }
    }

    /// キャプチャ処理の設定（指定のない項目はデフォルト値）
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            min_capture_interval: Duration::from_millis(self.min_capture_interval_ms),
            max_attempts: self.max_capture_retries,
            retry_base_delay: Duration::from_millis(self.retry_delay_ms),
            retry_deadline: Duration::from_millis(self.retry_deadline_ms),
            flash_warmup: Duration::from_millis(self.flash_warmup_ms),
            flash_stabilize: Duration::from_millis(self.flash_stabilize_ms),
            slow_pool_threshold: self.psram_threshold_bytes,
            ..CaptureSettings::default()
        }
    }
}
