/// カメラ設定の型定義
///
/// - センサー初期化パラメータ (`CameraConfig`)
/// - 初期化時に書き込むレジスタ設定 (`SensorTuning`)
/// - キャプチャ処理のタイミング・サイズ定数 (`CaptureSettings`)
use std::time::Duration;

/// JPEG品質の上限値（esp32-camera の仕様: 0-63、小さいほど高品質）
pub const MAX_JPEG_QUALITY: u8 = 63;

/// ピクセルフォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Jpeg,
    Rgb565,
    Yuv422,
    Grayscale,
}

impl PixelFormat {
    /// 設定ファイル上の名前から変換
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "JPEG" => Some(PixelFormat::Jpeg),
            "RGB565" => Some(PixelFormat::Rgb565),
            "YUV422" => Some(PixelFormat::Yuv422),
            "GRAYSCALE" => Some(PixelFormat::Grayscale),
            _ => None,
        }
    }
}

/// フレームサイズ（解像度）
///
/// 並び順は esp32-camera の `framesize_t` と同じく小さい順。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameSize {
    Qqvga,
    Qcif,
    Hqvga,
    Qvga,
    Cif,
    Hvga,
    Vga,
    Svga,
    Xga,
    Hd,
    Sxga,
    Uxga,
}

impl FrameSize {
    /// 設定ファイル上の名前から変換
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "QQVGA" => Some(FrameSize::Qqvga),
            "QCIF" => Some(FrameSize::Qcif),
            "HQVGA" => Some(FrameSize::Hqvga),
            "QVGA" => Some(FrameSize::Qvga),
            "CIF" => Some(FrameSize::Cif),
            "HVGA" => Some(FrameSize::Hvga),
            "VGA" => Some(FrameSize::Vga),
            "SVGA" => Some(FrameSize::Svga),
            "XGA" => Some(FrameSize::Xga),
            "HD" => Some(FrameSize::Hd),
            "SXGA" => Some(FrameSize::Sxga),
            "UXGA" => Some(FrameSize::Uxga),
            _ => None,
        }
    }

    /// 解像度 (幅, 高さ)
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Hvga => (480, 320),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Hd => (1280, 720),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }

    /// PSRAMなしでは厳しい大きさか（VGA超）
    pub fn is_large(&self) -> bool {
        *self > FrameSize::Vga
    }
}

/// センサー初期化パラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub pixel_format: PixelFormat,
    pub frame_size: FrameSize,
    /// JPEG品質 (0-63)
    pub jpeg_quality: u8,
    /// ドライバが確保するフレームバッファ数
    pub fb_count: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Jpeg,
            frame_size: FrameSize::Qvga,
            jpeg_quality: 12,
            fb_count: 1,
        }
    }
}

impl CameraConfig {
    pub fn with_frame_size(mut self, frame_size: FrameSize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_quality(mut self, jpeg_quality: u8) -> Self {
        self.jpeg_quality = jpeg_quality;
        self
    }

    pub fn with_fb_count(mut self, fb_count: u8) -> Self {
        self.fb_count = fb_count;
        self
    }

    /// パラメータ範囲の検証
    pub fn validate(&self) -> Result<(), String> {
        if self.jpeg_quality > MAX_JPEG_QUALITY {
            return Err(format!(
                "jpeg_quality must be 0-{}: {}",
                MAX_JPEG_QUALITY, self.jpeg_quality
            ));
        }
        if self.fb_count == 0 {
            return Err("fb_count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// 初期化時にセンサーへ書き込む画質設定
///
/// 自動制御は有効のまま、不安定な機能 (AEC2, BPC) は無効にした
/// バランス重視の値がデフォルト。
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTuning {
    pub gain_ctrl: bool,
    pub exposure_ctrl: bool,
    pub aec2: bool,
    pub ae_level: i8,
    pub agc_gain: u8,
    pub aec_value: u16,
    pub brightness: i8,
    pub contrast: i8,
    pub saturation: i8,
    pub whitebal: bool,
    pub awb_gain: bool,
    pub wb_mode: u8,
    pub dcw: bool,
    pub bpc: bool,
    pub wpc: bool,
    pub lenc: bool,
    pub special_effect: u8,
    pub hmirror: bool,
    pub vflip: bool,
}

impl Default for SensorTuning {
    fn default() -> Self {
        Self {
            gain_ctrl: true,
            exposure_ctrl: true,
            aec2: false,
            ae_level: 0,
            agc_gain: 6,
            aec_value: 400,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            whitebal: true,
            awb_gain: true,
            wb_mode: 0,
            dcw: true,
            bpc: false,
            wpc: true,
            lenc: true,
            special_effect: 0,
            hmirror: false,
            vflip: false,
        }
    }
}

/// バッファ破棄の回数と間隔
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrainSchedule {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl DrainSchedule {
    pub const fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

/// キャプチャ処理のタイミングとメモリ戦略の定数
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// 連続キャプチャの最小間隔
    pub min_capture_interval: Duration,
    /// エンコード付きキャプチャのロック待ち上限
    pub encoded_lock_timeout: Duration,
    /// RAWキャプチャ・フラッシュ操作・終了処理のロック待ち上限
    pub raw_lock_timeout: Duration,
    pub max_attempts: u32,
    /// リトライ間隔の基準値（試行ごとに2倍）
    pub retry_base_delay: Duration,
    /// リトライ全体の制限時間
    pub retry_deadline: Duration,
    /// 初回試行前の待機
    pub first_attempt_settle: Duration,
    /// 2回目以降の試行前の待機
    pub retry_settle: Duration,
    pub flash_warmup: Duration,
    pub flash_stabilize: Duration,
    pub pre_flash_drain: DrainSchedule,
    pub post_flash_drain: DrainSchedule,
    pub raw_drain: DrainSchedule,
    pub teardown_drain: DrainSchedule,
    /// バッファ破棄ループの制限時間
    pub drain_timeout: Duration,
    /// これを超えるサイズはPSRAMを優先
    pub slow_pool_threshold: usize,
    /// base64の膨張率（理論値4/3より大きめ）
    pub expansion_factor: f32,
    pub safety_margin: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            min_capture_interval: Duration::from_millis(500),
            encoded_lock_timeout: Duration::from_secs(10),
            raw_lock_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            retry_deadline: Duration::from_secs(2),
            first_attempt_settle: Duration::from_millis(300),
            retry_settle: Duration::from_millis(100),
            flash_warmup: Duration::from_millis(200),
            flash_stabilize: Duration::from_millis(100),
            pre_flash_drain: DrainSchedule::new(5, 5),
            post_flash_drain: DrainSchedule::new(3, 10),
            raw_drain: DrainSchedule::new(5, 10),
            teardown_drain: DrainSchedule::new(10, 10),
            drain_timeout: Duration::from_secs(2),
            slow_pool_threshold: 8192,
            expansion_factor: 1.4,
            safety_margin: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_jpeg_qvga() {
        let config = CameraConfig::default();
        assert_eq!(config.pixel_format, PixelFormat::Jpeg);
        assert_eq!(config.frame_size, FrameSize::Qvga);
        assert_eq!(config.jpeg_quality, 12);
        assert_eq!(config.fb_count, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn quality_above_63_is_rejected() {
        let config = CameraConfig::default().with_quality(64);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_frame_buffers_is_rejected() {
        let config = CameraConfig::default().with_fb_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn frame_size_names_are_case_insensitive() {
        assert_eq!(FrameSize::from_name("svga"), Some(FrameSize::Svga));
        assert_eq!(FrameSize::from_name(" UXGA "), Some(FrameSize::Uxga));
        assert_eq!(FrameSize::from_name("8K"), None);
    }

    #[test]
    fn only_frames_above_vga_are_large() {
        assert!(!FrameSize::Vga.is_large());
        assert!(FrameSize::Svga.is_large());
        assert_eq!(FrameSize::Uxga.dimensions(), (1600, 1200));
    }
}
