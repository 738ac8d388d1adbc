/// センサー・GPIOドライバの抽象化
///
/// このトレイトを実装することで、実機用 (ESP-IDF) とテスト用 (Mock) の
/// 実装を切り替えることができます。
use super::config::{CameraConfig, FrameSize, PixelFormat, SensorTuning};
use crate::hardware::memory::MemoryTier;

/// センサードライバのエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor init failed: {0}")]
    InitFailed(String),
    #[error("sensor configuration failed: {0}")]
    ConfigFailed(String),
    #[error("sensor deinit failed: {0}")]
    DeinitFailed(String),
}

/// GPIO制御のエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("GPIO{pin} write failed: {message}")]
pub struct PinError {
    pub pin: u8,
    pub message: String,
}

/// ピンの出力レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl From<bool> for PinLevel {
    fn from(active: bool) -> Self {
        if active {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

/// ドライバが所有するフレームバッファ
pub trait FrameBuffer: Send {
    /// ドライバが報告するバイト数
    fn len(&self) -> usize;

    /// 画像データ（ドライバがポインタを返さなかった場合は `None`）
    fn data(&self) -> Option<&[u8]>;

    fn format(&self) -> PixelFormat;

    fn width(&self) -> u16;

    fn height(&self) -> u16;

    /// 撮影成功とみなせるか: 長さが正、かつデータが存在する
    fn is_valid(&self) -> bool {
        self.len() > 0 && self.data().is_some_and(|d| !d.is_empty())
    }
}

/// 診断用のセンサーレジスタ状態
#[derive(Debug, Clone, PartialEq)]
pub struct SensorStatus {
    pub frame_size: Option<FrameSize>,
    pub quality: u8,
    pub brightness: i8,
    pub contrast: i8,
    pub saturation: i8,
}

/// イメージセンサードライバ
///
/// ハードウェアへのアクセスは `CameraManager` の排他トークン保持中にのみ行われる。
pub trait SensorDriver: Send + Sync {
    type Frame: FrameBuffer;

    /// ドライバを初期化する。`fb_location` はフレームバッファを置くメモリ層
    fn init(&self, config: &CameraConfig, fb_location: MemoryTier) -> Result<(), SensorError>;

    fn configure(
        &self,
        format: PixelFormat,
        frame_size: FrameSize,
        quality: u8,
    ) -> Result<(), SensorError>;

    fn apply_tuning(&self, tuning: &SensorTuning) -> Result<(), SensorError>;

    /// 次のフレームを取得（ノンブロッキングまたは短時間ブロック）
    fn acquire_frame(&self) -> Option<Self::Frame>;

    /// パイプラインに溜まっているフレームをノンブロッキングで取り出す（バッファ破棄用）
    fn poll_buffered_frame(&self) -> Option<Self::Frame> {
        self.acquire_frame()
    }

    /// フレームをドライバへ返却
    fn release_frame(&self, frame: Self::Frame);

    fn sensor_id(&self) -> Option<u16>;

    fn status(&self) -> Option<SensorStatus>;

    fn deinit(&self) -> Result<(), SensorError>;
}

/// フラッシュLEDなどの出力ピン
pub trait PinDriver: Send + Sync {
    fn set_level(&self, level: PinLevel) -> Result<(), PinError>;
}
