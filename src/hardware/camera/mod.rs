/// カメラ制御モジュール
///
/// - センサー・GPIO・メモリの抽象化 (`driver`)
/// - バッファ破棄・フラッシュ制御・リトライ・排他制御の部品
/// - それらをまとめる `CameraManager`
pub mod config;
pub mod drain;
pub mod driver;
pub mod error;
pub mod flash;
pub mod frame;
pub mod lock;
pub mod manager;
pub mod retry;
pub mod status;

pub use config::{CameraConfig, CaptureSettings, DrainSchedule, FrameSize, PixelFormat, SensorTuning};
pub use driver::{FrameBuffer, PinDriver, PinError, PinLevel, SensorDriver, SensorError, SensorStatus};
pub use error::{CameraError, CameraResult, TimeoutKind};
pub use frame::CapturedFrame;
pub use manager::CameraManager;
pub use status::{CameraStatus, DiagnosticReport};
