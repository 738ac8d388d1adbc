use std::io;

use esp_idf_hal::gpio::OutputPin;
use esp_idf_svc::hal::peripherals::Peripherals;
use log::{error, info};

use esp32cam_capture::core::{AppConfig, CaptureTask, StreamUploader};
use esp32cam_capture::hardware::camera::CameraManager;
use esp32cam_capture::hardware::esp::{EspCameraSensor, EspFlashLed, HeapCapsPools};
use esp32cam_capture::hardware::CameraPins;

/// アプリケーションのメインエントリーポイント
fn main() -> anyhow::Result<()> {
    // ESP-IDFの基本初期化
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("ESP32-CAM capture v{}", esp32cam_capture::VERSION);

    // 設定ファイル読み込み
    let app_config = AppConfig::load().map_err(|e| {
        error!("設定ファイルの読み込みに失敗しました: {}", e);
        anyhow::anyhow!("設定ファイルの読み込みエラー: {}", e)
    })?;

    // ペリフェラルの初期化
    info!("ペリフェラルを初期化しています");
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // フラッシュLED（AI-Thinker ボードは GPIO4 固定）
    let flash = EspFlashLed::new(pins.gpio4.downgrade_output())?;

    let camera = CameraManager::new(
        EspCameraSensor::new(CameraPins::AI_THINKER),
        flash,
        HeapCapsPools,
        app_config.capture_settings(),
    );

    camera
        .initialize(&app_config.camera_config())
        .map_err(|e| anyhow::anyhow!("カメラ初期化に失敗: {}", e))?;
    camera.diagnostic();

    // 撮影した画像はシリアルコンソールへストリーミング
    let uploader = StreamUploader::new(io::stdout());
    let mut task = CaptureTask::new(&camera, uploader, app_config.capture_interval);
    task.run_forever()
}
