#![allow(dead_code)]

use std::time::Duration;

use esp32cam_capture::hardware::camera::{CameraManager, CaptureSettings, DrainSchedule};
use esp32cam_capture::hardware::mock::{MockFlashPin, MockMemory, MockSensor};

pub type MockCamera = CameraManager<MockSensor, MockFlashPin, MockMemory>;

/// テスト用の短いタイミング設定
pub fn fast_settings() -> CaptureSettings {
    CaptureSettings {
        min_capture_interval: Duration::ZERO,
        encoded_lock_timeout: Duration::from_secs(5),
        raw_lock_timeout: Duration::from_secs(5),
        max_attempts: 3,
        retry_base_delay: Duration::from_millis(10),
        retry_deadline: Duration::from_secs(5),
        first_attempt_settle: Duration::from_millis(1),
        retry_settle: Duration::from_millis(1),
        flash_warmup: Duration::from_millis(1),
        flash_stabilize: Duration::from_millis(1),
        pre_flash_drain: DrainSchedule::new(5, 0),
        post_flash_drain: DrainSchedule::new(3, 0),
        raw_drain: DrainSchedule::new(5, 0),
        teardown_drain: DrainSchedule::new(10, 0),
        drain_timeout: Duration::from_secs(1),
        ..CaptureSettings::default()
    }
}

/// Mockドライバ一式（ハンドルはカメラと状態を共有する）
pub struct Rig {
    pub sensor: MockSensor,
    pub flash: MockFlashPin,
    pub memory: MockMemory,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            sensor: MockSensor::new(),
            flash: MockFlashPin::new(4),
            memory: MockMemory::default(),
        }
    }

    pub fn with_sensor(sensor: MockSensor) -> Self {
        Self {
            sensor,
            ..Self::new()
        }
    }

    pub fn camera(&self, settings: CaptureSettings) -> MockCamera {
        CameraManager::new(
            self.sensor.clone(),
            self.flash.clone(),
            self.memory.clone(),
            settings,
        )
    }

    /// 初期化済みのカメラ
    pub fn ready_camera(&self, settings: CaptureSettings) -> MockCamera {
        let camera = self.camera(settings);
        camera.initialize_default().expect("mock camera should initialize");
        camera
    }

    /// 取得したフレームがすべて一度だけ返却されたか
    pub fn assert_frames_balanced(&self) {
        assert_eq!(self.sensor.outstanding_count(), 0, "frames still held");
        assert_eq!(
            self.sensor.acquired_count(),
            self.sensor.released_count(),
            "acquire/release mismatch"
        );
        assert_eq!(self.sensor.double_release_count(), 0, "frame released twice");
    }
}
