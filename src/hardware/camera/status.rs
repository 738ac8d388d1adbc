use std::time::Duration;

use super::driver::SensorStatus;

/// カメラサブシステムの状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraStatus {
    pub initialized: bool,
    /// 内部DRAMの空き容量（バイト）
    pub free_fast_mem: usize,
    /// PSRAMの空き容量（バイト）
    pub free_slow_mem: usize,
    /// センサーのプロダクトID（OV2640 なら 0x26）
    pub sensor_id: Option<u16>,
}

/// 診断結果
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticReport {
    pub status: CameraStatus,
    pub slow_pool_available: bool,
    pub sensor: Option<SensorStatus>,
    /// バッファテストで取得できたフレームのバイト数。取得できなければ `None`
    pub buffer_test: Option<usize>,
    pub since_last_capture: Option<Duration>,
}

impl DiagnosticReport {
    pub fn buffer_test_passed(&self) -> bool {
        self.buffer_test.is_some()
    }
}
