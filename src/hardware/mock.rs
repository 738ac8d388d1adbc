/// テスト用のハードウェアMock実装
///
/// 実機を使わずにセンサー・フラッシュピン・メモリプールをシミュレートします。
/// 呼び出し内容を記録し、テストで取得/返却の対応やピン操作の順序を検証できます。
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::hardware::camera::config::{
    CameraConfig, FrameSize, PixelFormat, SensorTuning,
};
use crate::hardware::camera::driver::{
    FrameBuffer, PinDriver, PinError, PinLevel, SensorDriver, SensorError, SensorStatus,
};
use crate::hardware::memory::{MemoryPools, MemoryTier};

/// OV2640 のプロダクトID
pub const MOCK_SENSOR_PID: u16 = 0x26;

/// 撮影1回分の結果
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// 正常なフレーム
    Valid(Vec<u8>),
    /// 長さ0のフレーム
    Empty,
    /// 長さはあるがデータポインタがないフレーム
    NullData(usize),
    /// フレームが取得できない
    Missing,
}

/// Mockセンサーが貸し出すフレーム
#[derive(Debug)]
pub struct MockFrame {
    id: u64,
    data: Option<Vec<u8>>,
    len: usize,
    format: PixelFormat,
    frame_size: FrameSize,
}

impl MockFrame {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl FrameBuffer for MockFrame {
    fn len(&self) -> usize {
        self.len
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn width(&self) -> u16 {
        self.frame_size.dimensions().0
    }

    fn height(&self) -> u16 {
        self.frame_size.dimensions().1
    }
}

#[derive(Debug)]
struct SensorState {
    next_id: u64,
    stale_frames: u32,
    script: VecDeque<FrameOutcome>,
    default_outcome: FrameOutcome,
    outstanding: HashSet<u64>,
    acquired: u32,
    released: u32,
    double_releases: u32,
    capture_calls: u32,
    init_calls: u32,
    deinit_calls: u32,
    fail_init: bool,
    fail_deinit: bool,
    fb_location: Option<MemoryTier>,
    config: Option<CameraConfig>,
    tuning: Option<SensorTuning>,
    sensor_id: Option<u16>,
}

/// Mockイメージセンサー
///
/// `clone()` したハンドルは同じ状態を共有するため、`CameraManager` に渡した後も
/// テスト側から記録を確認できます。
#[derive(Debug, Clone)]
pub struct MockSensor {
    state: Arc<Mutex<SensorState>>,
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSensor {
    /// 常に1KBのJPEG風フレームを返すMockセンサーを作成します
    pub fn new() -> Self {
        Self::with_default_outcome(FrameOutcome::Valid(sample_jpeg(1024)))
    }

    pub fn with_default_outcome(outcome: FrameOutcome) -> Self {
        Self {
            state: Arc::new(Mutex::new(SensorState {
                next_id: 0,
                stale_frames: 0,
                script: VecDeque::new(),
                default_outcome: outcome,
                outstanding: HashSet::new(),
                acquired: 0,
                released: 0,
                double_releases: 0,
                capture_calls: 0,
                init_calls: 0,
                deinit_calls: 0,
                fail_init: false,
                fail_deinit: false,
                fb_location: None,
                config: None,
                tuning: None,
                sensor_id: Some(MOCK_SENSOR_PID),
            })),
        }
    }

    /// テスト用: 撮影結果をキューに追加（先頭から消費され、空ならデフォルト）
    pub fn queue_outcome(&self, outcome: FrameOutcome) {
        self.state.lock().unwrap().script.push_back(outcome);
    }

    /// テスト用: 最初の `count` 回を失敗させる
    pub fn fail_next(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            state.script.push_back(FrameOutcome::Missing);
        }
    }

    /// テスト用: パイプラインに古いフレームを溜める
    pub fn queue_stale_frames(&self, count: u32) {
        self.state.lock().unwrap().stale_frames += count;
    }

    pub fn set_init_error(&self, enable: bool) {
        self.state.lock().unwrap().fail_init = enable;
    }

    pub fn set_deinit_error(&self, enable: bool) {
        self.state.lock().unwrap().fail_deinit = enable;
    }

    pub fn set_sensor_id(&self, id: Option<u16>) {
        self.state.lock().unwrap().sensor_id = id;
    }

    /// ドライバから取り出されたフレーム総数（破棄分を含む）
    pub fn acquired_count(&self) -> u32 {
        self.state.lock().unwrap().acquired
    }

    pub fn released_count(&self) -> u32 {
        self.state.lock().unwrap().released
    }

    /// 返却されていないフレーム数
    pub fn outstanding_count(&self) -> usize {
        self.state.lock().unwrap().outstanding.len()
    }

    pub fn double_release_count(&self) -> u32 {
        self.state.lock().unwrap().double_releases
    }

    /// 撮影（`acquire_frame`）の呼び出し回数
    pub fn capture_calls(&self) -> u32 {
        self.state.lock().unwrap().capture_calls
    }

    pub fn remaining_stale_frames(&self) -> u32 {
        self.state.lock().unwrap().stale_frames
    }

    pub fn init_calls(&self) -> u32 {
        self.state.lock().unwrap().init_calls
    }

    pub fn deinit_calls(&self) -> u32 {
        self.state.lock().unwrap().deinit_calls
    }

    pub fn fb_location(&self) -> Option<MemoryTier> {
        self.state.lock().unwrap().fb_location
    }

    pub fn applied_config(&self) -> Option<CameraConfig> {
        self.state.lock().unwrap().config.clone()
    }

    pub fn applied_tuning(&self) -> Option<SensorTuning> {
        self.state.lock().unwrap().tuning.clone()
    }

    fn lend(state: &mut SensorState, outcome: FrameOutcome) -> Option<MockFrame> {
        let (data, len) = match outcome {
            FrameOutcome::Valid(bytes) => {
                let len = bytes.len();
                (Some(bytes), len)
            }
            FrameOutcome::Empty => (Some(Vec::new()), 0),
            FrameOutcome::NullData(len) => (None, len),
            FrameOutcome::Missing => return None,
        };

        state.next_id += 1;
        let id = state.next_id;
        state.outstanding.insert(id);
        state.acquired += 1;

        let (format, frame_size) = state
            .config
            .as_ref()
            .map_or((PixelFormat::Jpeg, FrameSize::Qvga), |c| {
                (c.pixel_format, c.frame_size)
            });

        Some(MockFrame {
            id,
            data,
            len,
            format,
            frame_size,
        })
    }
}

impl SensorDriver for MockSensor {
    type Frame = MockFrame;

    fn init(&self, config: &CameraConfig, fb_location: MemoryTier) -> Result<(), SensorError> {
        let mut state = self.state.lock().unwrap();
        state.init_calls += 1;
        if state.fail_init {
            return Err(SensorError::InitFailed("Simulated init error".to_string()));
        }
        state.fb_location = Some(fb_location);
        state.config = Some(config.clone());
        Ok(())
    }

    fn configure(
        &self,
        format: PixelFormat,
        frame_size: FrameSize,
        quality: u8,
    ) -> Result<(), SensorError> {
        let mut state = self.state.lock().unwrap();
        let config = state.config.get_or_insert_with(CameraConfig::default);
        config.pixel_format = format;
        config.frame_size = frame_size;
        config.jpeg_quality = quality;
        Ok(())
    }

    fn apply_tuning(&self, tuning: &SensorTuning) -> Result<(), SensorError> {
        self.state.lock().unwrap().tuning = Some(tuning.clone());
        Ok(())
    }

    fn acquire_frame(&self) -> Option<MockFrame> {
        let mut state = self.state.lock().unwrap();
        state.capture_calls += 1;
        let outcome = state
            .script
            .pop_front()
            .unwrap_or_else(|| state.default_outcome.clone());
        Self::lend(&mut state, outcome)
    }

    fn poll_buffered_frame(&self) -> Option<MockFrame> {
        let mut state = self.state.lock().unwrap();
        if state.stale_frames == 0 {
            return None;
        }
        state.stale_frames -= 1;
        Self::lend(&mut state, FrameOutcome::Valid(sample_jpeg(64)))
    }

    fn release_frame(&self, frame: MockFrame) {
        let mut state = self.state.lock().unwrap();
        if state.outstanding.remove(&frame.id) {
            state.released += 1;
        } else {
            state.double_releases += 1;
        }
    }

    fn sensor_id(&self) -> Option<u16> {
        self.state.lock().unwrap().sensor_id
    }

    fn status(&self) -> Option<SensorStatus> {
        let state = self.state.lock().unwrap();
        let config = state.config.as_ref()?;
        Some(SensorStatus {
            frame_size: Some(config.frame_size),
            quality: config.jpeg_quality,
            brightness: state.tuning.as_ref().map_or(0, |t| t.brightness),
            contrast: state.tuning.as_ref().map_or(0, |t| t.contrast),
            saturation: state.tuning.as_ref().map_or(0, |t| t.saturation),
        })
    }

    fn deinit(&self) -> Result<(), SensorError> {
        let mut state = self.state.lock().unwrap();
        state.deinit_calls += 1;
        state.config = None;
        if state.fail_deinit {
            return Err(SensorError::DeinitFailed("Simulated deinit error".to_string()));
        }
        Ok(())
    }
}

/// Mockフラッシュピン
#[derive(Debug, Clone)]
pub struct MockFlashPin {
    pub pin: u8,
    /// 書き込まれたレベルの記録
    pub levels: Arc<Mutex<Vec<PinLevel>>>,
    pub simulate_write_error: Arc<Mutex<bool>>,
}

impl Default for MockFlashPin {
    fn default() -> Self {
        Self::new(4)
    }
}

impl MockFlashPin {
    pub fn new(pin: u8) -> Self {
        Self {
            pin,
            levels: Arc::new(Mutex::new(Vec::new())),
            simulate_write_error: Arc::new(Mutex::new(false)),
        }
    }

    /// テスト用: 書き込まれたレベルを取得
    pub fn get_levels(&self) -> Vec<PinLevel> {
        self.levels.lock().unwrap().clone()
    }

    /// 最後に書き込まれたレベル（未書き込みなら Low）
    pub fn current_level(&self) -> PinLevel {
        self.levels
            .lock()
            .unwrap()
            .last()
            .copied()
            .unwrap_or(PinLevel::Low)
    }

    /// 点灯回数
    pub fn on_count(&self) -> usize {
        self.levels
            .lock()
            .unwrap()
            .iter()
            .filter(|l| **l == PinLevel::High)
            .count()
    }

    pub fn set_write_error(&self, enable: bool) {
        *self.simulate_write_error.lock().unwrap() = enable;
    }
}

impl PinDriver for MockFlashPin {
    fn set_level(&self, level: PinLevel) -> Result<(), PinError> {
        if *self.simulate_write_error.lock().unwrap() && level == PinLevel::High {
            return Err(PinError {
                pin: self.pin,
                message: "Simulated write error".to_string(),
            });
        }
        self.levels.lock().unwrap().push(level);
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryState {
    fast_capacity: usize,
    slow_capacity: Option<usize>,
    attempts: Vec<(MemoryTier, usize)>,
    allocations: Vec<(MemoryTier, usize)>,
}

/// Mockメモリプール
///
/// 容量は「一度に確保できる最大サイズ」として扱う。PSRAMは `None` で非搭載。
#[derive(Debug, Clone)]
pub struct MockMemory {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MockMemory {
    fn default() -> Self {
        Self::new(320 * 1024, Some(4 * 1024 * 1024))
    }
}

impl MockMemory {
    pub fn new(fast_capacity: usize, slow_capacity: Option<usize>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                fast_capacity,
                slow_capacity,
                attempts: Vec::new(),
                allocations: Vec::new(),
            })),
        }
    }

    /// PSRAM非搭載
    pub fn without_psram(fast_capacity: usize) -> Self {
        Self::new(fast_capacity, None)
    }

    pub fn set_capacity(&self, tier: MemoryTier, capacity: usize) {
        let mut state = self.state.lock().unwrap();
        match tier {
            MemoryTier::Fast => state.fast_capacity = capacity,
            MemoryTier::Slow => state.slow_capacity = Some(capacity),
        }
    }

    /// 試行した確保（失敗を含む）
    pub fn attempts(&self) -> Vec<(MemoryTier, usize)> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// 成功した確保
    pub fn allocations(&self) -> Vec<(MemoryTier, usize)> {
        self.state.lock().unwrap().allocations.clone()
    }

    pub fn touched(&self, tier: MemoryTier) -> bool {
        self.attempts().iter().any(|(t, _)| *t == tier)
    }
}

impl MemoryPools for MockMemory {
    type Buffer = Vec<u8>;

    fn allocate(&self, tier: MemoryTier, size: usize) -> Option<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push((tier, size));

        let capacity = match tier {
            MemoryTier::Fast => Some(state.fast_capacity),
            MemoryTier::Slow => state.slow_capacity,
        }?;
        if size > capacity {
            return None;
        }

        state.allocations.push((tier, size));
        Some(vec![0xA5; size])
    }

    fn free_size(&self, tier: MemoryTier) -> usize {
        let state = self.state.lock().unwrap();
        match tier {
            MemoryTier::Fast => state.fast_capacity,
            MemoryTier::Slow => state.slow_capacity.unwrap_or(0),
        }
    }

    fn is_available(&self, tier: MemoryTier) -> bool {
        match tier {
            MemoryTier::Fast => true,
            MemoryTier::Slow => self.state.lock().unwrap().slow_capacity.is_some(),
        }
    }
}

/// JPEGマーカー付きのダミー画像データ
pub fn sample_jpeg(len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len.max(4));
    data.extend_from_slice(&[0xFF, 0xD8]);
    for i in 0..len.saturating_sub(4) {
        data.push(((i * 13 + 57) % 256) as u8);
    }
    data.extend_from_slice(&[0xFF, 0xD9]);
    data.truncate(len.max(1));
    data
}
