/// カメラ管理（キャプチャの統括）
///
/// 排他トークン・連続撮影の間隔制限・リトライ・フラッシュ制御・
/// バッファ確保とエンコードを1回のキャプチャ操作としてまとめる。
///
/// ## ロックの規律
///
/// - センサーとフラッシュピンはトークン保持中にのみ操作する
/// - 最終撮影時刻はトークン取得前に読み（間隔制限）、成功時にトークン保持中のまま書く
/// - フレーム返却・フラッシュ消灯・トークン解放はガードのドロップで行い、
///   どの経路でも省略されない
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::config::{CameraConfig, CaptureSettings, SensorTuning};
use super::drain::BufferDrainer;
use super::driver::{FrameBuffer, PinDriver, SensorDriver};
use super::error::{CameraError, CameraResult, TimeoutKind};
use super::flash::FlashSequencer;
use super::frame::CapturedFrame;
use super::lock::{ExclusiveToken, TokenGuard};
use super::retry::{RetryController, RetryFailure, RetryPolicy};
use super::status::{CameraStatus, DiagnosticReport};
use crate::hardware::memory::{MemoryPools, MemoryTier, TieredAllocator};
use crate::utils::encoder::{EncodedImage, FrameEncoder};

pub struct CameraManager<S: SensorDriver, P: PinDriver, M: MemoryPools> {
    sensor: S,
    flash: FlashSequencer<P>,
    allocator: TieredAllocator<M>,
    encoder: FrameEncoder,
    settings: CaptureSettings,
    tuning: SensorTuning,
    token: ExclusiveToken,
    last_capture: Mutex<Option<Instant>>,
    initialized: AtomicBool,
}

impl<S: SensorDriver, P: PinDriver, M: MemoryPools> CameraManager<S, P, M> {
    pub fn new(sensor: S, flash_pin: P, pools: M, settings: CaptureSettings) -> Self {
        Self {
            sensor,
            flash: FlashSequencer::new(flash_pin, settings.flash_warmup),
            allocator: TieredAllocator::new(pools, settings.slow_pool_threshold),
            encoder: FrameEncoder::new(settings.expansion_factor, settings.safety_margin),
            settings,
            tuning: SensorTuning::default(),
            token: ExclusiveToken::new(),
            last_capture: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_tuning(mut self, tuning: SensorTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn pools(&self) -> &M {
        self.allocator.pools()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// カメラを初期化する
    ///
    /// 初期化済みの場合は何もせず成功を返す。
    pub fn initialize(&self, config: &CameraConfig) -> CameraResult<()> {
        if self.is_initialized() {
            warn!("Camera already initialized");
            return Ok(());
        }

        config.validate().map_err(|e| {
            error!("Camera configuration is invalid: {}", e);
            CameraError::InvalidArgument(e)
        })?;

        let _token = self.lock(self.settings.raw_lock_timeout)?;
        if self.is_initialized() {
            warn!("Camera already initialized");
            return Ok(());
        }

        // フラッシュは消灯状態から開始
        self.flash.off()?;

        let slow_available = self.pools().is_available(MemoryTier::Slow);
        info!("PSRAM {}", if slow_available { "available" } else { "not available" });
        if !slow_available && config.frame_size.is_large() {
            warn!(
                "Large frame size ({:?}) without PSRAM - consider reducing size",
                config.frame_size
            );
        }

        let fb_location = if slow_available {
            MemoryTier::Slow
        } else {
            MemoryTier::Fast
        };
        self.sensor.init(config, fb_location).map_err(|e| {
            error!("Camera init failed: {}", e);
            CameraError::from(e)
        })?;

        // レジスタ設定の失敗は致命的ではない（デフォルト値のまま動作する）
        if let Err(e) =
            self.sensor
                .configure(config.pixel_format, config.frame_size, config.jpeg_quality)
        {
            warn!("センサー設定に失敗しました: {}", e);
        }
        if let Err(e) = self.sensor.apply_tuning(&self.tuning) {
            warn!("センサーの画質設定に失敗しました: {}", e);
        }
        match self.sensor.sensor_id() {
            Some(pid) => info!("Sensor configured (PID: 0x{:02x})", pid),
            None => warn!("Failed to get sensor handle"),
        }

        *self.last_capture_slot() = None;
        self.initialized.store(true, Ordering::Release);

        info!("Camera initialized successfully");
        info!(
            "Config: Frame={:?}, Quality={}, PSRAM={}",
            config.frame_size,
            config.jpeg_quality,
            if slow_available { "YES" } else { "NO" }
        );
        self.log_free_memory("Memory");
        Ok(())
    }

    /// デフォルト設定（JPEG / QVGA / 品質12 / バッファ1枚）で初期化
    pub fn initialize_default(&self) -> CameraResult<()> {
        self.initialize(&CameraConfig::default())
    }

    /// 撮影してbase64エンコードした画像を返す
    pub fn capture_encoded(&self) -> CameraResult<EncodedImage<M::Buffer>> {
        self.ensure_initialized()?;
        self.wait_for_capture_interval();

        let _token = self.lock(self.settings.encoded_lock_timeout)?;
        self.ensure_initialized()?;
        // 待機中に他の呼び出しが撮影していた場合に備えて再確認
        self.wait_for_capture_interval();

        self.log_free_memory("Starting capture");

        let frame = self.acquire_with_retry()?;
        let image = self.encoder.encode(frame.data(), &self.allocator)?;

        self.mark_captured();
        drop(frame);
        Ok(image)
    }

    /// リトライなしで1枚撮影し、フレームをそのまま返す
    ///
    /// 返されたフレームは `release_frame` で返却する（ドロップでも返却される）。
    pub fn capture_raw(&self) -> CameraResult<CapturedFrame<'_, S>> {
        self.ensure_initialized()?;
        self.wait_for_capture_interval();

        let _token = self.lock(self.settings.raw_lock_timeout)?;
        self.ensure_initialized()?;
        self.wait_for_capture_interval();

        info!(
            "Raw capture start - Free heap: {} bytes",
            self.pools().free_size(MemoryTier::Fast)
        );

        self.drainer().drain_with(self.settings.raw_drain);

        let frame = {
            let _flash = self.flash.on()?;
            thread::sleep(self.settings.flash_stabilize);
            self.sensor.acquire_frame()
        };

        match frame {
            Some(frame) if frame.is_valid() => {
                info!(
                    "Raw capture successful: {} bytes, format={:?}",
                    frame.len(),
                    frame.format()
                );
                self.mark_captured();
                Ok(CapturedFrame::new(&self.sensor, frame))
            }
            Some(frame) => {
                error!("Raw capture returned an empty frame");
                self.sensor.release_frame(frame);
                Err(CameraError::CaptureFailed { attempts: 1 })
            }
            None => {
                error!("Raw capture failed");
                Err(CameraError::CaptureFailed { attempts: 1 })
            }
        }
    }

    /// `capture_raw` で得たフレームを返却する
    pub fn release_frame(&self, frame: CapturedFrame<'_, S>) {
        frame.release();
    }

    pub fn set_flash(&self, enable: bool) -> CameraResult<()> {
        self.ensure_initialized()?;
        let _token = self.lock(self.settings.raw_lock_timeout)?;
        // 待機中に終了処理が走っていた場合は点灯させない
        self.ensure_initialized()?;
        self.flash.set(enable)?;
        info!("Flash {}", if enable { "ON" } else { "OFF" });
        Ok(())
    }

    /// カメラを終了する
    ///
    /// センサーの終了処理が失敗しても後始末は最後まで行い、その後エラーを返す。
    pub fn deinitialize(&self) -> CameraResult<()> {
        if !self.is_initialized() {
            warn!("Camera not initialized");
            return Err(CameraError::InvalidState("camera not initialized"));
        }

        let _token = self.lock(self.settings.raw_lock_timeout)?;
        if !self.is_initialized() {
            warn!("Camera already deinitialized");
            return Err(CameraError::InvalidState("camera not initialized"));
        }

        if let Err(e) = self.flash.off() {
            warn!("フラッシュ消灯に失敗しました: {}", e);
        }

        let cleared = self.drainer().drain_with(self.settings.teardown_drain);
        info!("Cleared {} buffers during deinit", cleared);

        let result = self.sensor.deinit();

        self.initialized.store(false, Ordering::Release);
        *self.last_capture_slot() = None;

        match result {
            Ok(()) => {
                info!("Camera deinitialized successfully");
                Ok(())
            }
            Err(e) => {
                error!("Camera deinit failed: {}", e);
                info!("Camera deinitialized with errors");
                Err(e.into())
            }
        }
    }

    pub fn status(&self) -> CameraStatus {
        if !self.is_initialized() {
            return CameraStatus::default();
        }

        CameraStatus {
            initialized: true,
            free_fast_mem: self.pools().free_size(MemoryTier::Fast),
            free_slow_mem: self.pools().free_size(MemoryTier::Slow),
            sensor_id: self.sensor.sensor_id(),
        }
    }

    /// 状態をログに出力し、診断結果を返す
    pub fn diagnostic(&self) -> DiagnosticReport {
        info!("=== Camera Diagnostic ===");
        let initialized = self.is_initialized();
        info!(
            "Status: {}",
            if initialized { "INITIALIZED" } else { "NOT INITIALIZED" }
        );
        info!(
            "Free memory - Heap: {}, PSRAM: {}",
            self.pools().free_size(MemoryTier::Fast),
            self.pools().free_size(MemoryTier::Slow)
        );
        let slow_pool_available = self.pools().is_available(MemoryTier::Slow);
        info!(
            "PSRAM available: {}",
            if slow_pool_available { "YES" } else { "NO" }
        );

        let mut sensor = None;
        let mut buffer_test = None;
        if initialized {
            sensor = self.sensor.status();
            match &sensor {
                Some(s) => {
                    if let Some(pid) = self.sensor.sensor_id() {
                        info!("Sensor ID: 0x{:02x}", pid);
                    }
                    info!("Current frame size: {:?}", s.frame_size);
                    info!("Current quality: {}", s.quality);
                    info!("Brightness: {}", s.brightness);
                    info!("Contrast: {}", s.contrast);
                    info!("Saturation: {}", s.saturation);
                }
                None => warn!("Unable to get sensor handle"),
            }

            buffer_test = self.buffer_test();
        }

        let since_last_capture = self.last_capture().map(|at| at.elapsed());
        info!(
            "Last capture: {} ms ago",
            since_last_capture.map_or(0, |d| d.as_millis())
        );
        info!("========================");

        DiagnosticReport {
            status: self.status(),
            slow_pool_available,
            sensor,
            buffer_test,
            since_last_capture,
        }
    }

    fn buffer_test(&self) -> Option<usize> {
        let Ok(_token) = self.lock(self.settings.raw_lock_timeout) else {
            warn!("Buffer test skipped: camera busy");
            return None;
        };

        match self.sensor.acquire_frame() {
            Some(frame) => {
                let len = frame.len();
                info!("Buffer test: SUCCESS ({} bytes)", len);
                self.sensor.release_frame(frame);
                Some(len)
            }
            None => {
                warn!("Buffer test: FAILED - no buffer available");
                None
            }
        }
    }

    fn acquire_with_retry(&self) -> CameraResult<CapturedFrame<'_, S>> {
        let policy = RetryPolicy::new(
            self.settings.max_attempts,
            self.settings.retry_base_delay,
            self.settings.retry_deadline,
        );
        let drainer = self.drainer();

        RetryController::new(policy)
            .run(|attempt| self.attempt_capture(attempt, &drainer))
            .map_err(|failure| match failure {
                RetryFailure::Exhausted { attempts } => {
                    error!("All capture attempts failed");
                    CameraError::CaptureFailed { attempts }
                }
                RetryFailure::DeadlineExceeded { attempts, elapsed } => {
                    error!(
                        "Capture gave up after {} attempts ({} ms)",
                        attempts,
                        elapsed.as_millis()
                    );
                    CameraError::Timeout(TimeoutKind::RetryDeadline(policy.deadline))
                }
            })
    }

    /// 1回分の撮影: バッファ破棄 → 待機 → フラッシュ点灯 → バッファ破棄 → 安定待ち → 取得
    fn attempt_capture(
        &self,
        attempt: u32,
        drainer: &BufferDrainer<'_, S>,
    ) -> Option<CapturedFrame<'_, S>> {
        drainer.drain_with(self.settings.pre_flash_drain);
        thread::sleep(if attempt == 1 {
            self.settings.first_attempt_settle
        } else {
            self.settings.retry_settle
        });

        let _flash = match self.flash.on() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("フラッシュ点灯に失敗しました: {}", e);
                return None;
            }
        };

        drainer.drain_with(self.settings.post_flash_drain);
        thread::sleep(self.settings.flash_stabilize);

        match self.sensor.acquire_frame() {
            Some(frame) if frame.is_valid() => {
                info!(
                    "Capture successful on attempt {}: {} bytes, format={:?}",
                    attempt,
                    frame.len(),
                    frame.format()
                );
                Some(CapturedFrame::new(&self.sensor, frame))
            }
            Some(frame) => {
                debug!("Attempt {} returned an invalid frame ({} bytes)", attempt, frame.len());
                self.sensor.release_frame(frame);
                None
            }
            None => {
                debug!("Attempt {}: no frame available", attempt);
                None
            }
        }
    }

    fn drainer(&self) -> BufferDrainer<'_, S> {
        BufferDrainer::new(&self.sensor, self.settings.drain_timeout)
    }

    fn lock(&self, timeout: Duration) -> CameraResult<TokenGuard<'_>> {
        self.token.acquire(timeout).ok_or_else(|| {
            error!("Failed to acquire camera lock within {} ms", timeout.as_millis());
            CameraError::Timeout(TimeoutKind::Lock(timeout))
        })
    }

    fn ensure_initialized(&self) -> CameraResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            error!("Camera not initialized");
            Err(CameraError::InvalidState("camera not initialized"))
        }
    }

    fn wait_for_capture_interval(&self) {
        let Some(last) = self.last_capture() else {
            return;
        };
        let elapsed = last.elapsed();
        if elapsed < self.settings.min_capture_interval {
            let wait = self.settings.min_capture_interval - elapsed;
            debug!("Rate limiting: waiting {} ms", wait.as_millis());
            thread::sleep(wait);
        }
    }

    fn last_capture(&self) -> Option<Instant> {
        *self.last_capture_slot()
    }

    fn mark_captured(&self) {
        *self.last_capture_slot() = Some(Instant::now());
    }

    fn last_capture_slot(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn log_free_memory(&self, label: &str) {
        info!(
            "{} - Free: Heap={}, PSRAM={}",
            label,
            self.pools().free_size(MemoryTier::Fast),
            self.pools().free_size(MemoryTier::Slow)
        );
    }
}
