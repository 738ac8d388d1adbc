/// esp32-camera ドライバによる `SensorDriver` 実装
use std::ffi::c_int;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_sys::camera;
use log::{debug, warn};

use crate::hardware::camera::config::{CameraConfig, FrameSize, PixelFormat, SensorTuning};
use crate::hardware::camera::driver::{FrameBuffer, SensorDriver, SensorError, SensorStatus};
use crate::hardware::memory::MemoryTier;
use crate::hardware::pins::{CameraPins, XCLK_FREQ_HZ};

/// ドライバが貸し出すフレームバッファ
pub struct EspFrame {
    fb: NonNull<camera::camera_fb_t>,
}

// フレームバッファはドライバが確保したDMAメモリで、返却までは他から触られない
unsafe impl Send for EspFrame {}

impl FrameBuffer for EspFrame {
    fn len(&self) -> usize {
        unsafe { self.fb.as_ref().len }
    }

    fn data(&self) -> Option<&[u8]> {
        let fb = unsafe { self.fb.as_ref() };
        if fb.buf.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(fb.buf, fb.len) })
    }

    fn format(&self) -> PixelFormat {
        pixel_format_from_raw(unsafe { self.fb.as_ref().format })
    }

    fn width(&self) -> u16 {
        unsafe { self.fb.as_ref().width as u16 }
    }

    fn height(&self) -> u16 {
        unsafe { self.fb.as_ref().height as u16 }
    }
}

/// OV2640 センサー（esp32-camera 経由）
pub struct EspCameraSensor {
    pins: CameraPins,
    initialized: AtomicBool,
}

impl EspCameraSensor {
    pub fn new(pins: CameraPins) -> Self {
        Self {
            pins,
            initialized: AtomicBool::new(false),
        }
    }

    fn sensor(&self) -> Option<NonNull<camera::sensor_t>> {
        if !self.initialized.load(Ordering::Acquire) {
            return None;
        }
        NonNull::new(unsafe { camera::esp_camera_sensor_get() })
    }
}

/// センサーのレジスタ設定関数を呼ぶ（関数が無いセンサーでは何もしない）
macro_rules! set_register {
    ($sensor:expr, $setter:ident, $value:expr, $failures:ident) => {
        let s = $sensor.as_ptr();
        if let Some(f) = unsafe { (*s).$setter } {
            if unsafe { f(s, $value as _) } != 0 {
                warn!(concat!(stringify!($setter), " failed"));
                $failures += 1;
            }
        }
    };
}

impl SensorDriver for EspCameraSensor {
    type Frame = EspFrame;

    fn init(&self, config: &CameraConfig, fb_location: MemoryTier) -> Result<(), SensorError> {
        let pins = &self.pins;
        let raw = camera::camera_config_t {
            pin_pwdn: pins.pwdn,
            pin_reset: pins.reset,
            pin_xclk: pins.xclk,
            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 { pin_sccb_sda: pins.sda },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 { pin_sccb_scl: pins.scl },
            pin_d7: pins.d7,
            pin_d6: pins.d6,
            pin_d5: pins.d5,
            pin_d4: pins.d4,
            pin_d3: pins.d3,
            pin_d2: pins.d2,
            pin_d1: pins.d1,
            pin_d0: pins.d0,
            pin_vsync: pins.vsync,
            pin_href: pins.href,
            pin_pclk: pins.pclk,
            xclk_freq_hz: XCLK_FREQ_HZ,
            ledc_timer: esp_idf_sys::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: esp_idf_sys::ledc_channel_t_LEDC_CHANNEL_0,
            pixel_format: pixel_format_to_raw(config.pixel_format),
            frame_size: frame_size_to_raw(config.frame_size),
            jpeg_quality: c_int::from(config.jpeg_quality),
            fb_count: usize::from(config.fb_count),
            fb_location: match fb_location {
                MemoryTier::Slow => camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM,
                MemoryTier::Fast => camera::camera_fb_location_t_CAMERA_FB_IN_DRAM,
            },
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,
            ..Default::default()
        };

        let err = unsafe { camera::esp_camera_init(&raw) };
        if err != 0 {
            return Err(SensorError::InitFailed(format!(
                "esp_camera_init returned 0x{:x}",
                err
            )));
        }
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn configure(
        &self,
        format: PixelFormat,
        frame_size: FrameSize,
        quality: u8,
    ) -> Result<(), SensorError> {
        let sensor = self
            .sensor()
            .ok_or_else(|| SensorError::ConfigFailed("sensor handle unavailable".to_string()))?;

        let mut failures = 0;
        set_register!(sensor, set_pixformat, pixel_format_to_raw(format), failures);
        set_register!(sensor, set_framesize, frame_size_to_raw(frame_size), failures);
        set_register!(sensor, set_quality, quality, failures);

        if failures > 0 {
            return Err(SensorError::ConfigFailed(format!(
                "{} register writes failed",
                failures
            )));
        }
        Ok(())
    }

    fn apply_tuning(&self, tuning: &SensorTuning) -> Result<(), SensorError> {
        let sensor = self
            .sensor()
            .ok_or_else(|| SensorError::ConfigFailed("sensor handle unavailable".to_string()))?;

        let mut failures = 0;
        // 露出・ゲイン
        set_register!(sensor, set_gain_ctrl, tuning.gain_ctrl, failures);
        set_register!(sensor, set_exposure_ctrl, tuning.exposure_ctrl, failures);
        set_register!(sensor, set_aec2, tuning.aec2, failures);
        set_register!(sensor, set_ae_level, tuning.ae_level, failures);
        set_register!(sensor, set_agc_gain, tuning.agc_gain, failures);
        set_register!(sensor, set_aec_value, tuning.aec_value, failures);
        // 画質
        set_register!(sensor, set_brightness, tuning.brightness, failures);
        set_register!(sensor, set_contrast, tuning.contrast, failures);
        set_register!(sensor, set_saturation, tuning.saturation, failures);
        // ホワイトバランス
        set_register!(sensor, set_whitebal, tuning.whitebal, failures);
        set_register!(sensor, set_awb_gain, tuning.awb_gain, failures);
        set_register!(sensor, set_wb_mode, tuning.wb_mode, failures);
        // 補正
        set_register!(sensor, set_dcw, tuning.dcw, failures);
        set_register!(sensor, set_bpc, tuning.bpc, failures);
        set_register!(sensor, set_wpc, tuning.wpc, failures);
        set_register!(sensor, set_lenc, tuning.lenc, failures);
        set_register!(sensor, set_special_effect, tuning.special_effect, failures);
        set_register!(sensor, set_hmirror, tuning.hmirror, failures);
        set_register!(sensor, set_vflip, tuning.vflip, failures);

        if failures > 0 {
            return Err(SensorError::ConfigFailed(format!(
                "{} tuning writes failed",
                failures
            )));
        }
        debug!("Sensor tuning applied");
        Ok(())
    }

    fn acquire_frame(&self) -> Option<EspFrame> {
        if !self.initialized.load(Ordering::Acquire) {
            return None;
        }
        NonNull::new(unsafe { camera::esp_camera_fb_get() }).map(|fb| EspFrame { fb })
    }

    fn release_frame(&self, frame: EspFrame) {
        unsafe { camera::esp_camera_fb_return(frame.fb.as_ptr()) };
    }

    fn sensor_id(&self) -> Option<u16> {
        self.sensor().map(|s| unsafe { s.as_ref().id.PID })
    }

    fn status(&self) -> Option<SensorStatus> {
        self.sensor().map(|s| {
            let status = unsafe { &s.as_ref().status };
            SensorStatus {
                frame_size: frame_size_from_raw(status.framesize),
                quality: status.quality,
                brightness: status.brightness,
                contrast: status.contrast,
                saturation: status.saturation,
            }
        })
    }

    fn deinit(&self) -> Result<(), SensorError> {
        self.initialized.store(false, Ordering::Release);
        let err = unsafe { camera::esp_camera_deinit() };
        if err != 0 {
            return Err(SensorError::DeinitFailed(format!(
                "esp_camera_deinit returned 0x{:x}",
                err
            )));
        }
        Ok(())
    }
}

fn pixel_format_to_raw(format: PixelFormat) -> camera::pixformat_t {
    match format {
        PixelFormat::Jpeg => camera::pixformat_t_PIXFORMAT_JPEG,
        PixelFormat::Rgb565 => camera::pixformat_t_PIXFORMAT_RGB565,
        PixelFormat::Yuv422 => camera::pixformat_t_PIXFORMAT_YUV422,
        PixelFormat::Grayscale => camera::pixformat_t_PIXFORMAT_GRAYSCALE,
    }
}

fn pixel_format_from_raw(raw: camera::pixformat_t) -> PixelFormat {
    match raw {
        camera::pixformat_t_PIXFORMAT_RGB565 => PixelFormat::Rgb565,
        camera::pixformat_t_PIXFORMAT_YUV422 => PixelFormat::Yuv422,
        camera::pixformat_t_PIXFORMAT_GRAYSCALE => PixelFormat::Grayscale,
        _ => PixelFormat::Jpeg,
    }
}

fn frame_size_to_raw(size: FrameSize) -> camera::framesize_t {
    match size {
        FrameSize::Qqvga => camera::framesize_t_FRAMESIZE_QQVGA,
        FrameSize::Qcif => camera::framesize_t_FRAMESIZE_QCIF,
        FrameSize::Hqvga => camera::framesize_t_FRAMESIZE_HQVGA,
        FrameSize::Qvga => camera::framesize_t_FRAMESIZE_QVGA,
        FrameSize::Cif => camera::framesize_t_FRAMESIZE_CIF,
        FrameSize::Hvga => camera::framesize_t_FRAMESIZE_HVGA,
        FrameSize::Vga => camera::framesize_t_FRAMESIZE_VGA,
        FrameSize::Svga => camera::framesize_t_FRAMESIZE_SVGA,
        FrameSize::Xga => camera::framesize_t_FRAMESIZE_XGA,
        FrameSize::Hd => camera::framesize_t_FRAMESIZE_HD,
        FrameSize::Sxga => camera::framesize_t_FRAMESIZE_SXGA,
        FrameSize::Uxga => camera::framesize_t_FRAMESIZE_UXGA,
    }
}

fn frame_size_from_raw(raw: camera::framesize_t) -> Option<FrameSize> {
    [
        FrameSize::Qqvga,
        FrameSize::Qcif,
        FrameSize::Hqvga,
        FrameSize::Qvga,
        FrameSize::Cif,
        FrameSize::Hvga,
        FrameSize::Vga,
        FrameSize::Svga,
        FrameSize::Xga,
        FrameSize::Hd,
        FrameSize::Sxga,
        FrameSize::Uxga,
    ]
    .into_iter()
    .find(|size| frame_size_to_raw(*size) == raw)
}
