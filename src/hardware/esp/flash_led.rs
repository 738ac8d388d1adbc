use std::sync::{Mutex, PoisonError};

use esp_idf_hal::gpio::{AnyOutputPin, Level, Output, Pin, PinDriver as GpioDriver};
use esp_idf_hal::sys::EspError;

use crate::hardware::camera::driver::{PinDriver, PinError, PinLevel};

/// フラッシュLED（AI-Thinker ESP32-CAM は GPIO4、High で点灯）
pub struct EspFlashLed {
    pin: u8,
    led: Mutex<GpioDriver<'static, AnyOutputPin, Output>>,
}

impl EspFlashLed {
    /// 出力ピンとして初期化し、消灯状態にする
    pub fn new(pin: AnyOutputPin) -> Result<Self, EspError> {
        let number = pin.pin() as u8;
        let mut led = GpioDriver::output(pin)?;
        led.set_low()?;
        Ok(Self {
            pin: number,
            led: Mutex::new(led),
        })
    }
}

impl PinDriver for EspFlashLed {
    fn set_level(&self, level: PinLevel) -> Result<(), PinError> {
        let mut led = self.led.lock().unwrap_or_else(PoisonError::into_inner);
        let level = match level {
            PinLevel::High => Level::High,
            PinLevel::Low => Level::Low,
        };
        led.set_level(level).map_err(|e| PinError {
            pin: self.pin,
            message: format!("{:?}", e),
        })
    }
}
