use std::thread;
use std::time::Duration;

use log::{debug, warn};

use super::driver::{PinDriver, PinError, PinLevel};

/// フラッシュLEDの点灯シーケンス制御
pub struct FlashSequencer<P: PinDriver> {
    pin: P,
    warmup: Duration,
}

impl<P: PinDriver> FlashSequencer<P> {
    pub fn new(pin: P, warmup: Duration) -> Self {
        Self { pin, warmup }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// 点灯してウォームアップ時間だけ待つ
    ///
    /// 返されたガードがドロップされると必ず消灯する。
    pub fn on(&self) -> Result<FlashGuard<'_, P>, PinError> {
        if let Err(e) = self.pin.set_level(PinLevel::High) {
            // 中途半端な状態を残さない
            let _ = self.off();
            return Err(e);
        }
        let guard = FlashGuard { sequencer: self };
        thread::sleep(self.warmup);
        Ok(guard)
    }

    /// 即座に消灯
    pub fn off(&self) -> Result<(), PinError> {
        self.pin.set_level(PinLevel::Low)
    }

    /// ウォームアップなしで点灯状態を切り替える
    pub fn set(&self, enable: bool) -> Result<(), PinError> {
        self.pin.set_level(PinLevel::from(enable))
    }
}

/// 点灯中を表すガード
pub struct FlashGuard<'a, P: PinDriver> {
    sequencer: &'a FlashSequencer<P>,
}

impl<P: PinDriver> Drop for FlashGuard<'_, P> {
    fn drop(&mut self) {
        match self.sequencer.off() {
            Ok(()) => debug!("Flash OFF"),
            Err(e) => warn!("フラッシュ消灯に失敗しました: {}", e),
        }
    }
}

#[cfg(all(test, not(feature = "esp")))]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::hardware::mock::MockFlashPin;

    #[test]
    fn test_on_waits_for_warmup() {
        let pin = MockFlashPin::default();
        let flash = FlashSequencer::new(pin.clone(), Duration::from_millis(30));

        let start = Instant::now();
        let guard = flash.on().unwrap();

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(pin.current_level(), PinLevel::High);
        drop(guard);
    }

    #[test]
    fn test_guard_drop_turns_flash_off() {
        let pin = MockFlashPin::default();
        let flash = FlashSequencer::new(pin.clone(), Duration::ZERO);

        {
            let _guard = flash.on().unwrap();
            assert_eq!(pin.get_levels(), vec![PinLevel::High]);
        }

        assert_eq!(pin.get_levels(), vec![PinLevel::High, PinLevel::Low]);
    }

    #[test]
    fn test_on_failure_leaves_flash_off() {
        let pin = MockFlashPin::default();
        pin.set_write_error(true);
        let flash = FlashSequencer::new(pin.clone(), Duration::from_millis(30));

        let err = flash.on().err().unwrap();

        assert_eq!(err.pin, 4);
        assert_eq!(pin.get_levels(), vec![PinLevel::Low]);
        assert_eq!(pin.on_count(), 0);
    }

    #[test]
    fn test_set_skips_warmup() {
        let pin = MockFlashPin::default();
        let flash = FlashSequencer::new(pin.clone(), Duration::from_secs(5));

        let start = Instant::now();
        flash.set(true).unwrap();
        flash.set(false).unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(pin.get_levels(), vec![PinLevel::High, PinLevel::Low]);
    }
}
