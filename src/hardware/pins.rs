/// カメラピン設定構造体
///
/// esp32-camera ドライバにはGPIO番号をそのまま渡す。未接続は -1。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraPins {
    pub pwdn: i32,
    pub reset: i32,
    pub xclk: i32,
    pub sda: i32,
    pub scl: i32,
    pub d7: i32,
    pub d6: i32,
    pub d5: i32,
    pub d4: i32,
    pub d3: i32,
    pub d2: i32,
    pub d1: i32,
    pub d0: i32,
    pub vsync: i32,
    pub href: i32,
    pub pclk: i32,
}

/// 未接続ピン
pub const PIN_UNUSED: i32 = -1;

/// AI-Thinker ESP32-CAM のフラッシュLED
pub const AI_THINKER_FLASH_GPIO: u8 = 4;

/// XCLK周波数
pub const XCLK_FREQ_HZ: i32 = 20_000_000;

impl CameraPins {
    /// AI-Thinker ESP32-CAM (OV2640)
    pub const AI_THINKER: CameraPins = CameraPins {
        pwdn: 32,
        reset: PIN_UNUSED,
        xclk: 0,
        sda: 26,
        scl: 27,
        d7: 35,
        d6: 34,
        d5: 39,
        d4: 36,
        d3: 21,
        d2: 19,
        d1: 18,
        d0: 5,
        vsync: 25,
        href: 23,
        pclk: 22,
    };

    /// データバス (D0..D7)
    pub fn data_pins(&self) -> [i32; 8] {
        [
            self.d0, self.d1, self.d2, self.d3, self.d4, self.d5, self.d6, self.d7,
        ]
    }
}

impl Default for CameraPins {
    fn default() -> Self {
        Self::AI_THINKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_thinker_pins_do_not_overlap_flash() {
        let pins = CameraPins::AI_THINKER;
        assert!(!pins.data_pins().contains(&(AI_THINKER_FLASH_GPIO as i32)));
        assert_eq!(pins.data_pins()[0], 5);
        assert_eq!(pins.reset, PIN_UNUSED);
    }
}
