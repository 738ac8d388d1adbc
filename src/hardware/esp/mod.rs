/// ESP-IDF 上のドライバ実装
pub mod flash_led;
pub mod heap;
pub mod sensor;

pub use flash_led::EspFlashLed;
pub use heap::{HeapCapsBuffer, HeapCapsPools};
pub use sensor::{EspCameraSensor, EspFrame};
