use super::config::PixelFormat;
use super::driver::{FrameBuffer, SensorDriver};

/// ドライバから借りているフレーム
///
/// ドロップ時または `release()` で必ず一度だけドライバへ返却される。
pub struct CapturedFrame<'a, S: SensorDriver> {
    sensor: &'a S,
    frame: Option<S::Frame>,
}

impl<'a, S: SensorDriver> CapturedFrame<'a, S> {
    pub(crate) fn new(sensor: &'a S, frame: S::Frame) -> Self {
        Self {
            sensor,
            frame: Some(frame),
        }
    }

    /// 画像データ。有効性チェック済みのフレームのみ生成されるため常に非空
    pub fn data(&self) -> &[u8] {
        self.frame.as_ref().and_then(|f| f.data()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.frame.as_ref().map_or(0, |f| f.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.frame.as_ref().map(|f| f.format())
    }

    pub fn dimensions(&self) -> (u16, u16) {
        self.frame
            .as_ref()
            .map_or((0, 0), |f| (f.width(), f.height()))
    }

    /// ドライバへ返却する
    pub fn release(mut self) {
        self.return_to_driver();
    }

    fn return_to_driver(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.sensor.release_frame(frame);
            log::debug!("Frame buffer returned");
        }
    }
}

impl<S: SensorDriver> Drop for CapturedFrame<'_, S> {
    fn drop(&mut self) {
        self.return_to_driver();
    }
}

impl<S: SensorDriver> std::fmt::Debug for CapturedFrame<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("len", &self.len())
            .field("format", &self.format())
            .field("dimensions", &self.dimensions())
            .finish()
    }
}
