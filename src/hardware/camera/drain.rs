/// 古いフレームバッファの破棄
///
/// センサーパイプラインはキャプチャの合間も動き続けて古いフレームを溜めるため、
/// 撮影前に捨てておかないと古い画像が返ってくる。
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::config::DrainSchedule;
use super::driver::SensorDriver;

pub struct BufferDrainer<'a, S: SensorDriver> {
    sensor: &'a S,
    timeout: Duration,
}

impl<'a, S: SensorDriver> BufferDrainer<'a, S> {
    pub fn new(sensor: &'a S, timeout: Duration) -> Self {
        Self { sensor, timeout }
    }

    /// 溜まっているフレームを取り出して即座に返却する
    ///
    /// フレームが無くなった時点で終了（正常終了）。空を報告しないドライバに
    /// 備えて制限時間でも打ち切る。戻り値は破棄したフレーム数。
    pub fn drain(&self, max_attempts: u32, delay_between: Duration) -> u32 {
        let start = Instant::now();
        let mut cleared = 0;

        for attempt in 0..max_attempts {
            if start.elapsed() > self.timeout {
                warn!("Buffer clearing timeout after {} attempts", attempt);
                break;
            }

            let Some(frame) = self.sensor.poll_buffered_frame() else {
                break;
            };
            self.sensor.release_frame(frame);
            cleared += 1;

            if !delay_between.is_zero() {
                thread::sleep(delay_between);
            }
        }

        if cleared > 0 {
            debug!(
                "Cleared {} frame buffers in {} ms",
                cleared,
                start.elapsed().as_millis()
            );
        }

        cleared
    }

    pub fn drain_with(&self, schedule: DrainSchedule) -> u32 {
        self.drain(schedule.max_attempts, schedule.delay)
    }
}

#[cfg(all(test, not(feature = "esp")))]
mod tests {
    use super::*;
    use crate::hardware::mock::MockSensor;

    #[test]
    fn test_drain_stops_when_pipeline_empty() {
        let sensor = MockSensor::new();
        sensor.queue_stale_frames(2);
        let drainer = BufferDrainer::new(&sensor, Duration::from_secs(1));

        assert_eq!(drainer.drain(5, Duration::ZERO), 2);
        assert_eq!(sensor.remaining_stale_frames(), 0);
        assert_eq!(sensor.outstanding_count(), 0);
    }

    #[test]
    fn test_drain_respects_max_attempts() {
        let sensor = MockSensor::new();
        sensor.queue_stale_frames(10);
        let drainer = BufferDrainer::new(&sensor, Duration::from_secs(1));

        assert_eq!(drainer.drain_with(DrainSchedule::new(3, 0)), 3);
        assert_eq!(sensor.remaining_stale_frames(), 7);
        // 撮影としては数えない
        assert_eq!(sensor.capture_calls(), 0);
    }

    #[test]
    fn test_drain_gives_up_after_timeout() {
        let sensor = MockSensor::new();
        sensor.queue_stale_frames(1000);
        let drainer = BufferDrainer::new(&sensor, Duration::from_millis(50));

        let start = Instant::now();
        let cleared = drainer.drain(1000, Duration::from_millis(1));

        assert!(cleared < 1000);
        assert!(sensor.remaining_stale_frames() > 0);
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(sensor.outstanding_count(), 0);
        assert_eq!(sensor.double_release_count(), 0);
    }
}
