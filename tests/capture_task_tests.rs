mod common;

use std::time::Duration;

use chrono::NaiveDateTime;
use common::{fast_settings, Rig};
use esp32cam_capture::core::capture_task::TIMESTAMP_FORMAT;
use esp32cam_capture::core::{CaptureTask, ImageUploader, StreamUploader, TaskError, UploadError};
use esp32cam_capture::hardware::mock::{sample_jpeg, FrameOutcome, MockSensor};
use esp32cam_capture::FrameEncoder;

/// 引き渡された画像を記録するだけのアップローダ
#[derive(Default)]
struct RecordingUploader {
    images: Vec<(String, String)>,
    fail: bool,
}

impl ImageUploader for RecordingUploader {
    fn upload(&mut self, image: &str, timestamp: &str) -> Result<(), UploadError> {
        if self.fail {
            return Err(UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "receiver gone",
            )));
        }
        self.images.push((image.to_string(), timestamp.to_string()));
        Ok(())
    }
}

#[test]
fn test_run_once_streams_framed_image() {
    let rig = Rig::new();
    let camera = rig.ready_camera(fast_settings());
    let mut task = CaptureTask::new(&camera, StreamUploader::new(Vec::new()), Duration::from_secs(30));

    let report = task.run_once().unwrap();

    let output = String::from_utf8(task.into_uploader().into_inner()).unwrap();
    let mut lines = output.lines();
    let header = lines.next().unwrap();
    assert_eq!(
        header,
        format!("IMAGE {} {}", report.timestamp, report.encoded_len)
    );
    let body = lines.next().unwrap();
    assert_eq!(body.len(), report.encoded_len);
    assert_eq!(FrameEncoder::decode(body.as_bytes()).unwrap(), sample_jpeg(1024));
    assert_eq!(lines.next(), Some("END"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_timestamp_format() {
    let rig = Rig::new();
    let camera = rig.ready_camera(fast_settings());
    let mut task = CaptureTask::new(&camera, RecordingUploader::default(), Duration::from_secs(30));

    let report = task.run_once().unwrap();

    assert_eq!(report.timestamp.len(), 15);
    assert!(NaiveDateTime::parse_from_str(&report.timestamp, TIMESTAMP_FORMAT).is_ok());
    assert_eq!(task.uploader().images.len(), 1);
    assert_eq!(task.uploader().images[0].1, report.timestamp);
}

#[test]
fn test_capture_failure_skips_upload() {
    let rig = Rig::with_sensor(MockSensor::with_default_outcome(FrameOutcome::Missing));
    let camera = rig.ready_camera(fast_settings());
    let mut task = CaptureTask::new(&camera, RecordingUploader::default(), Duration::from_secs(30));

    let err = task.run_once().unwrap_err();

    assert!(matches!(err, TaskError::Capture(ref e) if e.is_capture_failure()));
    assert!(task.uploader().images.is_empty());
}

#[test]
fn test_upload_failure_is_reported_and_frame_released() {
    let rig = Rig::new();
    let camera = rig.ready_camera(fast_settings());
    let uploader = RecordingUploader {
        fail: true,
        ..RecordingUploader::default()
    };
    let mut task = CaptureTask::new(&camera, uploader, Duration::from_secs(30));

    assert!(matches!(task.run_once(), Err(TaskError::Upload(_))));
    rig.assert_frames_balanced();

    // 次の周期は成功する
    let mut task = CaptureTask::new(&camera, RecordingUploader::default(), Duration::from_secs(30));
    assert!(task.run_once().is_ok());
}

#[test]
fn test_tick_keeps_going_after_errors() {
    let rig = Rig::new();
    let camera = rig.camera(fast_settings());
    let mut task = CaptureTask::new(&camera, RecordingUploader::default(), Duration::from_secs(30));

    // 未初期化でも周期処理は終了しない
    assert!(task.tick().is_none());
    assert!(task.uploader().images.is_empty());

    camera.initialize_default().unwrap();
    let report = task.tick().unwrap();
    assert_eq!(task.uploader().images.len(), 1);
    assert_eq!(task.uploader().images[0].1, report.timestamp);

    rig.sensor.fail_next(3);
    assert!(task.tick().is_none());
    assert!(task.tick().is_some());
    assert_eq!(task.uploader().images.len(), 2);
    rig.assert_frames_balanced();
}
