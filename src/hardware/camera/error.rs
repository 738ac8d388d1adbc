use std::time::Duration;

/// タイムアウトの発生箇所
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// カメラの排他ロックを取得できなかった
    Lock(Duration),
    /// リトライ全体の制限時間を超えた
    RetryDeadline(Duration),
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutKind::Lock(wait) => write!(f, "camera lock not acquired within {:?}", wait),
            TimeoutKind::RetryDeadline(limit) => {
                write!(f, "capture retries exceeded deadline of {:?}", limit)
            }
        }
    }
}

/// カメラサブシステムのエラー
///
/// ドライバ固有のエラーはここで変換され、上位には生のエラーコードを渡さない。
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CameraError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("memory allocation failed in both tiers: {requested} bytes")]
    ResourceExhausted { requested: usize },

    #[error("timeout: {0}")]
    Timeout(TimeoutKind),

    #[error("all {attempts} capture attempts failed")]
    CaptureFailed { attempts: u32 },

    #[error("base64 encoding failed: {0}")]
    EncodingFailed(String),

    #[error("hardware fault: {0}")]
    HardwareFault(String),
}

impl CameraError {
    /// 呼び出し側から見て「撮影失敗」として扱うべきか
    ///
    /// リトライ上限到達と制限時間超過はどちらも撮影失敗になる。
    pub fn is_capture_failure(&self) -> bool {
        matches!(
            self,
            CameraError::CaptureFailed { .. }
                | CameraError::Timeout(TimeoutKind::RetryDeadline(_))
        )
    }
}

impl From<super::driver::SensorError> for CameraError {
    fn from(error: super::driver::SensorError) -> Self {
        CameraError::HardwareFault(error.to_string())
    }
}

impl From<super::driver::PinError> for CameraError {
    fn from(error: super::driver::PinError) -> Self {
        CameraError::HardwareFault(error.to_string())
    }
}

pub type CameraResult<T> = Result<T, CameraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_and_exhaustion_are_capture_failures() {
        assert!(CameraError::CaptureFailed { attempts: 3 }.is_capture_failure());
        assert!(
            CameraError::Timeout(TimeoutKind::RetryDeadline(Duration::from_secs(2)))
                .is_capture_failure()
        );
        assert!(
            !CameraError::Timeout(TimeoutKind::Lock(Duration::from_secs(10))).is_capture_failure()
        );
        assert!(!CameraError::ResourceExhausted { requested: 10 }.is_capture_failure());
    }
}
