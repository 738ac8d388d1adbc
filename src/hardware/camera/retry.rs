/// 指数バックオフ付きリトライ制御
///
/// 試行回数の上限と全体の制限時間のうち、先に到達した方でループを止める。
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub deadline: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            deadline,
        }
    }

    /// `attempt` 回目の失敗後に待つ時間: base * 2^(attempt-1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << shift)
    }
}

/// リトライが失敗した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryFailure {
    /// 全試行が失敗した
    Exhausted { attempts: u32 },
    /// 制限時間に達した
    DeadlineExceeded { attempts: u32, elapsed: Duration },
}

impl RetryFailure {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryFailure::Exhausted { attempts } => *attempts,
            RetryFailure::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }
}

pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 試行関数が `Some` を返すまで繰り返す
    ///
    /// 試行関数には1始まりの試行番号が渡される。最後の試行の後には待たない。
    /// 制限時間は各試行の前と各待機の前に確認し、制限時間をまたぐ待機は行わない。
    pub fn run<T>(&self, mut attempt_fn: impl FnMut(u32) -> Option<T>) -> Result<T, RetryFailure> {
        let start = Instant::now();
        let mut attempts = 0;

        for attempt in 1..=self.policy.max_attempts {
            if start.elapsed() >= self.policy.deadline {
                warn!(
                    "Retry deadline reached before attempt {} ({} ms)",
                    attempt,
                    start.elapsed().as_millis()
                );
                return Err(RetryFailure::DeadlineExceeded {
                    attempts,
                    elapsed: start.elapsed(),
                });
            }

            attempts = attempt;
            if let Some(value) = attempt_fn(attempt) {
                if attempt > 1 {
                    info!("試行 {} 回目で成功しました", attempt);
                }
                return Ok(value);
            }

            if attempt < self.policy.max_attempts {
                let delay = self.policy.backoff(attempt);
                let resume_at = start.elapsed().checked_add(delay);
                if resume_at.map_or(true, |t| t >= self.policy.deadline) {
                    warn!(
                        "Attempt {} failed; backoff of {} ms would exceed the {} ms deadline",
                        attempt,
                        delay.as_millis(),
                        self.policy.deadline.as_millis()
                    );
                    return Err(RetryFailure::DeadlineExceeded {
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                warn!(
                    "Capture attempt {} failed, retrying in {} ms...",
                    attempt,
                    delay.as_millis()
                );
                thread::sleep(delay);
            }
        }

        Err(RetryFailure::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, base_ms: u64, deadline_ms: u64) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(base_ms),
            Duration::from_millis(deadline_ms),
        )
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let p = policy(3, 100, 2000);
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let controller = RetryController::new(policy(0, 1, 1000));
        let mut calls = 0;
        let result: Result<(), _> = controller.run(|_| {
            calls += 1;
            None
        });
        assert_eq!(calls, 1);
        assert_eq!(result, Err(RetryFailure::Exhausted { attempts: 1 }));
    }

    #[test]
    fn first_success_stops_the_loop() {
        let controller = RetryController::new(policy(5, 1, 1000));
        let mut seen = Vec::new();
        let result = controller.run(|attempt| {
            seen.push(attempt);
            (attempt == 2).then_some("frame")
        });
        assert_eq!(result, Ok("frame"));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn always_failing_runs_exactly_max_attempts() {
        let controller = RetryController::new(policy(4, 1, 5000));
        let mut calls = 0;
        let result: Result<(), _> = controller.run(|_| {
            calls += 1;
            None
        });
        assert_eq!(calls, 4);
        assert_eq!(result, Err(RetryFailure::Exhausted { attempts: 4 }));
    }

    #[test]
    fn deadline_stops_before_attempts_run_out() {
        // バックオフ 50ms, 100ms, ... に対して制限時間 120ms
        let controller = RetryController::new(policy(10, 50, 120));
        let mut calls = 0;
        let result: Result<(), _> = controller.run(|_| {
            calls += 1;
            None
        });
        assert!(matches!(result, Err(RetryFailure::DeadlineExceeded { .. })));
        assert!(calls < 10);
        assert_eq!(result.unwrap_err().attempts(), calls);
    }

    #[test]
    fn saturated_backoff_ends_at_deadline() {
        // 上限まで飽和したバックオフでも経過時間との加算で溢れない
        let controller = RetryController::new(RetryPolicy::new(
            3,
            Duration::MAX,
            Duration::from_secs(1),
        ));
        let mut calls = 0;
        let result: Result<(), _> = controller.run(|_| {
            calls += 1;
            None
        });
        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(RetryFailure::DeadlineExceeded { attempts: 1, .. })
        ));
    }
}
