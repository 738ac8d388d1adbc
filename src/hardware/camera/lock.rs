use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// カメラハードウェアの排他トークン（バイナリセマフォ）
///
/// 待ち時間の上限付きで取得し、ガードのドロップで解放する。
#[derive(Debug, Default)]
pub struct ExclusiveToken {
    held: Mutex<bool>,
    released: Condvar,
}

impl ExclusiveToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// `timeout` まで待ってトークンを取得する。取得できなければ `None`
    pub fn acquire(&self, timeout: Duration) -> Option<TokenGuard<'_>> {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut held, _) = self
            .released
            .wait_timeout_while(held, timeout, |held| *held)
            .unwrap_or_else(PoisonError::into_inner);

        if *held {
            return None;
        }
        *held = true;
        Some(TokenGuard { token: self })
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        *held = false;
        self.released.notify_one();
    }
}

/// トークン保持中を表すガード
#[derive(Debug)]
pub struct TokenGuard<'a> {
    token: &'a ExclusiveToken,
}

impl Drop for TokenGuard<'_> {
    fn drop(&mut self) {
        self.token.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn second_acquire_times_out_while_held() {
        let token = ExclusiveToken::new();
        let guard = token.acquire(Duration::from_millis(10));
        assert!(guard.is_some());
        assert!(token.is_held());

        let start = Instant::now();
        assert!(token.acquire(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));

        drop(guard);
        assert!(!token.is_held());
        assert!(token.acquire(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn waiter_gets_token_after_release() {
        let token = Arc::new(ExclusiveToken::new());
        let guard = token.acquire(Duration::ZERO).unwrap();

        let waiter = {
            let token = Arc::clone(&token);
            thread::spawn(move || token.acquire(Duration::from_secs(2)).is_some())
        };

        thread::sleep(Duration::from_millis(20));
        drop(guard);
        assert!(waiter.join().unwrap());
    }
}
