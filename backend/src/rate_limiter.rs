use std::collections::HashMap;
use std::sync::Mutex;
use time::{OffsetDateTime, Duration};
use tracing::{warn, error};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Please try again in {0} minutes.")]
    Exceeded(i64),
    #[error("Internal rate limit error")]
    Internal,
}

#[derive(Debug)]
struct RateLimit {
    attempts: u32,
    first_attempt: OffsetDateTime,
}

/// Fixed-window limiter keyed by caller, e.g. `create_voting:<anonymous id>`.
#[derive(Debug)]
pub struct RateLimiter {
    limits: Mutex<HashMap<String, RateLimit>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window_minutes: i64) -> Self {
        Self {
            limits: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::minutes(window_minutes),
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_at(key, OffsetDateTime::now_utc())
    }

    fn check_at(&self, key: &str, now: OffsetDateTime) -> Result<(), RateLimitError> {
        let result = {
            let mut limits = self.limits.lock().map_err(|e| {
                error!("Failed to acquire rate limit lock: {}", e);
                RateLimitError::Internal
            })?;

            limits.retain(|_, limit| now - limit.first_attempt <= self.window * 2);

            match limits.get_mut(key) {
                Some(limit) if now - limit.first_attempt > self.window => {
                    *limit = RateLimit { attempts: 1, first_attempt: now };
                    Ok(())
                }
                Some(limit) if limit.attempts >= self.max_attempts => {
                    let minutes_to_wait = (limit.first_attempt + self.window - now).whole_minutes();
                    Err(RateLimitError::Exceeded(minutes_to_wait.max(1)))
                }
                Some(limit) => {
                    limit.attempts += 1;
                    Ok(())
                }
                None => {
                    limits.insert(key.to_string(), RateLimit { attempts: 1, first_attempt: now });
                    Ok(())
                }
            }
        };

        if let Err(ref e) = result {
            warn!("Rate limit triggered for key {}: {}", key, e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(2, 60);
        let start = OffsetDateTime::now_utc();

        assert!(limiter.check_at("k", start).is_ok());
        assert!(limiter.check_at("k", start + Duration::minutes(1)).is_ok());
        assert_eq!(
            limiter.check_at("k", start + Duration::minutes(30)),
            Err(RateLimitError::Exceeded(30))
        );
        assert!(limiter.check_at("other", start + Duration::minutes(30)).is_ok());
        assert!(limiter.check_at("k", start + Duration::minutes(61)).is_ok());
    }
}
