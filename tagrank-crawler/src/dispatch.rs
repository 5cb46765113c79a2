use futures::future::try_join_all;
use std::future::Future;
use std::time::Duration;
use tagrank_common::Result;
use tokio::time::sleep;

/// How per-hashtag lookups are released onto the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Start every lookup at once.
    Immediate,
    /// Start lookup `i` at `i * interval`, to stay under instance rate limits.
    FixedInterval(Duration),
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::FixedInterval(Duration::from_millis(25))
    }
}

impl DispatchPolicy {
    /// Zero means [`DispatchPolicy::Immediate`].
    pub fn from_millis(interval_ms: u64) -> Self {
        if interval_ms == 0 {
            Self::Immediate
        } else {
            Self::FixedInterval(Duration::from_millis(interval_ms))
        }
    }

    /// Delay before the `index`-th task is started.
    ///
    /// ```
    /// use std::time::Duration;
    /// use tagrank_crawler::DispatchPolicy;
    ///
    /// let paced = DispatchPolicy::from_millis(25);
    /// assert_eq!(paced.offset(0), Duration::ZERO);
    /// assert_eq!(paced.offset(4), Duration::from_millis(100));
    /// assert_eq!(DispatchPolicy::Immediate.offset(4), Duration::ZERO);
    /// ```
    pub fn offset(&self, index: usize) -> Duration {
        match self {
            Self::Immediate => Duration::ZERO,
            Self::FixedInterval(interval) => {
                let n = u32::try_from(index).unwrap_or(u32::MAX);
                interval.saturating_mul(n)
            }
        }
    }

    /// Run all tasks concurrently, paced by this policy, and wait for every one.
    ///
    /// Output order follows input order. The first error is returned and the
    /// remaining tasks are dropped without being awaited.
    pub async fn join_all<I, F, T>(&self, tasks: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T>>,
    {
        let paced = tasks.into_iter().enumerate().map(|(i, task)| {
            let delay = self.offset(i);
            async move {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                task.await
            }
        });
        try_join_all(paced).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagrank_common::TagrankError;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fixed_interval_staggers_starts() {
        let t0 = Instant::now();
        let policy = DispatchPolicy::from_millis(25);
        let started = policy
            .join_all((0..4).map(|_| async { Ok(Instant::now() - t0) }))
            .await
            .unwrap();
        let expected: Vec<Duration> = (0..4).map(|i| Duration::from_millis(25 * i)).collect();
        assert_eq!(started, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_starts_together() {
        let t0 = Instant::now();
        let started = DispatchPolicy::Immediate
            .join_all((0..3).map(|_| async { Ok(Instant::now() - t0) }))
            .await
            .unwrap();
        assert!(started.iter().all(|d| d.is_zero()));
    }

    #[tokio::test]
    async fn first_error_aborts() {
        let res: Result<Vec<u32>> = DispatchPolicy::Immediate
            .join_all((0..3u32).map(|i| async move {
                if i == 1 {
                    Err(TagrankError::Fetch("boom".into()))
                } else {
                    Ok(i)
                }
            }))
            .await;
        assert!(matches!(res, Err(TagrankError::Fetch(_))));
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let out: Vec<u8> = DispatchPolicy::default()
            .join_all(std::iter::empty::<std::future::Ready<Result<u8>>>())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn default_is_paced() {
        assert_eq!(
            DispatchPolicy::default(),
            DispatchPolicy::FixedInterval(Duration::from_millis(25))
        );
    }
}
