use std::time::{Duration, Instant};

/// Bound on a single framed read or write.
///
/// The bound is converted into an absolute deadline when the operation
/// starts and covers the whole message, however many underlying reads or
/// writes that takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Block until the operation completes or the stream fails.
    #[default]
    Never,
    /// Fail once this much time has elapsed. `After(Duration::ZERO)`
    /// expires immediately.
    After(Duration),
}

impl Timeout {
    /// Whole-seconds timeout; `0` means no deadline.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Timeout::Never
        } else {
            Timeout::After(Duration::from_secs(secs))
        }
    }

    /// The bound as a duration, `None` for [`Timeout::Never`].
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Never => None,
            Timeout::After(d) => Some(*d),
        }
    }
}

/// An absolute point in time derived from a [`Timeout`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Option<Instant>,
    timeout: Duration,
}

/// Time left before a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Remaining {
    Unbounded,
    Left(Duration),
    Expired,
}

impl Deadline {
    pub(crate) fn start(timeout: Timeout) -> Self {
        match timeout {
            Timeout::Never => Self {
                at: None,
                timeout: Duration::ZERO,
            },
            Timeout::After(d) => Self {
                at: Instant::now().checked_add(d),
                timeout: d,
            },
        }
    }

    pub(crate) fn remaining(&self) -> Remaining {
        match self.at {
            None => Remaining::Unbounded,
            Some(at) => match at.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => Remaining::Left(left),
                _ => Remaining::Expired,
            },
        }
    }

    pub(crate) fn is_bounded(&self) -> bool {
        self.at.is_some()
    }

    /// The configured bound, for error reporting.
    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seconds_means_never() {
        assert_eq!(Timeout::from_secs(0), Timeout::Never);
        assert_eq!(
            Timeout::from_secs(3),
            Timeout::After(Duration::from_secs(3))
        );
        assert_eq!(Timeout::default(), Timeout::Never);
    }

    #[test]
    fn never_is_unbounded() {
        let deadline = Deadline::start(Timeout::Never);
        assert!(!deadline.is_bounded());
        assert_eq!(deadline.remaining(), Remaining::Unbounded);
    }

    #[test]
    fn zero_duration_expires_immediately() {
        let deadline = Deadline::start(Timeout::After(Duration::ZERO));
        assert!(deadline.is_bounded());
        assert_eq!(deadline.remaining(), Remaining::Expired);
    }

    #[test]
    fn remaining_shrinks() {
        let deadline = Deadline::start(Timeout::After(Duration::from_secs(60)));
        match deadline.remaining() {
            Remaining::Left(left) => assert!(left <= Duration::from_secs(60)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(deadline.timeout(), Duration::from_secs(60));
    }
}
