use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const MAXIMUM_FAILED_LOGINS: u32 = 5;
pub const FAILED_LOGIN_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct FailureRecord {
    count: u32,
    last_failure: Instant,
    in_flight: u32,
}

/// Counts failed logins per remote address.
///
/// A record expires one window after its most recent failure; until then an
/// address with [`MAXIMUM_FAILED_LOGINS`] failures is refused. Attempts that
/// are still being checked count against the limit, so parallel guesses from
/// one address cannot overshoot it.
#[derive(Debug)]
pub struct FailedLoginLimiter {
    limit: u32,
    window: Duration,
    records: Mutex<BTreeMap<IpAddr, FailureRecord>>,
}

/// A reserved login attempt. Dropping it without calling
/// [`LoginAttempt::failed`] gives the reservation back.
#[derive(Debug)]
#[must_use = "dropping the attempt releases it immediately"]
pub struct LoginAttempt<'a> {
    limiter: &'a FailedLoginLimiter,
    address: IpAddr,
    settled: bool,
}

impl LoginAttempt<'_> {
    /// Records the attempt as a failure and returns the address's failure count.
    pub fn failed(mut self, now: Instant) -> u32 {
        self.settled = true;
        self.limiter.settle(self.address, Some(now))
    }
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.limiter.settle(self.address, None);
        }
    }
}

impl FailedLoginLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            records: Mutex::new(BTreeMap::new()),
        }
    }

    /// Reserves an attempt for `address`, or `None` if recorded failures plus
    /// attempts in flight already reach the limit.
    pub fn try_begin(&self, address: IpAddr, now: Instant) -> Option<LoginAttempt<'_>> {
        let mut records = self.lock();
        let record = records.entry(address).or_insert(FailureRecord {
            count: 0,
            last_failure: now,
            in_flight: 0,
        });
        if self.expired(*record, now) {
            record.count = 0;
        }
        if record.count + record.in_flight >= self.limit {
            if record.count == 0 && record.in_flight == 0 {
                records.remove(&address);
            }
            return None;
        }
        record.in_flight += 1;
        Some(LoginAttempt {
            limiter: self,
            address,
            settled: false,
        })
    }

    /// Whether recorded failures alone lock `address` out.
    pub fn is_limited(&self, address: IpAddr, now: Instant) -> bool {
        self.lock()
            .get(&address)
            .is_some_and(|record| !self.expired(*record, now) && record.count >= self.limit)
    }

    fn settle(&self, address: IpAddr, failure: Option<Instant>) -> u32 {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&address) else {
            return 0;
        };
        record.in_flight = record.in_flight.saturating_sub(1);
        if let Some(now) = failure {
            if self.expired(*record, now) {
                record.count = 0;
            }
            record.count += 1;
            record.last_failure = now;
            tracing::debug!(%address, failures = record.count, "failed login recorded");
        }
        let count = record.count;
        if count == 0 && record.in_flight == 0 {
            records.remove(&address);
        }
        count
    }

    fn expired(&self, record: FailureRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.last_failure) >= self.window
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<IpAddr, FailureRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FailedLoginLimiter {
    fn default() -> Self {
        Self::new(MAXIMUM_FAILED_LOGINS, FAILED_LOGIN_WINDOW)
    }
}
