use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Connection caps enforced at accept time.
#[derive(Debug, Clone)]
pub struct ConnectionLimits {
    pub max_total: usize,
    pub max_per_address: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_total: 2048,
            max_per_address: 5,
        }
    }
}

/// Reason a connection was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRejection {
    TotalLimitReached,
    AddressLimitReached,
}

impl std::fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalLimitReached => write!(f, "server at max connections"),
            Self::AddressLimitReached => write!(f, "too many connections from this address"),
        }
    }
}

#[derive(Debug)]
struct FilterState {
    limits: ConnectionLimits,
    total: usize,
    per_address: BTreeMap<IpAddr, usize>,
}

/// Counts live connections per remote address. Cloning shares the counts.
#[derive(Debug, Clone)]
pub struct ConnectionFilter {
    state: Arc<Mutex<FilterState>>,
}

impl ConnectionFilter {
    pub fn new(limits: ConnectionLimits) -> Self {
        Self {
            state: Arc::new(Mutex::new(FilterState {
                limits,
                total: 0,
                per_address: BTreeMap::new(),
            })),
        }
    }

    /// Admits a connection from `address`. The slot is held until the permit is dropped.
    pub fn try_admit(&self, address: IpAddr) -> Result<ConnectionPermit, ConnectionRejection> {
        let mut state = self.lock();
        if state.total >= state.limits.max_total {
            return Err(ConnectionRejection::TotalLimitReached);
        }
        let max_per_address = state.limits.max_per_address;
        let count = state.per_address.entry(address).or_insert(0);
        if *count >= max_per_address {
            return Err(ConnectionRejection::AddressLimitReached);
        }
        *count += 1;
        state.total += 1;
        Ok(ConnectionPermit {
            filter: self.clone(),
            address,
        })
    }

    pub fn total_connections(&self) -> usize {
        self.lock().total
    }

    pub fn connections_from(&self, address: IpAddr) -> usize {
        self.lock().per_address.get(&address).copied().unwrap_or(0)
    }

    fn release(&self, address: IpAddr) {
        let mut state = self.lock();
        if let Some(count) = state.per_address.get_mut(&address) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.per_address.remove(&address);
            }
        }
        state.total = state.total.saturating_sub(1);
    }

    fn lock(&self) -> MutexGuard<'_, FilterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A slot in the [`ConnectionFilter`], released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    filter: ConnectionFilter,
    address: IpAddr,
}

impl ConnectionPermit {
    pub fn address(&self) -> IpAddr {
        self.address
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.filter.release(self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn admits_within_limit() {
        let filter = ConnectionFilter::new(ConnectionLimits {
            max_total: 10,
            max_per_address: 3,
        });
        let permits: Vec<_> = (0..3).map(|_| filter.try_admit(ip(1)).unwrap()).collect();
        assert_eq!(permits.len(), 3);
        assert_eq!(filter.total_connections(), 3);
        assert_eq!(filter.connections_from(ip(1)), 3);
    }

    #[test]
    fn rejects_per_address() {
        let filter = ConnectionFilter::new(ConnectionLimits {
            max_total: 100,
            max_per_address: 2,
        });
        let _a = filter.try_admit(ip(1)).unwrap();
        let _b = filter.try_admit(ip(1)).unwrap();
        assert_eq!(
            filter.try_admit(ip(1)).unwrap_err(),
            ConnectionRejection::AddressLimitReached
        );
        assert!(filter.try_admit(ip(2)).is_ok());
    }

    #[test]
    fn rejects_total() {
        let filter = ConnectionFilter::new(ConnectionLimits {
            max_total: 2,
            max_per_address: 10,
        });
        let _a = filter.try_admit(ip(1)).unwrap();
        let _b = filter.try_admit(ip(2)).unwrap();
        assert_eq!(
            filter.try_admit(ip(3)).unwrap_err(),
            ConnectionRejection::TotalLimitReached
        );
    }

    #[test]
    fn dropping_permit_releases_slot() {
        let filter = ConnectionFilter::new(ConnectionLimits {
            max_total: 10,
            max_per_address: 1,
        });
        let permit = filter.try_admit(ip(5)).unwrap();
        assert!(filter.try_admit(ip(5)).is_err());
        drop(permit);
        assert_eq!(filter.connections_from(ip(5)), 0);
        assert!(filter.try_admit(ip(5)).is_ok());
    }
}
