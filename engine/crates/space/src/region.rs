use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use crate::model::RegionError;

/// Width of a region in tiles.
pub const REGION_SIZE: i32 = 8;

/// Regions scanned in each direction around a viewer.
pub const VIEWABLE_REGION_RADIUS: i32 = 3;

/// Width in tiles of the map area a client keeps loaded.
pub const VIEWPORT_WIDTH: i32 = REGION_SIZE * 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoordinates {
    pub x: i32,
    pub y: i32,
}

impl RegionCoordinates {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// This region and every region within [`VIEWABLE_REGION_RADIUS`], in ascending order.
    pub fn surrounding(&self) -> impl Iterator<Item = RegionCoordinates> + '_ {
        let r = VIEWABLE_REGION_RADIUS;
        (self.x - r..=self.x + r)
            .flat_map(move |x| (self.y - r..=self.y + r).map(move |y| RegionCoordinates::new(x, y)))
    }
}

impl std::fmt::Display for RegionCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R({}, {})", self.x, self.y)
    }
}

/// Spatial index of keys by region.
///
/// All internal structures use BTreeMap/BTreeSet so scans visit regions and
/// their occupants in a deterministic order.
#[derive(Debug)]
pub struct RegionRepository<K> {
    locations: BTreeMap<K, RegionCoordinates>,
    occupants: BTreeMap<RegionCoordinates, BTreeSet<K>>,
}

impl<K: Ord + Copy + Debug> RegionRepository<K> {
    pub fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
            occupants: BTreeMap::new(),
        }
    }

    pub fn place(&mut self, key: K, region: RegionCoordinates) -> Result<(), RegionError> {
        if self.locations.contains_key(&key) {
            return Err(RegionError::already_placed(key));
        }
        self.locations.insert(key, region);
        self.occupants.entry(region).or_default().insert(key);
        Ok(())
    }

    /// Places `key` in `region`, moving it if it is elsewhere. Returns whether anything changed.
    pub fn relocate(&mut self, key: K, region: RegionCoordinates) -> bool {
        match self.locations.get(&key).copied() {
            Some(current) if current == region => false,
            Some(current) => {
                self.leave(key, current);
                self.locations.insert(key, region);
                self.occupants.entry(region).or_default().insert(key);
                tracing::trace!(key = ?key, from = %current, to = %region, "region changed");
                true
            }
            None => {
                self.locations.insert(key, region);
                self.occupants.entry(region).or_default().insert(key);
                true
            }
        }
    }

    pub fn remove(&mut self, key: K) -> Result<RegionCoordinates, RegionError> {
        let region = self
            .locations
            .remove(&key)
            .ok_or_else(|| RegionError::not_placed(key))?;
        self.leave(key, region);
        Ok(region)
    }

    pub fn region_of(&self, key: K) -> Option<RegionCoordinates> {
        self.locations.get(&key).copied()
    }

    pub fn occupants(&self, region: RegionCoordinates) -> impl Iterator<Item = K> + '_ {
        self.occupants.get(&region).into_iter().flatten().copied()
    }

    /// Occupants of every region surrounding `region`, region by region.
    pub fn surrounding_occupants(&self, region: RegionCoordinates) -> impl Iterator<Item = K> + '_ {
        region
            .surrounding()
            .collect::<Vec<_>>()
            .into_iter()
            .flat_map(move |r| self.occupants(r))
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn region_count(&self) -> usize {
        self.occupants.len()
    }

    fn leave(&mut self, key: K, region: RegionCoordinates) {
        if let Some(set) = self.occupants.get_mut(&region) {
            set.remove(&key);
            if set.is_empty() {
                self.occupants.remove(&region);
            }
        }
    }
}

impl<K: Ord + Copy + Debug> Default for RegionRepository<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32) -> RegionCoordinates {
        RegionCoordinates::new(x, y)
    }

    #[test]
    fn surrounding_is_a_seven_by_seven_block() {
        let all: Vec<_> = region(10, 10).surrounding().collect();
        assert_eq!(all.len(), 49);
        assert_eq!(all[0], region(7, 7));
        assert_eq!(all[48], region(13, 13));
        assert!(all.contains(&region(10, 10)));
    }

    #[test]
    fn place_and_query() {
        let mut repo = RegionRepository::new();
        repo.place(1u32, region(1, 1)).unwrap();
        repo.place(2u32, region(1, 1)).unwrap();
        assert_eq!(repo.occupants(region(1, 1)).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(repo.region_of(2), Some(region(1, 1)));
    }

    #[test]
    fn place_twice_fails() {
        let mut repo = RegionRepository::new();
        repo.place(1u32, region(0, 0)).unwrap();
        assert!(matches!(
            repo.place(1, region(2, 2)),
            Err(RegionError::AlreadyPlaced(_))
        ));
    }

    #[test]
    fn relocate_moves_between_regions() {
        let mut repo = RegionRepository::new();
        repo.place(7u32, region(0, 0)).unwrap();
        assert!(!repo.relocate(7, region(0, 0)));
        assert!(repo.relocate(7, region(0, 1)));
        assert_eq!(repo.occupants(region(0, 0)).count(), 0);
        assert_eq!(repo.region_count(), 1);
        assert_eq!(repo.region_of(7), Some(region(0, 1)));
    }

    #[test]
    fn remove_unplaced_fails() {
        let mut repo: RegionRepository<u32> = RegionRepository::new();
        assert!(repo.remove(3).is_err());
    }

    #[test]
    fn surrounding_occupants_in_region_then_key_order() {
        let mut repo = RegionRepository::new();
        repo.place(5u32, region(11, 10)).unwrap();
        repo.place(9u32, region(9, 10)).unwrap();
        repo.place(2u32, region(9, 10)).unwrap();
        repo.place(4u32, region(20, 20)).unwrap();
        let seen: Vec<_> = repo.surrounding_occupants(region(10, 10)).collect();
        assert_eq!(seen, vec![2, 9, 5]);
    }
}
