use std::collections::BTreeSet;

use crate::id::MobId;

/// A value that can occupy a slot of a [`MobRepository`].
///
/// The repository writes the 1-based slot index on insertion and resets it to
/// `0` (unassigned) on removal.
pub trait Indexed {
    fn index(&self) -> usize;
    fn set_index(&mut self, index: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor has no current element")]
    NoCurrent,
    #[error("current element no longer matches its slot")]
    Stale,
}

/// Fixed-capacity slot allocator handing out the lowest free index first.
#[derive(Debug)]
pub struct MobRepository<T> {
    slots: Vec<Option<T>>,
    generations: Vec<u32>,
    free: BTreeSet<usize>,
    size: usize,
}

impl<T: Indexed> MobRepository<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            generations: vec![0; capacity],
            free: (0..capacity).collect(),
            size: 0,
        }
    }

    /// Stores `mob` in the lowest free slot and returns its id.
    ///
    /// The mob is handed back when the repository is full or the chosen slot
    /// turns out to be occupied.
    pub fn add(&mut self, mut mob: T) -> Result<MobId, T> {
        let Some(slot) = self.free.pop_first() else {
            return Err(mob);
        };
        if self.slots[slot].is_some() {
            tracing::error!(index = slot + 1, "free slot is already occupied");
            return Err(mob);
        }

        let generation = self.generations[slot].wrapping_add(1);
        self.generations[slot] = generation;
        mob.set_index(slot + 1);
        self.slots[slot] = Some(mob);
        self.size += 1;
        Ok(MobId::new(slot + 1, generation))
    }

    /// Removes the mob at `index`. Out-of-range, empty and stale slots yield `None`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index == 0 || index > self.capacity() {
            return None;
        }
        let slot = index - 1;
        match self.slots[slot].take() {
            Some(mut mob) if mob.index() == index => {
                mob.set_index(0);
                self.free.insert(slot);
                self.size -= 1;
                Some(mob)
            }
            other => {
                self.slots[slot] = other;
                None
            }
        }
    }

    /// Removes the mob identified by `id`, rejecting ids from an earlier generation.
    pub fn remove_id(&mut self, id: MobId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        self.remove(id.index)
    }

    /// # Panics
    ///
    /// Panics if `index` is `0` or greater than the capacity.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.check_index(index);
        self.slots[index - 1].as_ref()
    }

    /// # Panics
    ///
    /// Panics if `index` is `0` or greater than the capacity.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.check_index(index);
        self.slots[index - 1].as_mut()
    }

    /// Returns the id of the mob currently occupying `index`, if any.
    pub fn id(&self, index: usize) -> Option<MobId> {
        if index == 0 || index > self.capacity() {
            return None;
        }
        self.slots[index - 1]
            .as_ref()
            .map(|_| MobId::new(index, self.generations[index - 1]))
    }

    pub fn contains(&self, id: MobId) -> bool {
        id.index != 0
            && id.index <= self.capacity()
            && self.slots[id.index - 1].is_some()
            && self.generations[id.index - 1] == id.generation
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Iterates occupied slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Iterates occupied slots together with their ids.
    pub fn entries(&self) -> impl Iterator<Item = (MobId, &T)> {
        self.slots
            .iter()
            .zip(self.generations.iter())
            .enumerate()
            .filter_map(|(slot, (mob, generation))| {
                mob.as_ref().map(|m| (MobId::new(slot + 1, *generation), m))
            })
    }

    /// Returns a cursor that walks the repository and may remove the element
    /// it currently points at.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor {
            repository: self,
            next_slot: 0,
            current: None,
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut cursor = self.cursor();
        while let Some(mob) = cursor.advance() {
            if !keep(mob) {
                if let Ok(mob) = cursor.remove() {
                    removed.push(mob);
                }
            }
        }
        removed
    }

    fn check_index(&self, index: usize) {
        assert!(
            index != 0 && index <= self.capacity(),
            "mob index {index} outside 1..={}",
            self.capacity()
        );
    }
}

/// Walks a [`MobRepository`] in ascending slot order.
pub struct Cursor<'a, T> {
    repository: &'a mut MobRepository<T>,
    next_slot: usize,
    current: Option<usize>,
}

impl<T: Indexed> Cursor<'_, T> {
    pub fn advance(&mut self) -> Option<&mut T> {
        self.current = None;
        while self.next_slot < self.repository.capacity() {
            let slot = self.next_slot;
            self.next_slot += 1;
            if self.repository.slots[slot].is_some() {
                self.current = Some(slot);
                return self.repository.slots[slot].as_mut();
            }
        }
        None
    }

    /// Removes the element returned by the last call to [`Cursor::advance`].
    ///
    /// A second removal before advancing again fails with [`CursorError::NoCurrent`].
    pub fn remove(&mut self) -> Result<T, CursorError> {
        let slot = self.current.take().ok_or(CursorError::NoCurrent)?;
        self.repository.remove(slot + 1).ok_or(CursorError::Stale)
    }
}
