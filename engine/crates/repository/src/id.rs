/// Identifies a mob by its 1-based slot index and the generation of that slot.
///
/// The generation changes every time a slot is reused, so an id captured
/// before a removal never matches the mob that later takes the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MobId {
    pub index: usize,
    pub generation: u32,
}

impl MobId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl std::fmt::Display for MobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M({}v{})", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_index_first() {
        let a = MobId::new(1, 9);
        let b = MobId::new(2, 0);
        assert!(a < b);
    }

    #[test]
    fn display_format() {
        assert_eq!(MobId::new(42, 7).to_string(), "M(42v7)");
    }
}
