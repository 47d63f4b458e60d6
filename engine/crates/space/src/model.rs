use std::fmt::Debug;

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("{0} is already placed in a region")]
    AlreadyPlaced(String),

    #[error("{0} is not placed in any region")]
    NotPlaced(String),
}

impl RegionError {
    pub fn already_placed(key: impl Debug) -> Self {
        Self::AlreadyPlaced(format!("{key:?}"))
    }

    pub fn not_placed(key: impl Debug) -> Self {
        Self::NotPlaced(format!("{key:?}"))
    }
}
