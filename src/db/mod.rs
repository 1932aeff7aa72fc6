pub mod models;
pub mod repository;

pub use models::TurnSlot;
pub use repository::GiftRepository;

#[cfg(test)]
pub mod fixtures;
