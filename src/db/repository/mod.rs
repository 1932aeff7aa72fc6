pub mod gift;

pub use gift::GiftRepository;
