pub mod gifts;
pub mod health;
