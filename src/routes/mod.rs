pub mod health;
pub mod ops;
