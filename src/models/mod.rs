pub mod availability;
pub mod order;
