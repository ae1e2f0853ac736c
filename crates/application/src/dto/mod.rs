//! Inputs and results of the application services

mod check_in;
mod order;
mod payment;
mod promo_code;
mod stats;

pub use check_in::*;
pub use order::*;
pub use payment::*;
pub use promo_code::*;
pub use stats::*;
