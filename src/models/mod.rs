pub mod tour;
pub mod agent;
pub mod customer_type;
pub mod booking;
pub mod expense;
pub mod seat;

pub use tour::Tour;
pub use agent::Agent;
pub use customer_type::CustomerType;
pub use booking::{Booking, PaymentStatus};
pub use expense::Expense;
pub use seat::{Bus, Seat};
