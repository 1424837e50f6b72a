pub mod auth;
pub mod export;
pub mod layout;
pub mod pricing;
pub mod reconciler;
pub mod reports;
pub mod tickets;
