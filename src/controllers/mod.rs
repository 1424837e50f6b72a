pub mod admin;
pub mod agents;
pub mod auth;
pub mod bookings;
pub mod buses;
pub mod customer_types;
pub mod expenses;
pub mod reports;
pub mod tickets;
pub mod tours;
pub mod ws;

use axum::Router;
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(tours::routes())
        .merge(agents::routes())
        .merge(customer_types::routes())
        .merge(buses::routes())
        .merge(bookings::routes())
        .merge(expenses::routes())
        .merge(reports::routes())
        .merge(tickets::routes())
        .merge(admin::routes())
        .merge(ws::routes())
}

/// Ответ без тела данных, например на удаление.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Ack { success: true }
    }
}
