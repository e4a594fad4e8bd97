//! Per-resource request builders.
//!
//! Each resource family gets a thin, borrowing facade over [`ApiClient`]
//! that knows its paths and query parameters. No caching, no retries; each
//! call is a fresh round trip.

mod auth;
mod customers;
mod products;
mod sales;
mod settings;
mod stores;
mod system;
mod users;

pub use auth::AuthApi;
pub use customers::CustomersApi;
pub use products::{ProductFilter, ProductsApi};
pub use sales::SalesApi;
pub use settings::SettingsApi;
pub use stores::StoresApi;
pub use system::SystemApi;
pub use users::{UserFilter, UsersApi};

/// Shared helper: push a query pair when the value is present.
fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<String>) {
    if let Some(v) = value {
        query.push((key, v));
    }
}
