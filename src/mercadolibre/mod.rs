// MercadoLibre OAuth callback relay and API proxy

mod oauth;
mod routes;

pub use oauth::{authorization_url, exchange_code, MeliToken};
pub use routes::{build_app, health_routes, relay_routes, RelayState};
