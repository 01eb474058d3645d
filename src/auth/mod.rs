// Authentication module
// Credential storage, token exchanges and session recovery

mod redirect;
mod refresh;
mod session;
mod store;
mod types;

pub use redirect::{LoginRedirect, NavigateToLogin};
pub use refresh::endpoint_url;
pub use session::{SessionManager, DEFAULT_LOGIN_URL};
pub use store::{CredentialStore, MemoryCookieJar, SqliteCookieJar};
pub use types::{
    access_token_ttl, refresh_token_ttl, token_prefix, CredentialPair, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
