// Login redirect strategy

/// Action taken when the session cannot be recovered
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// Default redirect: point the user at the login page
pub struct NavigateToLogin {
    login_url: String,
}

impl NavigateToLogin {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

impl LoginRedirect for NavigateToLogin {
    fn redirect_to_login(&self) {
        tracing::warn!(login_url = %self.login_url, "Session expired, redirecting to login");

        // Always print to stderr regardless of log level
        eprintln!("Session expired. Log in again at {}", self.login_url);
    }
}
