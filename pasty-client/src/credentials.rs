use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Authentication attached to a single request.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    Anonymous,
    Token(String),
    Basic { user: String, password: String },
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Pick credentials from whatever the caller has at hand.
    ///
    /// A token wins over a username/password pair; a pair is only used when
    /// both halves are present.
    pub fn resolve(token: Option<String>, user: Option<String>, password: Option<String>) -> Self {
        match (token, user, password) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(user), Some(password)) => Credentials::Basic { user, password },
            _ => Credentials::Anonymous,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }

    /// Short label for logs; never includes secrets.
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Anonymous => "anonymous",
            Credentials::Token(_) => "token",
            Credentials::Basic { .. } => "basic",
        }
    }

    /// Value of the `Authorization` header, if these credentials carry one
    pub fn authorization(&self) -> Option<String> {
        match self {
            Credentials::Basic { user, password } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", user, password))
            )),
            _ => None,
        }
    }

    /// Value of the `X-Pasty-Token` header, if these credentials carry one
    pub fn pasty_token(&self) -> Option<&str> {
        match self {
            Credentials::Token(token) => Some(token),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"***")
                .finish(),
        }
    }
}
