use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{ClientError, Result};
use crate::executor::{RequestExecutor, Response};
use crate::models::{
    AddItemRequest, ClipboardItem, CreateUserRequest, Token, UpdatePasswordRequest, id_string,
};
use crate::request::{Method, RequestDescriptor};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Client for interacting with a Pasty server
///
/// Cloning is cheap; clones share the transport and the cached token.
#[derive(Clone)]
pub struct PastyClient {
    config: ClientConfig,
    base_url: Url,
    executor: RequestExecutor,
    token: Arc<RwLock<Option<Token>>>,
}

impl PastyClient {
    /// Create a new Pasty client
    ///
    /// Fails when the host and port do not form a valid URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url())
            .map_err(|e| ClientError::usage(format!("Invalid server address: {}", e)))?;
        let executor = RequestExecutor::new(&config)?;

        Ok(Self {
            config,
            base_url,
            executor,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The token most recently obtained through [`PastyClient::request_token`]
    pub async fn cached_token(&self) -> Option<Token> {
        self.token.read().await.clone()
    }

    /// Credentials built from the cached token, or anonymous when none was obtained
    pub async fn cached_credentials(&self) -> Credentials {
        match self.token.read().await.as_ref().and_then(Token::value) {
            Some(token) => Credentials::token(token),
            None => Credentials::Anonymous,
        }
    }

    /// Build a descriptor for a path below the server root
    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestDescriptor> {
        RequestDescriptor::new(method, &self.base_url, segments)
    }

    /// Send a descriptor through the shared pipeline
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Response> {
        self.executor.execute(request).await
    }

    /// Get the server version
    pub async fn server_version(&self) -> Result<Value> {
        let request = self.request(Method::Get, &["server", "version"])?;
        self.execute(&request).await?.into_payload()
    }

    /// Check whether a username is still free
    pub async fn username_available(&self, username: &str) -> Result<Value> {
        require_non_empty("username", username)?;
        let request = self
            .request(Method::Get, &["server", "user", "available"])?
            .with_query("username", username);
        self.execute(&request).await?.into_payload()
    }

    /// List the clipboard items of the authenticated user
    pub async fn list_items(&self, credentials: &Credentials) -> Result<Vec<ClipboardItem>> {
        require_credentials(credentials)?;
        let request = self
            .request(Method::Get, &["clipboard", "list.json"])?
            .with_credentials(credentials.clone());
        let response = self.execute(&request).await?;
        decode(response.payload_field("items")?)
    }

    /// Get a clipboard item by ID
    pub async fn get_item(&self, id: &str, credentials: &Credentials) -> Result<ClipboardItem> {
        require_non_empty("item id", id)?;
        require_credentials(credentials)?;
        let request = self
            .request(Method::Get, &["clipboard", "item", id])?
            .with_credentials(credentials.clone());
        let response = self.execute(&request).await?;
        decode(response.payload()?)
    }

    /// Add a clipboard item
    ///
    /// Returns the ID the server assigned to the new item, as text even when
    /// the server hands out numeric ids.
    ///
    /// # Arguments
    /// * `item` - Content of the new item
    /// * `credentials` - Token or basic credentials; anonymous is rejected
    ///
    /// # Example
    /// ```no_run
    /// use pasty_client::{ClientConfig, Credentials, PastyClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = PastyClient::new(ClientConfig::new("localhost", 4444))?;
    /// let credentials = Credentials::token("my-token");
    ///
    /// let id = client.add_item("Hello, Pasty", &credentials).await?;
    /// println!("Created item {}", id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn add_item(&self, item: &str, credentials: &Credentials) -> Result<String> {
        require_credentials(credentials)?;
        let request = self
            .request(Method::Post, &["clipboard", "item"])?
            .with_credentials(credentials.clone())
            .with_json(&AddItemRequest {
                item: item.to_string(),
            })?;
        let response = self.execute(&request).await?;
        let id = response.payload_field("_id")?;
        id_string(id)
            .ok_or_else(|| ClientError::protocol(format!("Unexpected item id {}", id)))
    }

    /// Delete a clipboard item by ID
    pub async fn delete_item(&self, id: &str, credentials: &Credentials) -> Result<bool> {
        require_non_empty("item id", id)?;
        require_credentials(credentials)?;
        let request = self
            .request(Method::Delete, &["clipboard", "item", id])?
            .with_credentials(credentials.clone());
        self.execute(&request).await?.expect_status(200)
    }

    /// Request a new token with username and password
    ///
    /// The token is kept on the client (see [`PastyClient::cached_token`])
    /// and shared with every clone of it.
    ///
    /// # Arguments
    /// * `user` - Username
    /// * `password` - Password of that user
    ///
    /// # Example
    /// ```no_run
    /// use pasty_client::{ClientConfig, PastyClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = PastyClient::new(ClientConfig::new("localhost", 4444))?;
    ///
    /// let token = client.request_token("alice", "secret").await?;
    /// println!("Token expires at {:?}", token.expires);
    ///
    /// let items = client.list_items(&client.cached_credentials().await).await?;
    /// println!("{} items", items.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request_token(&self, user: &str, password: &str) -> Result<Token> {
        let request = self
            .request(Method::Get, &["user", "token"])?
            .with_credentials(basic(user, password)?);
        let response = self.execute(&request).await?;
        let token: Token = decode(response.payload()?)?;

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Check a token and return its expiry
    pub async fn check_token(&self, token: &str) -> Result<Value> {
        require_non_empty("token", token)?;
        let request = self
            .request(Method::Get, &["user", "token", "validity"])?
            .with_credentials(Credentials::token(token));
        let response = self.execute(&request).await?;
        response.payload_field("expires").cloned()
    }

    /// Create a user; requires the client to be configured with an API key
    ///
    /// Returns `true` when the server answers 201. Any other success status
    /// is reported as [`ClientError::UnexpectedStatus`].
    ///
    /// # Arguments
    /// * `user` - Name of the new user
    /// * `password` - Password of the new user
    ///
    /// # Example
    /// ```no_run
    /// use pasty_client::{ClientConfig, PastyClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ClientConfig::new("localhost", 4444).with_api_key("server-api-key");
    /// let client = PastyClient::new(config)?;
    ///
    /// if client.create_user("bob", "hunter2").await? {
    ///     println!("User created");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_user(&self, user: &str, password: &str) -> Result<bool> {
        require_non_empty("username", user)?;
        require_non_empty("password", password)?;
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| ClientError::usage("Creating users requires an API key"))?;

        let request = self
            .request(Method::Post, &["user", ""])?
            .with_json(&CreateUserRequest {
                user: user.to_string(),
                password: password.to_string(),
                api_key,
            })?;
        self.execute(&request).await?.expect_status(201)
    }

    /// Get information about the authenticated user
    pub async fn user_info(&self, credentials: &Credentials) -> Result<Value> {
        require_credentials(credentials)?;
        let request = self
            .request(Method::Get, &["user"])?
            .with_credentials(credentials.clone());
        self.execute(&request).await?.into_payload()
    }

    /// Change a user's password
    ///
    /// Authenticates with the current password; tokens are not accepted here.
    ///
    /// # Arguments
    /// * `user` - Username
    /// * `current_password` - Password the user has now
    /// * `uid` - ID of the user whose password changes
    /// * `new_password` - Password to set
    ///
    /// # Example
    /// ```no_run
    /// use pasty_client::{ClientConfig, PastyClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = PastyClient::new(ClientConfig::new("localhost", 4444))?;
    ///
    /// client
    ///     .update_password("alice", "secret", "5f1c0ffee", "n3w-secret")
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn update_password(
        &self,
        user: &str,
        current_password: &str,
        uid: &str,
        new_password: &str,
    ) -> Result<bool> {
        require_non_empty("user id", uid)?;
        require_non_empty("new password", new_password)?;
        let request = self
            .request(Method::Put, &["user", uid])?
            .with_credentials(basic(user, current_password)?)
            .with_json(&UpdatePasswordRequest {
                new_password: new_password.to_string(),
            })?;
        self.execute(&request).await?.expect_status(200)
    }

    /// Delete a user
    pub async fn delete_user(&self, user: &str, password: &str, uid: &str) -> Result<bool> {
        require_non_empty("user id", uid)?;
        let request = self
            .request(Method::Delete, &["user", uid])?
            .with_credentials(basic(user, password)?);
        self.execute(&request).await?.expect_status(200)
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClientError::usage(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn require_credentials(credentials: &Credentials) -> Result<()> {
    if credentials.is_anonymous() {
        return Err(ClientError::usage("This endpoint requires credentials"));
    }
    Ok(())
}

fn basic(user: &str, password: &str) -> Result<Credentials> {
    require_non_empty("username", user)?;
    require_non_empty("password", password)?;
    Ok(Credentials::basic(user, password))
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| ClientError::protocol(format!("Unexpected payload {}: {}", value, e)))
}
