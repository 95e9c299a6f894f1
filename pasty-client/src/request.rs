//! Per-call request descriptors
//!
//! Every API call builds its own `RequestDescriptor`: method, full URL,
//! credentials and serialized body. Descriptors are never shared between
//! calls, so concurrent calls on one client cannot see each other's paths.

use reqwest::header::{
    AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use serde::Serialize;
use url::Url;

use crate::credentials::Credentials;
use crate::error::{ClientError, Result};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const ACCEPT_VERSION: HeaderName = HeaderName::from_static("accept-version");
pub const X_PASTY_TOKEN: HeaderName = HeaderName::from_static("x-pasty-token");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a JSON body
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub credentials: Credentials,
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Build a descriptor for `segments` below `base`.
    ///
    /// Each segment is percent-encoded on its own, so identifiers can never
    /// escape into a different path. An empty trailing segment produces a
    /// trailing slash (`["user", ""]` is `/user/`).
    pub fn new(method: Method, base: &Url, segments: &[&str]) -> Result<Self> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::usage(format!("{} cannot be used as a base URL", base)))?
            .clear()
            .extend(segments);

        Ok(Self {
            method,
            url,
            credentials: Credentials::Anonymous,
            body: None,
        })
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let body = serde_json::to_string(body)
            .map_err(|e| ClientError::usage(format!("Request body is not serializable: {}", e)))?;
        self.body = Some(body);
        Ok(self)
    }

    /// Path and query of the target, e.g. `/server/user/available?username=bob`
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Body bytes sent on the wire; bodyless methods never send one
    pub fn payload(&self) -> &[u8] {
        match (&self.body, self.method.has_body()) {
            (Some(body), true) => body.as_bytes(),
            (None, true) => b"null",
            (_, false) => b"",
        }
    }

    /// Headers for this request.
    ///
    /// `User-Agent`, `Content-Type` and `Content-Length` are always present.
    /// `Accept-Version` is set when an API version is configured, and the
    /// auth headers follow the credentials.
    pub fn headers(&self, user_agent: &str, api_version: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(user_agent)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.payload().len()));

        if let Some(version) = api_version {
            headers.insert(ACCEPT_VERSION, header_value(version)?);
        }
        if let Some(authorization) = self.credentials.authorization() {
            headers.insert(AUTHORIZATION, header_value(&authorization)?);
        }
        if let Some(token) = self.credentials.pasty_token() {
            headers.insert(X_PASTY_TOKEN, header_value(token)?);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::usage(format!("Invalid header value: {:?}", value)))
}
