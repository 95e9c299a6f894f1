use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A clipboard entry as stored on the server
///
/// The server does not pin down the shape of either field: ids may be
/// strings or numbers and the item may be structured data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipboardItem {
    #[serde(rename = "_id", default)]
    pub id: Value,
    #[serde(default)]
    pub item: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClipboardItem {
    /// The id as text, when it is a string or a number
    pub fn id_string(&self) -> Option<String> {
        id_string(&self.id)
    }
}

/// An authentication token issued by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    #[serde(default)]
    pub token: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// The token value as sent in `X-Pasty-Token`
    pub fn value(&self) -> Option<String> {
        id_string(&self.token)
    }
}

/// Text form of a server-assigned identifier
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub item: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub user: String,
    pub password: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}
