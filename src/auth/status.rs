use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    Connected,
    Unknown,
    NotAuthorized,
}

/// Login status reported to callers, recomputed from token presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    pub status: LoginState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginStatus {
    pub fn connected(token: String) -> Self {
        Self {
            status: LoginState::Connected,
            token: Some(token),
            error: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            status: LoginState::Unknown,
            token: None,
            error: None,
        }
    }

    pub fn unknown_with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::unknown()
        }
    }

    pub fn not_authorized(error: Option<String>) -> Self {
        Self {
            status: LoginState::NotAuthorized,
            token: None,
            error,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == LoginState::Connected
    }
}
