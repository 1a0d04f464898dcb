use serde::{Deserialize, Serialize};

/// Profile of the signed-in user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// A profile without an id cannot identify anyone.
    pub fn is_empty(&self) -> bool {
        self.user_id.trim().is_empty()
    }

    /// Name to greet the user with, falling back to the id.
    pub fn greeting_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.user_id
        } else {
            &self.display_name
        }
    }
}

/// Body of `POST /auth/callback`.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRequest<'a> {
    pub code: &'a str,
    #[serde(rename = "redirectUri")]
    pub redirect_uri: &'a str,
}

/// Successful answer of `POST /auth/callback`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponse {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
    #[serde(rename = "tokenType", default)]
    pub token_type: Option<String>,
    #[serde(rename = "expiresIn", default)]
    pub expires_in: Option<i64>,
    #[serde(rename = "userInfo", default)]
    pub user_info: Option<UserProfile>,
}

impl ExchangeResponse {
    /// Split into token and profile, rejecting anything partial.
    pub fn into_parts(self) -> Result<(String, UserProfile), String> {
        let token = self
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "exchange response has no access token".to_string())?;
        let user = self
            .user_info
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "exchange response has no user info".to_string())?;
        Ok((token, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exchange_response() {
        let json = r#"{"accessToken":"abc","tokenType":"Bearer","expiresIn":3600,"userInfo":{"userId":"1","displayName":"Ann","email":"a@x.com"}}"#;
        let resp: ExchangeResponse = serde_json::from_str(json).expect("valid exchange json");
        let (token, user) = resp.into_parts().expect("complete response");
        assert_eq!(token, "abc");
        assert_eq!(user.display_name, "Ann");
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_exchange_response_without_user_is_rejected() {
        let resp: ExchangeResponse =
            serde_json::from_str(r#"{"accessToken":"abc"}"#).expect("valid json");
        assert!(resp.into_parts().is_err());
    }

    #[test]
    fn test_exchange_response_with_blank_token_is_rejected() {
        let resp: ExchangeResponse = serde_json::from_str(
            r#"{"accessToken":"  ","userInfo":{"userId":"1","displayName":"Ann"}}"#,
        )
        .expect("valid json");
        assert!(resp.into_parts().is_err());
    }

    #[test]
    fn test_exchange_request_uses_camel_case() {
        let body = serde_json::to_value(ExchangeRequest {
            code: "c0de",
            redirect_uri: "http://127.0.0.1:3000/callback",
        })
        .expect("serializable");
        assert_eq!(body["code"], "c0de");
        assert_eq!(body["redirectUri"], "http://127.0.0.1:3000/callback");
    }

    #[test]
    fn test_greeting_name_falls_back_to_id() {
        let user = UserProfile {
            user_id: "ann42".to_string(),
            display_name: String::new(),
            email: None,
        };
        assert_eq!(user.greeting_name(), "ann42");
    }
}
