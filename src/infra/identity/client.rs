use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};

use crate::application::identity::{
    IdentityError, IdentityProvider, IdentityUser, NewIdentityUser,
};
use crate::config::IdentitySettings;
use crate::infra::error::InfraError;

/// Admin client for an Identity Toolkit style account API.
#[derive(Clone, Debug)]
pub struct IdentityToolkitClient {
    client: Client,
    accounts: Url,
    access_token: String,
}

impl IdentityToolkitClient {
    pub fn new(base: &Url, project_id: &str, access_token: String) -> Result<Self, InfraError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let accounts = base
            .join(&format!("v1/projects/{project_id}/"))
            .map_err(|err| InfraError::client("identity", err.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("peaklife/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::client("identity", err.to_string()))?;
        Ok(Self {
            client,
            accounts,
            access_token,
        })
    }

    /// `None` when the project id or access token is missing.
    pub fn from_settings(settings: &IdentitySettings) -> Result<Option<Self>, InfraError> {
        match (settings.project_id.as_deref(), settings.access_token.as_ref()) {
            (Some(project), Some(token)) => {
                Self::new(&settings.base_url, project, token.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn endpoint(&self, action: &str) -> Result<Url, IdentityError> {
        // `./` keeps `accounts:lookup` from parsing as a scheme.
        self.accounts
            .join(&format!("./{action}"))
            .map_err(|err| IdentityError::Transport(err.to_string()))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> Result<T, IdentityError> {
        let url = self.endpoint(action)?;
        debug!(%url, "identity request");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(provider_error(status, &bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| IdentityError::Transport(format!("failed to parse body: {err}")))
    }

    async fn lookup(&self, body: serde_json::Value) -> Result<Option<IdentityUser>, IdentityError> {
        let found: LookupResponse = self.call("accounts:lookup", body).await?;
        found
            .users
            .into_iter()
            .next()
            .map(AccountInfo::into_user)
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedAccount {
    local_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    custom_attributes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CustomAttributes {
    #[serde(default)]
    admin: bool,
}

impl AccountInfo {
    fn into_user(self) -> Result<IdentityUser, IdentityError> {
        let attributes = match self.custom_attributes.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<CustomAttributes>(raw)
                .map_err(|err| IdentityError::Transport(format!("bad custom claims: {err}")))?,
            _ => CustomAttributes::default(),
        };
        Ok(IdentityUser {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            is_admin: attributes.admin,
        })
    }
}

/// Provider error codes arrive as `{"error": {"message": "EMAIL_EXISTS"}}`,
/// sometimes with a ` : detail` suffix.
fn provider_error(status: StatusCode, body: &[u8]) -> IdentityError {
    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    let code = message.split(':').next().unwrap_or_default().trim();

    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => IdentityError::EmailExists,
        "USER_NOT_FOUND" | "EMAIL_NOT_FOUND" => IdentityError::UserNotFound,
        _ => {
            warn!(%status, message = %message, "identity provider rejected request");
            IdentityError::Rejected(message)
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn create_user(&self, user: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        let mut body = json!({
            "email": user.email,
            "password": user.password,
            "displayName": user.display_name,
        });
        if let Some(photo) = user.photo_url.as_ref() {
            body["photoUrl"] = json!(photo);
        }

        let created: CreatedAccount = self.call("accounts", body).await?;
        Ok(IdentityUser {
            uid: created.local_id,
            email: Some(user.email),
            display_name: Some(user.display_name),
            photo_url: user.photo_url,
            is_admin: false,
        })
    }

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call("accounts:delete", json!({ "localId": uid }))
            .await?;
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<IdentityUser>, IdentityError> {
        self.lookup(json!({ "localId": [uid] })).await
    }

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        self.lookup(json!({ "email": [email] })).await
    }

    async fn set_admin_claim(&self, uid: &str, is_admin: bool) -> Result<(), IdentityError> {
        let attributes = serde_json::to_string(&CustomAttributes { admin: is_admin })
            .map_err(|err| IdentityError::Transport(err.to_string()))?;
        let _: serde_json::Value = self
            .call(
                "accounts:update",
                json!({ "localId": uid, "customAttributes": attributes }),
            )
            .await?;
        Ok(())
    }
}

/// Stand-in used when no identity project is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn create_user(&self, _user: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn delete_user(&self, _uid: &str) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn get_user(&self, _uid: &str) -> Result<Option<IdentityUser>, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn get_user_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn set_admin_claim(&self, _uid: &str, _is_admin: bool) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_live_under_the_project() {
        let base = Url::parse("https://identity.test/prefix").unwrap();
        let client = IdentityToolkitClient::new(&base, "peak-life", "token".to_string()).unwrap();

        assert_eq!(
            client.endpoint("accounts:lookup").unwrap().as_str(),
            "https://identity.test/prefix/v1/projects/peak-life/accounts:lookup"
        );
        assert_eq!(
            client.endpoint("accounts").unwrap().as_str(),
            "https://identity.test/prefix/v1/projects/peak-life/accounts"
        );
    }

    #[test]
    fn provider_codes_map_to_identity_errors() {
        let exists = br#"{"error":{"code":400,"message":"EMAIL_EXISTS"}}"#;
        assert!(matches!(
            provider_error(StatusCode::BAD_REQUEST, exists),
            IdentityError::EmailExists
        ));

        let missing = br#"{"error":{"message":"USER_NOT_FOUND : no such user"}}"#;
        assert!(matches!(
            provider_error(StatusCode::BAD_REQUEST, missing),
            IdentityError::UserNotFound
        ));

        assert!(matches!(
            provider_error(StatusCode::BAD_GATEWAY, b"upstream down"),
            IdentityError::Rejected(message) if message == "upstream down"
        ));
    }

    #[test]
    fn admin_claim_is_read_from_custom_attributes() {
        let info = AccountInfo {
            local_id: "u1".to_string(),
            email: Some("host@peaklife.test".to_string()),
            display_name: None,
            photo_url: None,
            custom_attributes: Some(r#"{"admin":true}"#.to_string()),
        };
        assert!(info.into_user().unwrap().is_admin);
    }

    #[test]
    fn missing_configuration_yields_no_client() {
        let settings = IdentitySettings {
            base_url: Url::parse("https://identity.test").unwrap(),
            project_id: None,
            access_token: Some("token".to_string()),
        };
        assert!(
            IdentityToolkitClient::from_settings(&settings)
                .unwrap()
                .is_none()
        );
    }
}
