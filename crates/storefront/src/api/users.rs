//! User account operations (`/users`, `/uploads`, `/purchase`, `/admin/unlockAccount`).

use reqwest::Method;
use samaan_kinam_core::{ProductId, UserId};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::types::{
    ChangeNameRequest, ChangePasswordRequest, LockAccountRequest, PasswordChangeCheck,
};
use super::{
    ApiClient, ApiError, ApiUser, ImageUpload, LoginRequest, LoginResponse, PurchaseRecord,
    RegisterRequest,
};

impl ApiClient {
    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["users", "register"])?
            .json(request);
        Self::send_unit(request).await
    }

    /// Exchange credentials and a verification token for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the credentials are rejected.
    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse, ApiError> {
        let request = self
            .request(Method::POST, &["users", "login"])?
            .json(request);
        Self::send_json(request).await
    }

    /// Ask the backend to lock the account registered to `email`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip_all)]
    pub async fn lock_account(&self, email: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["users", "lockAccount"])?
            .json(&LockAccountRequest { email });
        Self::send_unit(request).await
    }

    /// Whether the signed-in user must change their password before continuing.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token is rejected.
    #[instrument(skip_all)]
    pub async fn password_need_change(&self, token: &SecretString) -> Result<bool, ApiError> {
        let request = self.authorized(Method::GET, &["users", "passwordNeedChange"], token)?;
        let check: PasswordChangeCheck = Self::send_json(request).await?;
        Ok(check.message)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token is rejected.
    #[instrument(skip_all)]
    pub async fn get_user(&self, token: &SecretString) -> Result<ApiUser, ApiError> {
        let request = self.authorized(Method::GET, &["users"], token)?;
        Self::send_json(request).await
    }

    /// Delete the signed-in user's account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token is rejected.
    #[instrument(skip_all)]
    pub async fn delete_account(&self, token: &SecretString) -> Result<(), ApiError> {
        let request = self.authorized(Method::DELETE, &["users"], token)?;
        Self::send_unit(request).await
    }

    /// Rename the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip_all)]
    pub async fn change_name(&self, token: &SecretString, new_name: &str) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::PUT, &["users"], token)?
            .json(&ChangeNameRequest { new_name });
        Self::send_unit(request).await
    }

    /// Replace the signed-in user's password.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        token: &SecretString,
        new_password: &SecretString,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::PUT, &["users", "changePassword"], token)?
            .json(&ChangePasswordRequest {
                new_password: new_password.expose_secret(),
            });
        Self::send_unit(request).await
    }

    /// Upload a profile picture for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the file.
    #[instrument(skip_all, fields(file = %upload.file_name))]
    pub async fn upload_profile_image(
        &self,
        token: &SecretString,
        upload: ImageUpload,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::POST, &["uploads"], token)?
            .multipart(upload.into_form()?);
        Self::send_unit(request).await
    }

    /// Upload a product picture (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the file.
    #[instrument(skip_all, fields(product_id = %product_id, file = %upload.file_name))]
    pub async fn upload_product_image(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        upload: ImageUpload,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::POST, &["uploads", product_id.as_str()], token)?
            .multipart(upload.into_form()?);
        Self::send_unit(request).await
    }

    /// List the signed-in user's past purchases.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token is rejected.
    #[instrument(skip_all)]
    pub async fn get_all_purchases(
        &self,
        token: &SecretString,
    ) -> Result<Vec<PurchaseRecord>, ApiError> {
        let request = self.authorized(Method::GET, &["purchase"], token)?;
        Self::send_json(request).await
    }

    /// Unlock a locked account (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn unlock_account(
        &self,
        token: &SecretString,
        user_id: &UserId,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::POST, &["admin", "unlockAccount", user_id.as_str()], token)?
            .json(&serde_json::json!({}));
        Self::send_unit(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;

    async fn setup() -> (MockServer, ApiClient) {
        let server = MockServer::start().await;
        let client = ApiClient::new(&BackendConfig {
            url: Url::parse(&server.uri()).unwrap(),
            accept_invalid_certs: false,
        })
        .unwrap();
        (server, client)
    }

    fn token() -> SecretString {
        SecretString::from("tok")
    }

    #[tokio::test]
    async fn test_login_posts_credentials_and_decodes_token() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/users/login"))
            .and(body_json(serde_json::json!({
                "email": "sita@example.com",
                "password": "secret",
                "recaptchaToken": "captcha"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "abc",
                "user": {"_id": "u1", "name": "Sita", "email": "sita@example.com", "role": "user"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client
            .login(&LoginRequest {
                email: "sita@example.com",
                password: "secret",
                recaptcha_token: "captcha",
            })
            .await
            .unwrap();

        assert_eq!(response.token, "abc");
        assert_eq!(response.user.name, "Sita");
    }

    #[tokio::test]
    async fn test_login_failure_carries_server_message() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/users/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client
            .login(&LoginRequest {
                email: "a@b.co",
                password: "x",
                recaptcha_token: "t",
            })
            .await
            .unwrap_err();

        assert_eq!(err.server_message(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_password_need_change() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/users/passwordNeedChange"))
            .and(header("authorization", "bearer tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": true})),
            )
            .mount(&server)
            .await;

        assert!(client.password_need_change(&token()).await.unwrap());
    }

    #[tokio::test]
    async fn test_change_name_body() {
        let (server, client) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/users"))
            .and(body_json(serde_json::json!({"newName": "Ram"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client.change_name(&token(), "Ram").await.unwrap();
    }

    #[tokio::test]
    async fn test_change_password_body() {
        let (server, client) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/users/changePassword"))
            .and(body_json(serde_json::json!({"newPassword": "new-password"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client
            .change_password(&token(), &SecretString::from("new-password"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unlock_account_path() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/admin/unlockAccount/u42"))
            .and(body_json(serde_json::json!({})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client
            .unlock_account(&token(), &UserId::new("u42"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_profile_image_is_multipart() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/uploads"))
            .and(header_exists("content-type"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client
            .upload_profile_image(
                &token(),
                ImageUpload {
                    file_name: "me.png".to_string(),
                    content_type: Some("image/png".to_string()),
                    bytes: vec![0x89, 0x50, 0x4e, 0x47],
                },
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let content_type = requests
            .first()
            .unwrap()
            .headers
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[tokio::test]
    async fn test_get_all_purchases() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/purchase"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"_id": "o1", "items": [], "payment": "success"}
            ])))
            .mount(&server)
            .await;

        let purchases = client.get_all_purchases(&token()).await.unwrap();
        assert_eq!(purchases.len(), 1);
    }
}
