//! Interactive login: phone, code, and 2FA password if set.
//!
//! One in-memory state machine per user. The grammers client lives inside
//! the pending step between messages; nothing is persisted until the
//! final session string is handed back to the caller.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use grammers_client::types::{LoginToken, PasswordToken};
use grammers_client::{Client, Config, InitParams, SignInError};
use grammers_session::Session;

use crate::config::ApiCredentials;

enum LoginStep {
    AwaitPhone,
    AwaitCode { client: Client, token: LoginToken },
    AwaitPassword { client: Client, token: PasswordToken },
}

/// What the handler should tell the user after one login input.
pub enum LoginReply {
    NeedCode,
    NeedPassword,
    BadCode,
    LoggedIn { session: String },
    Failed(String),
}

pub struct LoginFlow {
    credentials: ApiCredentials,
    pending: Mutex<HashMap<i64, LoginStep>>,
}

impl LoginFlow {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            credentials,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Puts the user at the start of the flow (asking for a phone number).
    pub fn begin(&self, user_id: i64) {
        self.pending
            .lock()
            .unwrap()
            .insert(user_id, LoginStep::AwaitPhone);
        tracing::info!(user_id, "Login flow started");
    }

    /// Drops any in-progress login. Returns whether one existed.
    pub fn clear(&self, user_id: i64) -> bool {
        self.pending.lock().unwrap().remove(&user_id).is_some()
    }

    pub fn is_pending(&self, user_id: i64) -> bool {
        self.pending.lock().unwrap().contains_key(&user_id)
    }

    /// Feeds one user message into the flow. Returns `None` when no login
    /// is pending for this user.
    pub async fn advance(&self, user_id: i64, input: &str) -> Option<LoginReply> {
        let step = self.pending.lock().unwrap().remove(&user_id)?;
        let reply = match step {
            LoginStep::AwaitPhone => self.request_code(user_id, input.trim()).await,
            LoginStep::AwaitCode { client, token } => {
                self.submit_code(user_id, client, token, input.trim()).await
            }
            LoginStep::AwaitPassword { client, token } => {
                Self::submit_password(client, token, input.trim()).await
            }
        };
        Some(reply)
    }

    async fn request_code(&self, user_id: i64, phone: &str) -> LoginReply {
        let client = match Client::connect(Config {
            session: Session::new(),
            api_id: self.credentials.api_id,
            api_hash: self.credentials.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Login connect failed");
                return LoginReply::Failed(err.to_string());
            }
        };

        match client.request_login_code(phone).await {
            Ok(token) => {
                self.pending
                    .lock()
                    .unwrap()
                    .insert(user_id, LoginStep::AwaitCode { client, token });
                LoginReply::NeedCode
            }
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Login code request failed");
                LoginReply::Failed(err.to_string())
            }
        }
    }

    async fn submit_code(
        &self,
        user_id: i64,
        client: Client,
        token: LoginToken,
        code: &str,
    ) -> LoginReply {
        match client.sign_in(&token, code).await {
            Ok(_user) => finish(&client),
            Err(SignInError::PasswordRequired(password_token)) => {
                self.pending.lock().unwrap().insert(
                    user_id,
                    LoginStep::AwaitPassword {
                        client,
                        token: password_token,
                    },
                );
                LoginReply::NeedPassword
            }
            Err(SignInError::InvalidCode) => {
                // Keep the step alive so the user can just retype the code.
                self.pending
                    .lock()
                    .unwrap()
                    .insert(user_id, LoginStep::AwaitCode { client, token });
                LoginReply::BadCode
            }
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Sign-in failed");
                LoginReply::Failed(err.to_string())
            }
        }
    }

    async fn submit_password(client: Client, token: PasswordToken, password: &str) -> LoginReply {
        match client.check_password(token, password).await {
            Ok(_user) => finish(&client),
            Err(err) => {
                tracing::warn!(error = %err, "Password check failed");
                LoginReply::Failed(err.to_string())
            }
        }
    }
}

fn finish(client: &Client) -> LoginReply {
    LoginReply::LoggedIn {
        session: BASE64.encode(client.session().save()),
    }
}
