use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};

use crate::{
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{Account, LoginForm, TokenResponse},
    services::{account_service::AccountRegistry, AppState},
};

pub struct AuthService<'a> {
    accounts: &'a AccountRegistry,
    jwt_service: &'a JwtService,
    access_token_ttl_minutes: i64,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            accounts: &state.accounts,
            jwt_service: &state.jwt,
            access_token_ttl_minutes: state.config.access_token_ttl_minutes,
        }
    }

    /// Checks the credentials and issues an access token. `Ok(None)` means the
    /// username or password did not match.
    pub fn login(&self, form: &LoginForm) -> Result<Option<TokenResponse>> {
        let Some(account) = self.accounts.authenticate(&form.username, &form.password)? else {
            tracing::warn!(username = %form.username, "Failed login attempt");
            return Ok(None);
        };

        let access_token = self.generate_access_token(account)?;

        tracing::info!(
            username = %account.username,
            role = account.role.as_str(),
            "Successful login"
        );

        Ok(Some(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }))
    }

    fn generate_access_token(&self, account: &Account) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_ttl_minutes);

        let claims = JwtClaims {
            sub: account.username.clone(),
            role: account.role,
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        self.jwt_service
            .generate_token(&claims)
            .map_err(|e| anyhow!("Failed to generate access token: {}", e))
    }
}
