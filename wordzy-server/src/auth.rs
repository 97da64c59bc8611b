use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use wordzy_types::{GameError, Player};

/// Claims the identity service signs into its HS256 tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub username: String,
    pub exp: u64,
}

// Dev tokens are never verified, so expiry and username are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevClaims {
    user_id: String,
    username: Option<String>,
}

pub struct AuthService {
    decoding_key: Option<DecodingKey>,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: Some(DecodingKey::from_secret(secret.as_bytes())),
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            decoding_key: None,
            dev_mode: true,
        }
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub async fn validate_token(&self, token: &str) -> Result<Player, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let decoding_key = self.decoding_key.as_ref().ok_or(AuthError::InvalidToken)?;
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<TokenClaims>(token, decoding_key, &validation).map_err(|e| {
            tracing::warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let claims = token_data.claims;
        if claims.user_id.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Player::new(claims.user_id, claims.username))
    }

    fn validate_dev_token(&self, token: &str) -> Result<Player, AuthError> {
        tracing::debug!(
            "Validating dev token (first 20 chars): {}",
            token.chars().take(20).collect::<String>()
        );

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 {
            // Unsigned JWT: only the payload is read.
            let payload = parts[1].trim_end_matches('=');
            let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
                tracing::warn!("Failed to decode JWT payload in dev mode: {:?}", e);
                AuthError::InvalidToken
            })?;
            let claims: DevClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
                tracing::warn!("Failed to parse JWT claims in dev mode: {:?}", e);
                AuthError::InvalidToken
            })?;
            if claims.user_id.is_empty() {
                return Err(AuthError::InvalidToken);
            }
            let username = claims.username.unwrap_or_else(|| claims.user_id.clone());
            return Ok(Player::new(claims.user_id, username));
        }

        // Simple string format: "playerId:username"
        match token.split_once(':') {
            Some((player_id, username)) if !player_id.is_empty() && !username.is_empty() => {
                Ok(Player::new(player_id, username))
            }
            _ => Err(AuthError::InvalidToken),
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
}

impl From<AuthError> for GameError {
    fn from(err: AuthError) -> Self {
        GameError::authentication(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_mode_accepts_colon_format() {
        let auth_service = AuthService::new_dev_mode();
        let player = auth_service.validate_token("p-42:Alice").await.unwrap();
        assert_eq!(player.player_id, "p-42");
        assert_eq!(player.username, "Alice");
    }

    #[tokio::test]
    async fn test_dev_mode_accepts_unsigned_jwt() {
        let auth_service = AuthService::new_dev_mode();
        let payload = URL_SAFE_NO_PAD.encode(r#"{"userId":"p-7","username":"Bob"}"#);
        let token = format!("eyJhbGciOiJub25lIn0.{}.", payload);

        let player = auth_service.validate_token(&token).await.unwrap();
        assert_eq!(player, Player::new("p-7", "Bob"));
    }

    #[tokio::test]
    async fn test_dev_mode_rejects_garbage() {
        let auth_service = AuthService::new_dev_mode();
        assert_eq!(
            auth_service.validate_token("no-separator").await.unwrap_err(),
            AuthError::InvalidToken
        );
        assert_eq!(
            auth_service.validate_token(":nameless").await.unwrap_err(),
            AuthError::InvalidToken
        );
        assert_eq!(
            auth_service.validate_token("  ").await.unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("bearer  xyz ")), Some("xyz"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_auth_error_becomes_game_error() {
        let err: GameError = AuthError::TokenExpired.into();
        assert_eq!(
            err,
            GameError::AuthenticationFailure {
                reason: "Token expired".to_string()
            }
        );
    }
}
