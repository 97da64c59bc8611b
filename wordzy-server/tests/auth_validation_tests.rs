use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

use wordzy_server::auth::{AuthError, AuthService, TokenClaims};
use wordzy_server::config::{Config, ConfigError};
use wordzy_types::Player;

const SECRET: &str = "test-secret-key";

fn sign(claims: &TokenClaims, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn claims_expiring_in(seconds: i64) -> TokenClaims {
    TokenClaims {
        user_id: "550e8400-e29b-41d4-a716-446655440001".to_string(),
        username: "Alice".to_string(),
        exp: (chrono::Utc::now().timestamp() + seconds) as u64,
    }
}

#[tokio::test]
async fn test_valid_token_yields_player() {
    let auth_service = AuthService::new(SECRET);
    let token = sign(&claims_expiring_in(3600), SECRET);

    let player = auth_service.validate_token(&token).await.unwrap();
    assert_eq!(
        player,
        Player::new("550e8400-e29b-41d4-a716-446655440001", "Alice")
    );
    assert!(!auth_service.is_dev_mode());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let auth_service = AuthService::new(SECRET);
    let token = sign(&claims_expiring_in(-3600), SECRET);

    assert_eq!(
        auth_service.validate_token(&token).await.unwrap_err(),
        AuthError::TokenExpired
    );
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let auth_service = AuthService::new(SECRET);
    let token = sign(&claims_expiring_in(3600), "some-other-secret");

    assert_eq!(
        auth_service.validate_token(&token).await.unwrap_err(),
        AuthError::InvalidToken
    );
}

#[tokio::test]
async fn test_blank_user_id_is_rejected() {
    let auth_service = AuthService::new(SECRET);
    let mut claims = claims_expiring_in(3600);
    claims.user_id = "   ".to_string();
    let token = sign(&claims, SECRET);

    assert_eq!(
        auth_service.validate_token(&token).await.unwrap_err(),
        AuthError::InvalidToken
    );
}

#[tokio::test]
async fn test_production_mode_refuses_dev_tokens() {
    let auth_service = AuthService::new(SECRET);

    assert_eq!(
        auth_service.validate_token("alice:Alice").await.unwrap_err(),
        AuthError::InvalidToken
    );
    assert_eq!(
        auth_service.validate_token("").await.unwrap_err(),
        AuthError::MissingToken
    );
}

#[tokio::test]
async fn test_dev_mode_reads_signed_token_without_checking_it() {
    let auth_service = AuthService::new_dev_mode();
    // Signed with a secret the dev service never sees.
    let token = sign(&claims_expiring_in(3600), "unknown");

    let player = auth_service.validate_token(&token).await.unwrap();
    assert_eq!(player.player_id, "550e8400-e29b-41d4-a716-446655440001");
    assert_eq!(player.username, "Alice");
}

#[test]
fn test_production_config_requires_secret() {
    let result = Config::from_lookup(|_| None);
    assert_eq!(result.unwrap_err(), ConfigError::MissingJwtSecret);

    let config = Config::from_lookup(|name| match name {
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.jwt_secret.as_deref(), Some(SECRET));
    assert!(!config.auth_dev_mode);
}
