mod common;

use common::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tessera::application_port::*;
use tessera::domain_model::UserId;
use tessera::domain_port::{UserRepo, UserUpdate};

#[tokio::test]
async fn register_refresh_logout_scenario() {
    let h = Harness::new();

    let p1 = h.register("a@x.com", "pw123456").await.tokens;

    let p2 = h.auth().refresh(&p1.refresh_token.0).await.unwrap();
    assert_ne!(p2.refresh_token, p1.refresh_token);
    assert_ne!(p2.access_token, p1.access_token);

    assert!(matches!(
        h.auth().refresh(&p1.refresh_token.0).await,
        Err(AuthError::Unauthorized)
    ));

    let p3 = h.auth().refresh(&p2.refresh_token.0).await.unwrap();

    h.auth().logout(&p3.refresh_token.0).await.unwrap();
    assert!(matches!(
        h.auth().refresh(&p3.refresh_token.0).await,
        Err(AuthError::Unauthorized)
    ));
}

#[tokio::test]
async fn superseded_token_fails_every_time() {
    let h = Harness::new();
    let old = h.register("a@x.com", "pw123456").await.tokens;
    let new = h.auth().refresh(&old.refresh_token.0).await.unwrap();

    for _ in 0..2 {
        assert!(matches!(
            h.auth().refresh(&old.refresh_token.0).await,
            Err(AuthError::Unauthorized)
        ));
    }
    // failed attempts with the old token leave the current one intact
    h.auth().refresh(&new.refresh_token.0).await.unwrap();
}

#[tokio::test]
async fn logout_requires_the_current_token() {
    let h = Harness::new();
    let old = h.register("a@x.com", "pw123456").await.tokens;
    let new = h.auth().refresh(&old.refresh_token.0).await.unwrap();

    assert!(matches!(
        h.auth().logout(&old.refresh_token.0).await,
        Err(AuthError::Unauthorized)
    ));
    h.auth().logout(&new.refresh_token.0).await.unwrap();
    assert!(matches!(
        h.auth().logout(&new.refresh_token.0).await,
        Err(AuthError::Unauthorized)
    ));
}

#[tokio::test]
async fn login_replaces_the_previous_session() {
    let h = Harness::new();
    let first = h.register("a@x.com", "pw123456").await.tokens;

    let second = h
        .auth()
        .login(LoginInput {
            email: "A@X.com".to_string(),
            password: "pw123456".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(second.user.email, "a@x.com");

    assert!(matches!(
        h.auth().refresh(&first.refresh_token.0).await,
        Err(AuthError::Unauthorized)
    ));
    h.auth().refresh(&second.tokens.refresh_token.0).await.unwrap();
}

#[tokio::test]
async fn login_failures_are_distinct() {
    let h = Harness::new();
    h.register("a@x.com", "pw123456").await;

    let wrong_password = h
        .auth()
        .login(LoginInput {
            email: "a@x.com".to_string(),
            password: "pw654321".to_string(),
        })
        .await;
    assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

    let unknown = h
        .auth()
        .login(LoginInput {
            email: "b@x.com".to_string(),
            password: "pw123456".to_string(),
        })
        .await;
    assert!(matches!(unknown, Err(AuthError::NotFound)));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let h = Harness::new();
    h.register("a@x.com", "pw123456").await;

    let again = h
        .auth()
        .register(RegisterInput {
            email: " A@x.com".to_string(),
            username: "Other".to_string(),
            password: "another-pw".to_string(),
        })
        .await;
    assert!(matches!(again, Err(AuthError::Conflict)));
    assert_eq!(h.repo.len(), 1);
}

#[tokio::test]
async fn registration_input_is_validated() {
    let h = Harness::new();
    let too_long = "p".repeat(33);
    let cases = [
        ("not-an-email", "TestUser", "pw123456"),
        ("a@x.com", "", "pw123456"),
        ("a@x.com", "TestUser", "123456"),
        ("a@x.com", "TestUser", "pw 123456"),
        ("a@x.com", "TestUser", "pw\"123456"),
        ("a@x.com", "TestUser", too_long.as_str()),
    ];
    for (email, username, password) in cases {
        let result = h
            .auth()
            .register(RegisterInput {
                email: email.to_string(),
                username: username.to_string(),
                password: password.to_string(),
            })
            .await;
        assert!(
            matches!(result, Err(AuthError::Validation(_))),
            "expected validation error for {email:?}/{username:?}/{password:?}"
        );
    }
    assert!(h.repo.is_empty());
}

#[tokio::test]
async fn refresh_token_is_stored_only_as_a_hash() {
    let h = Harness::new();
    let result = h.register("a@x.com", "pw123456").await;

    let stored = h
        .repo
        .find_by_id(result.user.id)
        .await
        .unwrap()
        .unwrap()
        .refresh_token_hash
        .unwrap();
    assert_ne!(stored, result.tokens.refresh_token.0);
    assert!(!stored.contains(&result.tokens.refresh_token.0));
    assert!(stored.starts_with("$argon2id$"));
}

fn expired_refresh_token(user_id: UserId) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": user_id.to_string(),
        "iat": now - 3600,
        "exp": now - 60,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "jti": "expired",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(REFRESH_SECRET),
    )
    .unwrap()
}

#[tokio::test]
async fn expired_token_fails_even_when_it_matches_the_slot() {
    let h = Harness::new();
    let user = h.register("a@x.com", "pw123456").await.user;

    let expired = expired_refresh_token(user.id);
    let hash = h.hasher.hash(&expired).await.unwrap();
    h.repo
        .update(
            user.id,
            UserUpdate {
                refresh_token_hash: Some(Some(hash)),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        h.auth().refresh(&expired).await,
        Err(AuthError::Unauthorized)
    ));
}

#[tokio::test]
async fn wrong_kind_missing_and_foreign_tokens_are_unauthorized() {
    let h = Harness::new();
    let tokens = h.register("a@x.com", "pw123456").await.tokens;

    // access token is signed with the other secret
    assert!(matches!(
        h.auth().refresh(&tokens.access_token.0).await,
        Err(AuthError::Unauthorized)
    ));
    assert!(matches!(h.auth().refresh("").await, Err(AuthError::Unauthorized)));
    assert!(matches!(h.auth().refresh("   ").await, Err(AuthError::Unauthorized)));
    assert!(matches!(
        h.auth().refresh("invalidToken").await,
        Err(AuthError::Unauthorized)
    ));

    // validly signed, but for a user that does not exist
    let now = chrono::Utc::now().timestamp();
    let ghost = encode(
        &Header::default(),
        &json!({
            "sub": UserId::new_v4().to_string(),
            "iat": now,
            "exp": now + 600,
            "iss": ISSUER,
            "aud": AUDIENCE,
            "jti": "ghost",
        }),
        &EncodingKey::from_secret(REFRESH_SECRET),
    )
    .unwrap();
    assert!(matches!(h.auth().refresh(&ghost).await, Err(AuthError::Unauthorized)));
    assert!(matches!(h.auth().logout(&ghost).await, Err(AuthError::Unauthorized)));
}

#[tokio::test]
async fn access_tokens_authorize_but_cannot_refresh() {
    let h = Harness::new();
    let result = h.register("a@x.com", "pw123456").await;

    let user_id = h
        .auth()
        .verify_access(&result.tokens.access_token.0)
        .await
        .unwrap();
    assert_eq!(user_id, result.user.id);

    assert!(matches!(
        h.auth().verify_access(&result.tokens.refresh_token.0).await,
        Err(AuthError::Unauthorized)
    ));

    // access tokens are not revocable: still valid after logout
    h.auth().logout(&result.tokens.refresh_token.0).await.unwrap();
    assert!(h.auth().verify_access(&result.tokens.access_token.0).await.is_ok());
}

#[tokio::test]
async fn corrupt_stored_hash_is_not_collapsed() {
    let h = Harness::new();
    let result = h.register("a@x.com", "pw123456").await;
    h.repo
        .update(
            result.user.id,
            UserUpdate {
                refresh_token_hash: Some(Some("garbage".to_string())),
                ..UserUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        h.auth().refresh(&result.tokens.refresh_token.0).await,
        Err(AuthError::Configuration(_))
    ));
}
