//! Caller identity
//!
//! Every meeting route needs to know who is calling and with which role. The bearer token is
//! checked and the user looked up once, handlers get the result as a [`CurrentUser`].

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use chrono::Utc;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::api::Error;
use crate::storage::Storage;
use crate::users::User;

/// Seconds an access token stays valid
const TOKEN_LIFETIME: i64 = 60 * 60;

/// Signing keys for access tokens, both derived from the same secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a fresh access token for a user
    pub fn issue(&self, user: &User) -> Result<Token, Error> {
        let claims = Claims {
            sub: user.id,
            exp: Utc::now().timestamp() + TOKEN_LIFETIME,
            jti: user.session_id,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map(Token::bearer)
            .map_err(Error::internal_server_error)
    }

    /// Check the signature and expiration of a token
    fn claims(&self, token: &str) -> Result<Claims, Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| Error::forbidden(format!("Invalid token: {err}")))
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    /// User ID
    sub: Uuid,

    /// Expiration, UNIX timestamp
    exp: i64,

    /// Session of the user the token was issued for
    jti: Uuid,
}

/// Access token as handed out by the token endpoint
#[derive(Debug, Serialize)]
pub struct Token {
    token_type: &'static str,
    expires_in: i64,
    access_token: String,
}

impl Token {
    fn bearer(access_token: String) -> Self {
        Self {
            token_type: "Bearer",
            expires_in: TOKEN_LIFETIME,
            access_token,
        }
    }
}

/// The authenticated caller
///
/// Derefs to the [`User`], rejects the request with a 403 when there is no valid token
pub struct CurrentUser<S: Storage> {
    user: Arc<User>,
    storage: PhantomData<S>,
}

impl<S: Storage> Deref for CurrentUser<S> {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<B, S> FromRequestParts<B> for CurrentUser<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Error::forbidden("Missing API token"))?;

        let Extension(jwt_keys) = parts
            .extract::<Extension<JwtKeys>>()
            .await
            .map_err(|_| Error::internal_server_error("JWT keys are not configured"))?;

        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(|_| Error::internal_server_error("Storage is not configured"))?;

        let claims = jwt_keys.claims(bearer.token())?;

        let user = storage
            .find_single_user_by_id(&claims.sub)
            .await
            .map_err(|err| {
                tracing::error!("Could not look up the user of a token: {err}");
                Error::forbidden("Could not find user")
            })?
            .ok_or_else(|| Error::forbidden("Could not find user"))?;

        // a new session ID invalidates all tokens issued before
        if claims.jti != user.session_id {
            return Err(Error::forbidden("Token expired"));
        }

        tracing::debug!("Request by `{}`", user.username);

        Ok(Self {
            user: Arc::new(user),
            storage: PhantomData,
        })
    }
}
