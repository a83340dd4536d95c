//! Bearer-token identification of the caller.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the actor id. Issuing tokens
//! belongs to the login flow; [`TokenKeys::issue`] exists for tooling and
//! tests.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, actor_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        encode(&Header::default(), &Claims { sub: actor_id, exp }, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected bearer token: {}", e);
                AppError::Unauthorized("Not authorized - Invalid token".to_string())
            })
    }
}

/// Actor id taken from a verified `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct BearerActor(pub Uuid);

impl FromRequest for BearerActor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(bearer_actor(req))
    }
}

fn bearer_actor(req: &HttpRequest) -> Result<BearerActor, AppError> {
    let keys = req
        .app_data::<web::Data<TokenKeys>>()
        .ok_or_else(|| AppError::Internal("token keys are not configured".to_string()))?;

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Not authorized - No token provided".to_string()))?;

    keys.verify(token).map(|claims| BearerActor(claims.sub))
}
