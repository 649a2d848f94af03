//! JWT 认证模块
//!
//! 提供访问/刷新令牌的签发与校验，以及供事件网关使用的
//! 身份校验器（解码令牌 + 用户存在性检查）。

use std::sync::Arc;

use application::{TokenVerifier, UserRepository, VerificationError};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use config::JwtConfig;
use domain::{User, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// 访问令牌 Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding = EncodingKey::from_secret(config.access_secret.as_ref());
        let access_decoding = DecodingKey::from_secret(config.access_secret.as_ref());
        let refresh_encoding = EncodingKey::from_secret(config.refresh_secret.as_ref());

        Self {
            config,
            access_encoding,
            access_decoding,
            refresh_encoding,
        }
    }

    /// 为用户签发访问 + 刷新令牌。
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, ApiError> {
        let now = chrono::Utc::now();

        let access_claims = Claims {
            user_id: user.id.0,
            mobile_number: Some(user.mobile_number.to_string()),
            username: Some(user.username.to_string()),
            exp: (now + chrono::Duration::hours(self.config.access_expiry_hours)).timestamp(),
        };
        let access_token = encode(&Header::default(), &access_claims, &self.access_encoding)
            .map_err(|err| {
                ApiError::internal_server_error(format!("Token generation failed: {}", err))
            })?;

        let refresh_claims = Claims {
            user_id: user.id.0,
            mobile_number: None,
            username: None,
            exp: (now + chrono::Duration::days(self.config.refresh_expiry_days)).timestamp(),
        };
        let refresh_token = encode(&Header::default(), &refresh_claims, &self.refresh_encoding)
            .map_err(|err| {
                ApiError::internal_server_error(format!("Token generation failed: {}", err))
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// 验证并解析访问令牌。
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
    }

    /// 从请求中提取已认证用户：先查 `accessToken` cookie，再查
    /// Authorization 头。
    pub fn extract_user_from_headers(&self, headers: &HeaderMap) -> Result<UserId, ApiError> {
        let token = credential_from_headers(headers)
            .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

        let claims = self
            .verify_access_token(&token)
            .map_err(|err| ApiError::unauthorized(format!("Invalid access token: {}", err)))?;
        Ok(UserId::from(claims.user_id))
    }
}

/// cookie 优先，其次 Bearer 头。
pub(crate) fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = cookie_value(cookie_header, "accessToken") {
            return Some(token);
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_owned())
}

/// 从原始 Cookie 头里取出指定名字的值。
pub(crate) fn cookie_value(raw: &str, name: &str) -> Option<String> {
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim().to_owned())
        } else {
            None
        }
    })
}

/// 网关使用的身份校验器：令牌解码 + 用户存在性检查。
pub struct JwtTokenVerifier {
    jwt_service: Arc<JwtService>,
    user_repository: Arc<dyn UserRepository>,
}

impl JwtTokenVerifier {
    pub fn new(jwt_service: Arc<JwtService>, user_repository: Arc<dyn UserRepository>) -> Self {
        Self {
            jwt_service,
            user_repository,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, VerificationError> {
        let claims = self
            .jwt_service
            .verify_access_token(token)
            .map_err(|err| VerificationError::InvalidToken(err.to_string()))?;

        let user_id = UserId::from(claims.user_id);
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await
            .map_err(|err| VerificationError::Unavailable(err.to_string()))?;

        match user {
            Some(user) => Ok(user.id),
            None => Err(VerificationError::UserNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_the_named_cookie() {
        let raw = "theme=dark; accessToken=abc.def.ghi; other=1";
        assert_eq!(cookie_value(raw, "accessToken").as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(raw, "refreshToken"), None);
    }

    #[test]
    fn credential_prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "accessToken=from-cookie".parse().unwrap());
        headers.insert(
            header::AUTHORIZATION,
            "Bearer from-header".parse().unwrap(),
        );
        assert_eq!(
            credential_from_headers(&headers).as_deref(),
            Some("from-cookie")
        );

        headers.remove(header::COOKIE);
        assert_eq!(
            credential_from_headers(&headers).as_deref(),
            Some("from-header")
        );
    }
}
