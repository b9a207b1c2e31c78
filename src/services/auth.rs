// src/services/auth.rs

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::audit::{AuditEvent, SharedAuditSink},
    common::error::AppError,
    db::{TokenRepository, UserRepository},
    models::auth::{Claims, User},
};

// O par de credenciais que sai de um login/refresh: o access token vai
// no corpo da resposta, o refresh token vai só no cookie HttpOnly.
#[derive(Debug)]
pub struct SessionPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64, // segundos do access token
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    token_repo: TokenRepository,
    jwt_secret: String,
    access_ttl_minutes: i64,
    refresh_ttl_days: i64,
    pool: PgPool,
    audit: SharedAuditSink,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        token_repo: TokenRepository,
        jwt_secret: String,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
        pool: PgPool,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            jwt_secret,
            access_ttl_minutes,
            refresh_ttl_days,
            pool,
            audit,
        }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionPair, AppError> {
        // 1. Hashing (fora da transação, pois não toca no banco)
        let password_clone = password.to_owned();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria o usuário e a primeira sessão na MESMA transação
        let mut tx = self.pool.begin().await?;

        let new_user = self
            .user_repo
            .create_user(&mut *tx, email, &hashed_password)
            .await?;

        let pair = self.issue_session_tx(&mut tx, new_user.id).await?;

        tx.commit().await?;

        Ok(pair)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<SessionPair, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            // Conta desativada responde igual a senha errada.
            return Err(AppError::InvalidCredentials);
        }

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.issue_session(user.id).await
    }

    /// Emite um novo par (access + refresh) abrindo uma nova família de
    /// refresh tokens.
    pub async fn issue_session(&self, user_id: Uuid) -> Result<SessionPair, AppError> {
        let mut tx = self.pool.begin().await?;
        let pair = self.issue_session_tx(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(pair)
    }

    async fn issue_session_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
    ) -> Result<SessionPair, AppError> {
        let family_id = Uuid::new_v4();
        let raw_refresh = generate_refresh_token();
        let token_hash = hash_refresh_token(&raw_refresh);
        let expires_at = Utc::now() + Duration::days(self.refresh_ttl_days);

        self.token_repo
            .create(&mut **tx, user_id, family_id, &token_hash, expires_at)
            .await?;

        let access_token = self.create_access_token(user_id)?;

        Ok(SessionPair {
            access_token,
            refresh_token: raw_refresh,
            expires_in: self.access_ttl_minutes * 60,
        })
    }

    /// Validação PURA do access token: assinatura + expiração, sem
    /// tocar no banco. Revogação no meio da vida do access token não é
    /// instantânea; o tradeoff é aceito mantendo a vida curta.
    pub fn validate_access(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthenticated("access token expirado")
            }
            _ => AppError::Unauthenticated("access token inválido"),
        })?;

        Ok(token_data.claims)
    }

    /// Carrega o usuário de um claim já validado. Usado pelo guard do
    /// pipeline, não pela validação (que é stateless).
    pub async fn load_user(&self, user_id: Uuid) -> Result<User, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthenticated("usuário do token não existe"))?;

        if !user.is_active {
            return Err(AppError::Unauthenticated("usuário desativado"));
        }

        Ok(user)
    }

    /// Rotaciona um refresh token: o apresentado é consumido e um novo
    /// é emitido na mesma família. Se o token apresentado JÁ foi usado,
    /// é sinal de comprometimento: a família inteira é revogada.
    pub async fn refresh_session(&self, raw_refresh: &str) -> Result<SessionPair, AppError> {
        let token_hash = hash_refresh_token(raw_refresh);

        // 1. Busca pelo hash (usado ou não)
        let token = self
            .token_repo
            .find_by_hash(&token_hash)
            .await?
            .ok_or(AppError::Unauthenticated("refresh token desconhecido"))?;

        // 2. Replay? Segunda apresentação do mesmo token.
        if token.is_used() {
            self.token_repo.revoke_family(&self.pool, token.family_id).await?;
            self.audit
                .record(AuditEvent::ReplayDetected {
                    user_id: token.user_id,
                    family_id: token.family_id,
                })
                .await;
            return Err(AppError::ReplayDetected);
        }

        // 3. Expirado? A linha morta é removida junto com a família.
        if token.is_expired(Utc::now()) {
            self.token_repo.revoke_family(&self.pool, token.family_id).await?;
            return Err(AppError::Unauthenticated("refresh token expirado"));
        }

        // 4. Rotação atômica: consumir + emitir na mesma transação.
        let mut tx = self.pool.begin().await?;

        let consumed = self.token_repo.mark_used(&mut *tx, token.id).await?;
        if consumed.is_none() {
            // Outra requisição consumiu este token entre o passo 1 e
            // agora: trata como replay.
            tx.rollback().await?;
            self.token_repo.revoke_family(&self.pool, token.family_id).await?;
            self.audit
                .record(AuditEvent::ReplayDetected {
                    user_id: token.user_id,
                    family_id: token.family_id,
                })
                .await;
            return Err(AppError::ReplayDetected);
        }

        let raw_new = generate_refresh_token();
        let new_hash = hash_refresh_token(&raw_new);
        let expires_at = Utc::now() + Duration::days(self.refresh_ttl_days);

        self.token_repo
            .create(&mut *tx, token.user_id, token.family_id, &new_hash, expires_at)
            .await?;

        tx.commit().await?;

        let access_token = self.create_access_token(token.user_id)?;

        Ok(SessionPair {
            access_token,
            refresh_token: raw_new,
            expires_in: self.access_ttl_minutes * 60,
        })
    }

    /// Logout: revoga a família do refresh token apresentado. Access
    /// tokens já emitidos continuam válidos até expirar sozinhos.
    pub async fn revoke_session(&self, raw_refresh: &str) -> Result<(), AppError> {
        let token_hash = hash_refresh_token(raw_refresh);

        if let Some(token) = self.token_repo.find_by_hash(&token_hash).await? {
            self.token_repo.revoke_family(&self.pool, token.family_id).await?;
            self.audit
                .record(AuditEvent::SessionRevoked {
                    user_id: token.user_id,
                    all_sessions: false,
                })
                .await;
        }

        // Token desconhecido no logout não é erro: o resultado desejado
        // (nenhuma sessão com esse token) já vale.
        Ok(())
    }

    /// "Logout em todos os dispositivos".
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self.token_repo.revoke_all_for_user(user_id).await?;
        self.audit
            .record(AuditEvent::SessionRevoked {
                user_id,
                all_sessions: true,
            })
            .await;

        Ok(revoked)
    }

    fn create_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.access_ttl_minutes);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

/// Gera o valor opaco de um refresh token: 32 bytes aleatórios,
/// base64url sem padding.
pub fn generate_refresh_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash SHA-256 (hex) do valor opaco: é isto que vai para o banco.
pub fn hash_refresh_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "segredo-de-teste-nao-usar-em-producao";

    fn mint(sub: Uuid, iat_offset_secs: i64, ttl_secs: i64) -> String {
        let now = Utc::now() + Duration::seconds(iat_offset_secs);
        let claims = Claims {
            sub,
            exp: (now + Duration::seconds(ttl_secs)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap()
    }

    fn check(token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(SECRET.as_ref()),
            &validation,
        )
        .map(|d| d.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthenticated("access token expirado")
            }
            _ => AppError::Unauthenticated("access token inválido"),
        })
    }

    #[test]
    fn access_token_valido_carrega_o_sub() {
        let user_id = Uuid::new_v4();
        let token = mint(user_id, 0, 900);

        let claims = check(&token).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn validacao_e_funcao_pura_do_token() {
        // O mesmo token validado duas vezes antes de expirar dá o
        // mesmo resultado.
        let user_id = Uuid::new_v4();
        let token = mint(user_id, 0, 900);

        let a = check(&token).unwrap();
        let b = check(&token).unwrap();
        assert_eq!(a.sub, b.sub);
        assert_eq!(a.exp, b.exp);
    }

    #[test]
    fn token_expirado_sempre_expira() {
        // Bem além do leeway padrão do jsonwebtoken.
        let token = mint(Uuid::new_v4(), -7200, 900);

        assert!(matches!(
            check(&token),
            Err(AppError::Unauthenticated("access token expirado"))
        ));
        // E continua expirado na segunda validação.
        assert!(check(&token).is_err());
    }

    #[test]
    fn token_com_assinatura_errada_e_invalido() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            exp: (now + Duration::seconds(900)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"outro-segredo"),
        )
        .unwrap();

        assert!(matches!(
            check(&forged),
            Err(AppError::Unauthenticated("access token inválido"))
        ));
    }

    #[test]
    fn refresh_token_e_url_safe() {
        let token = generate_refresh_token();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // 32 bytes -> 43 chars base64url.
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn refresh_tokens_nao_se_repetem() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }

    #[test]
    fn hash_do_refresh_e_deterministico() {
        let raw = "um-refresh-token-qualquer";
        assert_eq!(hash_refresh_token(raw), hash_refresh_token(raw));
        assert_ne!(hash_refresh_token("a"), hash_refresh_token("b"));
    }
}
