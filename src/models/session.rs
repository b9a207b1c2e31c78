// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// Linha da tabela refresh_tokens.
// O valor opaco nunca é guardado: apenas o hash SHA-256 (hex).
// `family_id` agrupa todas as rotações de um mesmo login/dispositivo;
// reapresentar um token já usado revoga a família inteira.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Uuid,

    #[serde(skip_serializing)]
    pub token_hash: String,

    pub expires_at: DateTime<Utc>,

    // NULL enquanto o token ainda não foi rotacionado.
    // Preenchido = token consumido; uma segunda apresentação é replay.
    pub used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}
