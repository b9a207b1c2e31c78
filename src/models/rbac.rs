// src/models/rbac.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// A permissão-curinga: concede todas as capacidades.
// Reservada ao cargo de super-administrador global.
pub const WILDCARD_PERMISSION: &str = "*";

// O que sai do banco (Tabela Roles)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    // NULL = cargo global do sistema (ex: super-administrador).
    // Dois tenants podem ter cada um o seu próprio "Editor".
    #[schema(ignore)]
    pub tenant_id: Option<Uuid>,

    #[schema(example = "Editor")]
    pub name: String,

    #[schema(example = "Pode criar e editar conteúdo")]
    pub description: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// O que sai do banco (Tabela Permissions)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub id: Uuid,

    #[schema(example = "article:read")]
    pub slug: String,

    #[schema(example = "Visualizar artigos")]
    pub description: String,

    #[schema(example = "CONTENT")]
    pub module: String,
}

// O Payload para criar um cargo
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[schema(example = "Revisor")]
    pub name: String,

    #[schema(example = "Pode apenas ler e atualizar artigos")]
    pub description: Option<String>,

    #[schema(example = json!(["article:read", "article:update"]))]
    pub permissions: Vec<String>, // Slugs das permissões
}

// O Payload para atribuir um cargo a um membro
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolePayload {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

// Resposta completa (Cargo + Lista de Permissões)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,

    #[schema(example = json!(["article:read", "article:update"]))]
    pub permissions: Vec<String>,
}
