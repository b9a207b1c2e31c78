// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Tenant (A "Organização")
// ---
// A unidade de isolamento: nenhuma linha de um tenant pode ser vista
// por outro tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,

    // Identificador seguro para subdomínio ([a-z0-9-]).
    // Imutável, exceto pela operação explícita de rename.
    #[schema(example = "loja-centro")]
    pub slug: String,

    // Identificador do escopo de isolamento (nome da partição lógica).
    // Migra junto com o slug na operação de rename.
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub scope_key: String,

    pub name: String,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Domain (O "Endereço" do Tenant)
// ---
// Mapeia um hostname de entrada para um Tenant. Um hostname resolve
// para no máximo um tenant; todo tenant tem um domínio primário.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: Uuid,
    pub tenant_id: Uuid,

    #[schema(example = "loja-centro.plataforma.app")]
    pub hostname: String,

    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

// ---
// 3. TenantMember (A "Ponte" Usuário-Tenant-Cargo)
// ---
// Uma linha por cargo: um par (usuário, tenant) ativo tem sempre
// pelo menos uma linha, nunca zero cargos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantMember {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
