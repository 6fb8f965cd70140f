// ============================================================================
// MODEL: SESSIONS
// ============================================================================
//
// Columns of the sessions table:
//   - id (UUID, PRIMARY KEY)
//   - user_id (UUID, NOT NULL, FK -> users, indexed)
//   - refresh_token (VARCHAR(512), UNIQUE, NOT NULL)
//   - user_agent (VARCHAR(255), NULL)
//   - client_ip (VARCHAR(50), NULL)
//   - is_blocked (BOOLEAN, DEFAULT FALSE)
//   - expires_at (TIMESTAMPTZ, NOT NULL, indexed for cleanup jobs)
//   - created_at (TIMESTAMPTZ, NOT NULL)
//
// Lifecycle:
//   1. POST /api/v1/auth/login inserts one row per issued refresh token
//   2. POST /api/v1/auth/refresh-token reads the row, the token is not rotated
//   3. POST /api/v1/auth/logout deletes the row
//
// Notes:
//   - one user may hold many rows (one per device)
//   - expired rows stay until an external cleanup job removes them
//
// ============================================================================

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub refresh_token: String,

    pub user_agent: Option<String>,

    pub client_ip: Option<String>,

    pub is_blocked: bool,

    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// A session can be exchanged for access tokens iff it is not blocked
    /// and `now` is strictly before its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_blocked && now < self.expires_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
