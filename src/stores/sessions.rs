use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use super::{NewSession, SessionStore};
use crate::errors::StoreError;
use crate::models::sessions::{self, ActiveModel as SessionActiveModel, Column as SessionColumn, Entity as Sessions};

pub struct SeaSessionStore {
    db: DatabaseConnection,
}

impl SeaSessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SeaSessionStore {
    async fn create(&self, session: NewSession) -> Result<sessions::Model, StoreError> {
        let new_session = SessionActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            refresh_token: Set(session.refresh_token),
            user_agent: Set(session.user_agent),
            client_ip: Set(session.client_ip),
            is_blocked: Set(false),
            expires_at: Set(session.expires_at),
            created_at: Set(Utc::now()),
        };

        Ok(new_session.insert(&self.db).await?)
    }

    async fn find_by_refresh_token(&self, token: &str) -> Result<sessions::Model, StoreError> {
        Sessions::find()
            .filter(SessionColumn::RefreshToken.eq(token))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = Sessions::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
