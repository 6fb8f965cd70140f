use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use super::{NewUser, UserStore};
use crate::errors::StoreError;
use crate::models::users::{self, ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users};

pub struct SeaUserStore {
    db: DatabaseConnection,
}

impl SeaUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SeaUserStore {
    async fn create(&self, user: NewUser) -> Result<users::Model, StoreError> {
        let now = Utc::now();
        let new_user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(user.full_name),
            email: Set(user.email),
            phone: Set(user.phone),
            password_hash: Set(user.password_hash),
            role: Set(user.role),
            is_active: Set(true),
            avatar_url: Set(None),
            avatar_public_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            last_login: Set(None),
            deleted_at: Set(None),
        };

        Ok(new_user.insert(&self.db).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<users::Model, StoreError> {
        Users::find()
            .filter(UserColumn::Email.eq(email))
            .filter(UserColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<users::Model, StoreError> {
        Users::find_by_id(id)
            .filter(UserColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let changes = UserActiveModel {
            id: Unchanged(id),
            last_login: Set(Some(at)),
            updated_at: Set(at),
            ..Default::default()
        };
        changes.update(&self.db).await?;
        Ok(())
    }
}
