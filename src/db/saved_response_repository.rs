use async_trait::async_trait;
use uuid::Uuid;

use crate::models::saved_response::{NewSavedResponse, SavedResponse};

#[async_trait]
pub trait SavedResponseRepository: Send + Sync {
    async fn create_saved_response(
        &self,
        new_response: NewSavedResponse,
    ) -> Result<SavedResponse, sqlx::Error>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedResponse>, sqlx::Error>;

    async fn list_shared_with_team(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<SavedResponse>, sqlx::Error>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<SavedResponse>, sqlx::Error>;

    /// Owner-scoped: returns `None` when the response does not belong to `user_id`.
    async fn set_favorite(
        &self,
        user_id: Uuid,
        response_id: Uuid,
        is_favorite: bool,
    ) -> Result<Option<SavedResponse>, sqlx::Error>;

    /// Owner-scoped. A slug already taken by another response surfaces as a
    /// unique violation.
    async fn set_sharing(
        &self,
        user_id: Uuid,
        response_id: Uuid,
        shared_with_team: bool,
        public_slug: Option<&str>,
    ) -> Result<Option<SavedResponse>, sqlx::Error>;

    async fn find_for_user(
        &self,
        user_id: Uuid,
        response_id: Uuid,
    ) -> Result<Option<SavedResponse>, sqlx::Error>;

    async fn delete_saved_response(
        &self,
        user_id: Uuid,
        response_id: Uuid,
    ) -> Result<bool, sqlx::Error>;
}
