use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::saved_response::{NewSavedResponse, SavedResponse};

use super::saved_response_repository::SavedResponseRepository;

pub struct PostgresSavedResponseRepository {
    pub pool: PgPool,
}

const SAVED_RESPONSE_COLUMNS: &str = "id, user_id, team_id, tool_name, prompt, response, is_favorite, shared_with_team, public_slug, created_at";

#[async_trait]
impl SavedResponseRepository for PostgresSavedResponseRepository {
    async fn create_saved_response(
        &self,
        new_response: NewSavedResponse,
    ) -> Result<SavedResponse, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO saved_responses (user_id, team_id, tool_name, prompt, response, created_at)
            VALUES ($1, $2, $3, $4, $5, now())
            RETURNING {SAVED_RESPONSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(new_response.user_id)
            .bind(new_response.team_id)
            .bind(&new_response.tool_name)
            .bind(&new_response.prompt)
            .bind(&new_response.response)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedResponse>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SAVED_RESPONSE_COLUMNS}
            FROM saved_responses
            WHERE user_id = $1
            ORDER BY is_favorite DESC, created_at DESC
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_shared_with_team(
        &self,
        team_id: Uuid,
    ) -> Result<Vec<SavedResponse>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SAVED_RESPONSE_COLUMNS}
            FROM saved_responses
            WHERE team_id = $1 AND shared_with_team
            ORDER BY created_at DESC
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<SavedResponse>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SAVED_RESPONSE_COLUMNS}
            FROM saved_responses
            WHERE public_slug = $1
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_favorite(
        &self,
        user_id: Uuid,
        response_id: Uuid,
        is_favorite: bool,
    ) -> Result<Option<SavedResponse>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE saved_responses
            SET is_favorite = $3
            WHERE id = $2 AND user_id = $1
            RETURNING {SAVED_RESPONSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(user_id)
            .bind(response_id)
            .bind(is_favorite)
            .fetch_optional(&self.pool)
            .await
    }

    async fn set_sharing(
        &self,
        user_id: Uuid,
        response_id: Uuid,
        shared_with_team: bool,
        public_slug: Option<&str>,
    ) -> Result<Option<SavedResponse>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE saved_responses
            SET shared_with_team = $3, public_slug = $4
            WHERE id = $2 AND user_id = $1
            RETURNING {SAVED_RESPONSE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(user_id)
            .bind(response_id)
            .bind(shared_with_team)
            .bind(public_slug)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        response_id: Uuid,
    ) -> Result<Option<SavedResponse>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SAVED_RESPONSE_COLUMNS}
            FROM saved_responses
            WHERE id = $2 AND user_id = $1
            "#
        );
        sqlx::query_as::<_, SavedResponse>(&sql)
            .bind(user_id)
            .bind(response_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_saved_response(
        &self,
        user_id: Uuid,
        response_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM saved_responses WHERE id = $2 AND user_id = $1")
            .bind(user_id)
            .bind(response_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
