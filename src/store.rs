// src/store.rs

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json};

use crate::{
    error::AppError,
    models::question::{
        AnswerKey, CreateQuestionRequest, PublicQuestion, Question, UpdateQuestionRequest,
        check_question_shape,
    },
    utils::html::clean_html,
};

/// Ids looked up per answer-key query.
const ANSWER_KEY_BATCH: usize = 900;

/// SQLite-backed question bank.
///
/// Every write re-checks the four-option / index-in-range invariant, so a
/// caller that skips request validation still cannot store a broken question.
#[derive(Debug, Clone)]
pub struct QuestionStore {
    pool: SqlitePool,
}

impl QuestionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Picks up to `limit` distinct questions uniformly at random.
    /// The correct answer column is never selected.
    pub async fn sample(&self, limit: i64) -> Result<Vec<PublicQuestion>, AppError> {
        sqlx::query_as::<_, PublicQuestion>(
            r#"
            SELECT id, question_text, options
            FROM questions
            ORDER BY RANDOM()
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to sample questions: {:?}", e);
            AppError::from(e)
        })
    }

    /// Looks up the answer keys for the given ids. Unknown ids are simply
    /// absent from the returned map.
    pub async fn answer_keys(&self, ids: &[String]) -> Result<HashMap<String, AnswerKey>, AppError> {
        let unique: Vec<&String> = ids.iter().collect::<HashSet<_>>().into_iter().collect();
        let mut keys = HashMap::new();

        // SQLite caps bound parameters per statement.
        for chunk in unique.chunks(ANSWER_KEY_BATCH) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(
                "SELECT id, question_text, correct_answer_index FROM questions WHERE id IN (",
            );

            let mut separated = query_builder.separated(",");
            for id in chunk {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");

            let rows: Vec<AnswerKey> = query_builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to fetch answer keys: {:?}", e);
                    AppError::from(e)
                })?;

            keys.extend(rows.into_iter().map(|k| (k.id.clone(), k)));
        }

        Ok(keys)
    }

    /// Lists every question, newest first.
    pub async fn list(&self) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, question_text, options, correct_answer_index, created_at, updated_at
            FROM questions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    pub async fn get(&self, id: &str) -> Result<Question, AppError> {
        sqlx::query_as::<_, Question>(
            r#"
            SELECT id, question_text, options, correct_answer_index, created_at, updated_at
            FROM questions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))
    }

    pub async fn insert(&self, req: CreateQuestionRequest) -> Result<Question, AppError> {
        check_question_shape(&req.options, req.correct_answer_index)?;

        let now = Utc::now();
        let question = Question {
            id: uuid::Uuid::new_v4().to_string(),
            question_text: clean_html(req.question_text.trim()),
            options: Json(req.options.iter().map(|o| clean_html(o)).collect()),
            correct_answer_index: req.correct_answer_index,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO questions
            (id, question_text, options, correct_answer_index, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&question.id)
        .bind(&question.question_text)
        .bind(&question.options)
        .bind(question.correct_answer_index)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            AppError::from(e)
        })?;

        tracing::info!("Created question {}", question.id);
        Ok(question)
    }

    /// Applies a partial update. The merged record must still satisfy the
    /// question invariants.
    pub async fn update(&self, id: &str, patch: UpdateQuestionRequest) -> Result<Question, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, question_text, options, correct_answer_index, created_at, updated_at
            FROM questions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

        if patch.is_empty() {
            return Ok(question);
        }

        if let Some(text) = patch.question_text {
            question.question_text = clean_html(text.trim());
        }
        if let Some(options) = patch.options {
            question.options = Json(options.iter().map(|o| clean_html(o)).collect());
        }
        if let Some(index) = patch.correct_answer_index {
            question.correct_answer_index = index;
        }
        check_question_shape(&question.options, question.correct_answer_index)?;
        question.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE questions
            SET question_text = ?, options = ?, correct_answer_index = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&question.question_text)
        .bind(&question.options)
        .bind(question.correct_answer_index)
        .bind(question.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::from(e)
        })?;

        tx.commit().await?;
        Ok(question)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> QuestionStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        QuestionStore::new(pool)
    }

    fn request(text: &str, correct: i64) -> CreateQuestionRequest {
        CreateQuestionRequest {
            question_text: text.to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer_index: correct,
        }
    }

    #[tokio::test]
    async fn sample_returns_unique_ids_up_to_limit() {
        let store = store().await;
        for i in 0..8 {
            store.insert(request(&format!("Q{}", i), i % 4)).await.unwrap();
        }

        let sampled = store.sample(5).await.unwrap();
        assert_eq!(sampled.len(), 5);
        let ids: HashSet<_> = sampled.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids.len(), 5);

        // Fewer than requested when the bank is small.
        assert_eq!(store.sample(50).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn insert_rejects_broken_shape() {
        let store = store().await;
        let mut req = request("Q", 0);
        req.options.pop();
        assert!(matches!(store.insert(req).await, Err(AppError::Validation(_))));
        assert!(matches!(store.insert(request("Q", 4)).await, Err(AppError::Validation(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_and_revalidates() {
        let store = store().await;
        let q = store.insert(request("Original", 0)).await.unwrap();

        let updated = store
            .update(
                &q.id,
                UpdateQuestionRequest {
                    correct_answer_index: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.correct_answer_index, 3);
        assert_eq!(updated.question_text, "Original");

        let err = store
            .update(
                &q.id,
                UpdateQuestionRequest {
                    options: Some(vec!["x".into()]),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert_eq!(store.get(&q.id).await.unwrap().options.len(), 4);
    }

    #[tokio::test]
    async fn answer_keys_skip_unknown_ids() {
        let store = store().await;
        let q = store.insert(request("Known", 2)).await.unwrap();

        let keys = store
            .answer_keys(&[q.id.clone(), "missing".to_string(), q.id.clone()])
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[&q.id].correct_answer_index, 2);
    }

    #[tokio::test]
    async fn answer_keys_handle_more_ids_than_sqlite_binds() {
        let store = store().await;
        let q = store.insert(request("Known", 1)).await.unwrap();

        let mut ids: Vec<String> = (0..40_000).map(|i| format!("missing-{}", i)).collect();
        ids.push(q.id.clone());

        let keys = store.answer_keys(&ids).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[&q.id].correct_answer_index, 1);
    }

    #[tokio::test]
    async fn delete_and_get_report_not_found() {
        let store = store().await;
        let q = store.insert(request("Gone", 1)).await.unwrap();
        store.delete(&q.id).await.unwrap();

        assert!(matches!(store.get(&q.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(&q.id).await, Err(AppError::NotFound(_))));
    }
}
