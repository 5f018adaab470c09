pub mod seed;

use crate::domain::models::{JunctionQuestion, Questionnaire};
use anyhow::Result;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResponseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub questionnaire_id: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub response_id: Uuid,
    pub question_id: i32,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ResponseWithAnswers {
    pub id: Uuid,
    pub user_id: Uuid,
    pub questionnaire_id: i32,
    pub answers: Vec<AnswerRecord>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserResponseCount {
    pub username: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReportResponseRow {
    pub response_id: Uuid,
    pub questionnaire_id: i32,
    pub questionnaire_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReportAnswerRow {
    pub response_id: Uuid,
    pub question_id: i32,
    pub question: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct QuestionnaireReport {
    pub questionnaire_name: String,
    pub answers: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    pub question: String,
    pub value: serde_json::Value,
}

pub struct NewAnswer {
    pub question_id: i32,
    pub value: serde_json::Value,
}

/// Postgres unique-constraint violation (SQLSTATE 23505). The schema's
/// uniqueness constraints are the last backstop against races; this is
/// how their failures are told apart from other database errors.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505")
}

// ---------------------------------------------------------------------------
// Users

pub async fn find_user_by_username(pool: &PgPool, username: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, username, password_hash, is_admin
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT id, username, password_hash, is_admin
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn insert_user(
    pool: &PgPool,
    id: Uuid,
    username: &str,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, is_admin)
        VALUES ($1, $2, $3, FALSE)
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(password_hash)
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog

pub async fn list_questionnaires(pool: &PgPool) -> Result<Vec<Questionnaire>> {
    let rows = sqlx::query_as::<_, Questionnaire>("SELECT id, name FROM questionnaires")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_questionnaire(pool: &PgPool, id: i32) -> Result<Option<Questionnaire>> {
    let row = sqlx::query_as::<_, Questionnaire>("SELECT id, name FROM questionnaires WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Junction rows for one questionnaire joined to their questions.
/// Display ordering is applied by the caller via
/// [`crate::domain::models::order_questions`].
pub async fn junction_questions(pool: &PgPool, questionnaire_id: i32) -> Result<Vec<JunctionQuestion>> {
    let rows = sqlx::query_as::<_, JunctionQuestion>(
        r#"
        SELECT j.priority, q.id AS question_id, q.kind, q.options, q.question
        FROM question_junctions j
        JOIN questions q ON q.id = j.question_id
        WHERE j.questionnaire_id = $1
        "#,
    )
    .bind(questionnaire_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn existing_question_ids(pool: &PgPool, ids: &[i32]) -> Result<HashSet<i32>> {
    let rows: Vec<(i32,)> = sqlx::query_as("SELECT id FROM questions WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// ---------------------------------------------------------------------------
// Response ledger

/// Replace-on-conflict submission: the caller's prior response for this
/// questionnaire (and, by cascade, its answers) is deleted and the new
/// response inserted in one transaction. Either everything commits or
/// the prior state survives untouched.
pub async fn replace_response(
    pool: &PgPool,
    user_id: Uuid,
    questionnaire_id: i32,
    answers: &[NewAnswer],
) -> Result<ResponseWithAnswers, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM responses WHERE user_id = $1 AND questionnaire_id = $2")
        .bind(user_id)
        .bind(questionnaire_id)
        .execute(&mut *tx)
        .await?;

    let response_id = Uuid::new_v4();
    sqlx::query("INSERT INTO responses (id, user_id, questionnaire_id) VALUES ($1, $2, $3)")
        .bind(response_id)
        .bind(user_id)
        .bind(questionnaire_id)
        .execute(&mut *tx)
        .await?;

    let mut inserted = Vec::with_capacity(answers.len());
    for answer in answers {
        let answer_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO answers (id, response_id, question_id, value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(answer_id)
        .bind(response_id)
        .bind(answer.question_id)
        .bind(&answer.value)
        .execute(&mut *tx)
        .await?;

        inserted.push(AnswerRecord {
            id: answer_id,
            response_id,
            question_id: answer.question_id,
            value: answer.value.clone(),
        });
    }

    tx.commit().await?;

    Ok(ResponseWithAnswers {
        id: response_id,
        user_id,
        questionnaire_id,
        answers: inserted,
    })
}

pub async fn all_responses(pool: &PgPool) -> Result<Vec<ResponseWithAnswers>> {
    let responses = sqlx::query_as::<_, ResponseRow>(
        "SELECT id, user_id, questionnaire_id FROM responses ORDER BY questionnaire_id, id",
    )
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, AnswerRecord>(
        "SELECT id, response_id, question_id, value FROM answers",
    )
    .fetch_all(pool)
    .await?;

    Ok(group_answers(responses, answers))
}

pub async fn responses_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<ResponseWithAnswers>> {
    let responses = sqlx::query_as::<_, ResponseRow>(
        r#"
        SELECT id, user_id, questionnaire_id
        FROM responses
        WHERE user_id = $1
        ORDER BY questionnaire_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, AnswerRecord>(
        r#"
        SELECT a.id, a.response_id, a.question_id, a.value
        FROM answers a
        JOIN responses r ON r.id = a.response_id
        WHERE r.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(group_answers(responses, answers))
}

// ---------------------------------------------------------------------------
// Admin reports

pub async fn response_counts_by_non_admin(pool: &PgPool) -> Result<Vec<UserResponseCount>> {
    let rows = sqlx::query_as::<_, UserResponseCount>(
        r#"
        SELECT u.username, COUNT(r.id) AS count
        FROM users u
        LEFT JOIN responses r ON r.user_id = u.id
        WHERE u.is_admin = FALSE
        GROUP BY u.username
        ORDER BY u.username
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn user_report(pool: &PgPool, user_id: Uuid) -> Result<Vec<QuestionnaireReport>> {
    let responses = sqlx::query_as::<_, ReportResponseRow>(
        r#"
        SELECT r.id AS response_id, r.questionnaire_id, q.name AS questionnaire_name
        FROM responses r
        JOIN questionnaires q ON q.id = r.questionnaire_id
        WHERE r.user_id = $1
        ORDER BY r.questionnaire_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, ReportAnswerRow>(
        r#"
        SELECT a.response_id, a.question_id, qs.question, a.value
        FROM answers a
        JOIN responses r ON r.id = a.response_id
        JOIN questions qs ON qs.id = a.question_id
        WHERE r.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(build_user_report(responses, answers))
}

// ---------------------------------------------------------------------------
// Row shaping. Joins are fetched in bulk above; these put the pieces
// back together in memory with a deterministic answer order.

fn group_answers(
    responses: Vec<ResponseRow>,
    answers: Vec<AnswerRecord>,
) -> Vec<ResponseWithAnswers> {
    let mut by_response: HashMap<Uuid, Vec<AnswerRecord>> = HashMap::new();
    for answer in answers {
        by_response.entry(answer.response_id).or_default().push(answer);
    }

    responses
        .into_iter()
        .map(|response| {
            let mut answers = by_response.remove(&response.id).unwrap_or_default();
            answers.sort_by_key(|a| a.question_id);
            ResponseWithAnswers {
                id: response.id,
                user_id: response.user_id,
                questionnaire_id: response.questionnaire_id,
                answers,
            }
        })
        .collect()
}

fn build_user_report(
    responses: Vec<ReportResponseRow>,
    answers: Vec<ReportAnswerRow>,
) -> Vec<QuestionnaireReport> {
    let mut by_response: HashMap<Uuid, Vec<ReportAnswerRow>> = HashMap::new();
    for answer in answers {
        by_response.entry(answer.response_id).or_default().push(answer);
    }

    responses
        .into_iter()
        .map(|response| {
            let mut rows = by_response.remove(&response.response_id).unwrap_or_default();
            rows.sort_by_key(|r| r.question_id);
            QuestionnaireReport {
                questionnaire_name: response.questionnaire_name,
                answers: rows
                    .into_iter()
                    .map(|r| ReportEntry {
                        question: r.question,
                        value: r.value,
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answer(response_id: Uuid, question_id: i32, value: &str) -> AnswerRecord {
        AnswerRecord {
            id: Uuid::new_v4(),
            response_id,
            question_id,
            value: json!([value]),
        }
    }

    #[test]
    fn groups_answers_under_their_response() {
        let r1 = Uuid::new_v4();
        let r2 = Uuid::new_v4();
        let user = Uuid::new_v4();
        let responses = vec![
            ResponseRow { id: r1, user_id: user, questionnaire_id: 1 },
            ResponseRow { id: r2, user_id: user, questionnaire_id: 2 },
        ];
        let answers = vec![answer(r2, 5, "b"), answer(r1, 3, "a"), answer(r1, 1, "c")];

        let grouped = group_answers(responses, answers);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].answers.len(), 2);
        assert_eq!(grouped[1].answers.len(), 1);
        // answers come back sorted by question id
        assert_eq!(grouped[0].answers[0].question_id, 1);
        assert_eq!(grouped[0].answers[1].question_id, 3);
    }

    #[test]
    fn response_without_answers_stays_in_listing() {
        let r1 = Uuid::new_v4();
        let responses = vec![ResponseRow {
            id: r1,
            user_id: Uuid::new_v4(),
            questionnaire_id: 7,
        }];

        let grouped = group_answers(responses, vec![]);
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].answers.is_empty());
    }

    #[test]
    fn report_orders_answers_by_question_id() {
        let response_id = Uuid::new_v4();
        let responses = vec![ReportResponseRow {
            response_id,
            questionnaire_id: 1,
            questionnaire_name: "Intake".to_string(),
        }];
        let answers = vec![
            ReportAnswerRow {
                response_id,
                question_id: 9,
                question: "third".to_string(),
                value: json!(["c"]),
            },
            ReportAnswerRow {
                response_id,
                question_id: 2,
                question: "first".to_string(),
                value: json!(["a"]),
            },
            ReportAnswerRow {
                response_id,
                question_id: 4,
                question: "second".to_string(),
                value: json!(["b"]),
            },
        ];

        let report = build_user_report(responses, answers);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].questionnaire_name, "Intake");
        let questions: Vec<&str> = report[0].answers.iter().map(|a| a.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second", "third"]);
    }

    #[test]
    fn report_keeps_answerless_response() {
        let responses = vec![ReportResponseRow {
            response_id: Uuid::new_v4(),
            questionnaire_id: 3,
            questionnaire_name: "Follow-up".to_string(),
        }];

        let report = build_user_report(responses, vec![]);
        assert_eq!(report.len(), 1);
        assert!(report[0].answers.is_empty());
    }
}
