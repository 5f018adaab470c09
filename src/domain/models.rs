use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Resolved caller principal, derived from a validated bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "question_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Mcq,
    Input,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Questionnaire {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: Option<serde_json::Value>,
    pub question: String,
}

/// A junction row joined to its question, before display ordering.
#[derive(Debug, Clone, FromRow)]
pub struct JunctionQuestion {
    pub priority: i32,
    pub question_id: i32,
    pub kind: QuestionKind,
    pub options: Option<serde_json::Value>,
    pub question: String,
}

/// Display order for a questionnaire's questions: ascending junction
/// priority, ties broken by question id so repeated fetches agree.
pub fn order_questions(mut rows: Vec<JunctionQuestion>) -> Vec<Question> {
    rows.sort_by_key(|row| (row.priority, row.question_id));
    rows.into_iter()
        .map(|row| Question {
            id: row.question_id,
            kind: row.kind,
            options: row.options,
            question: row.question,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn junction(priority: i32, question_id: i32) -> JunctionQuestion {
        JunctionQuestion {
            priority,
            question_id,
            kind: QuestionKind::Input,
            options: None,
            question: format!("question {}", question_id),
        }
    }

    #[test]
    fn orders_by_ascending_priority() {
        let rows = vec![junction(3, 10), junction(1, 20), junction(2, 30)];
        let ordered = order_questions(rows);
        let ids: Vec<i32> = ordered.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![20, 30, 10]);
    }

    #[test]
    fn breaks_priority_ties_by_question_id() {
        let rows = vec![junction(1, 42), junction(1, 7), junction(1, 13)];
        let ordered = order_questions(rows);
        let ids: Vec<i32> = ordered.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![7, 13, 42]);
    }

    #[test]
    fn ordering_is_deterministic_across_fetches() {
        let rows = vec![junction(2, 5), junction(1, 9), junction(2, 3)];
        let first = order_questions(rows.clone());
        let second = order_questions(rows);
        let first_ids: Vec<i32> = first.iter().map(|q| q.id).collect();
        let second_ids: Vec<i32> = second.iter().map(|q| q.id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_ids, vec![9, 3, 5]);
    }
}
