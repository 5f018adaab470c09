use crate::config::Config;
use crate::domain::models::QuestionKind;
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

struct SeedQuestion {
    id: i32,
    kind: QuestionKind,
    options: Option<serde_json::Value>,
    question: &'static str,
}

/// Populates the store before the service starts answering requests:
/// the admin account always, the sample catalog only when the catalog
/// tables are empty. Bulk imports happen out of band.
pub async fn seed_all(pool: &PgPool, config: &Config) -> Result<()> {
    seed_admin(pool, config).await?;
    seed_catalog(pool).await?;
    Ok(())
}

async fn seed_admin(pool: &PgPool, config: &Config) -> Result<()> {
    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(config.admin_password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, is_admin)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&config.admin_username)
    .bind(&hash)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_catalog(pool: &PgPool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questionnaires")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    tracing::info!("Catalog empty, seeding sample questionnaires");

    let questionnaires = vec![(1, "Health Intake"), (2, "Lifestyle Follow-up")];
    for (id, name) in &questionnaires {
        sqlx::query("INSERT INTO questionnaires (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }

    let questions = vec![
        SeedQuestion {
            id: 1,
            kind: QuestionKind::Mcq,
            options: Some(json!(["Excellent", "Good", "Fair", "Poor"])),
            question: "How would you rate your overall health?",
        },
        SeedQuestion {
            id: 2,
            kind: QuestionKind::Input,
            options: Some(json!([])),
            question: "List any medications you are currently taking.",
        },
        SeedQuestion {
            id: 3,
            kind: QuestionKind::Mcq,
            options: Some(json!(["Never", "Occasionally", "Weekly", "Daily"])),
            question: "How often do you exercise?",
        },
        SeedQuestion {
            id: 4,
            kind: QuestionKind::Input,
            options: Some(json!([])),
            question: "Describe your sleep routine.",
        },
        SeedQuestion {
            id: 5,
            kind: QuestionKind::Mcq,
            options: Some(json!(["Yes", "No"])),
            question: "Do you smoke?",
        },
    ];
    for q in &questions {
        sqlx::query("INSERT INTO questions (id, kind, options, question) VALUES ($1, $2, $3, $4)")
            .bind(q.id)
            .bind(q.kind.clone())
            .bind(&q.options)
            .bind(q.question)
            .execute(pool)
            .await?;
    }

    // (questionnaire, question, priority); question 3 appears in both
    let junctions = vec![
        (1, 1, 10),
        (1, 2, 20),
        (1, 3, 30),
        (2, 3, 10),
        (2, 4, 20),
        (2, 5, 30),
    ];
    for (questionnaire_id, question_id, priority) in &junctions {
        sqlx::query(
            r#"
            INSERT INTO question_junctions (questionnaire_id, question_id, priority)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(questionnaire_id)
        .bind(question_id)
        .bind(priority)
        .execute(pool)
        .await?;
    }

    Ok(())
}
