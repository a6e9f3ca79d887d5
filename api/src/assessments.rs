use std::time::Duration;

use async_graphql::{Context, ID, InputObject, Json, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::assessment;
use platform_api::validation_error;
use platform_genai::{
    flows::{CallQualityInput, EvaluateCallQuality},
    run_flow,
};
use products_hr::{TypingResult, TypingTest, WpmSample};
use rand::seq::SliceRandom;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::UserRole,
    directory::find_employee,
    schema::{
        ai_error, current_user, database, db_error, model_client, not_found, now, optional_text,
        own_employee, page_window, parse_optional_id, parse_uuid, require_any, required_text,
        target_employee,
    },
};

const ASSESSMENT_READERS: &[UserRole] = &[UserRole::Hr, UserRole::Manager, UserRole::QaAnalyst];
const MAX_KEYSTROKES: usize = 20_000;
const MAX_TRANSCRIPT_CHARS: usize = 50_000;

pub const TYPING_TIME_LIMIT_SECS: u64 = 60;

pub struct TypingPassage {
    pub id: &'static str,
    pub text: &'static str,
}

pub const TYPING_PASSAGES: &[TypingPassage] = &[
    TypingPassage {
        id: "onboarding",
        text: "Welcome to the team. Please review the employee handbook, complete your \
               profile, and reach out to your manager if anything is unclear during \
               your first week.",
    },
    TypingPassage {
        id: "customer-call",
        text: "Thank you for calling. I understand the issue you are facing and I will \
               walk you through each step until the problem is fully resolved today.",
    },
    TypingPassage {
        id: "policy",
        text: "All leave requests must be submitted through the portal at least two \
               working days in advance, except in cases of illness or emergency.",
    },
    TypingPassage {
        id: "pangram",
        text: "The quick brown fox jumps over the lazy dog while five boxing wizards \
               jump quickly and a wizard's job is to vex chumps quickly in fog.",
    },
];

pub fn find_passage(id: &str) -> Option<&'static TypingPassage> {
    TYPING_PASSAGES.iter().find(|passage| passage.id == id)
}

graphql_enum!(AssessmentKind => assessment::Kind { Typing, QaCall });

#[derive(Clone, Debug, SimpleObject)]
pub struct TypingPrompt {
    pub id: String,
    pub text: String,
    pub time_limit_seconds: i32,
}

impl From<&TypingPassage> for TypingPrompt {
    fn from(passage: &TypingPassage) -> Self {
        Self {
            id: passage.id.to_string(),
            text: passage.text.to_string(),
            time_limit_seconds: TYPING_TIME_LIMIT_SECS as i32,
        }
    }
}

/// Snapshot of the input box at `atMs` after the test started.
#[derive(Clone, Debug, InputObject)]
pub struct KeystrokeInput {
    pub text: String,
    pub at_ms: i32,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Assessment")]
pub struct AssessmentNode {
    pub id: ID,
    pub employee_id: ID,
    pub kind: AssessmentKind,
    pub score: i32,
    pub wpm: Option<i32>,
    pub accuracy: Option<i32>,
    pub details: Option<Json<serde_json::Value>>,
    pub assessed_by: Option<ID>,
    pub created_at: DateTime<Utc>,
}

impl From<assessment::Model> for AssessmentNode {
    fn from(model: assessment::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            employee_id: ID::from(model.employee_id.to_string()),
            kind: model.kind.into(),
            score: model.score,
            wpm: model.wpm,
            accuracy: model.accuracy,
            details: model.details.map(Json),
            assessed_by: model.assessed_by.map(|id| ID::from(id.to_string())),
            created_at: model.created_at.into(),
        }
    }
}

/// Replays recorded input snapshots and the final text through a fresh
/// [`TypingTest`], then finalizes it at `elapsed` (capped at the limit).
pub fn score_typing(
    passage: &TypingPassage,
    typed: &str,
    elapsed: Duration,
    keystrokes: &[(String, Duration)],
) -> Result<(TypingResult, Vec<WpmSample>), products_hr::TypingError> {
    let limit = Duration::from_secs(TYPING_TIME_LIMIT_SECS);
    let mut test = TypingTest::new(passage.text, limit)?;
    let finish_at = elapsed.min(limit);
    let mut ordered: Vec<&(String, Duration)> =
        keystrokes.iter().filter(|(_, at)| *at < finish_at).collect();
    ordered.sort_by_key(|(_, at)| *at);
    for (text, at) in ordered {
        test.input(text, *at);
    }
    test.input(typed, finish_at.saturating_sub(Duration::from_millis(1)));
    let result = test.submit(finish_at);
    Ok((result, test.samples().to_vec()))
}

#[derive(Default)]
pub struct AssessmentsQuery;

#[Object]
impl AssessmentsQuery {
    /// A passage by id, or a random one from the catalogue.
    async fn typing_prompt(
        &self,
        ctx: &Context<'_>,
        id: Option<String>,
    ) -> async_graphql::Result<TypingPrompt> {
        current_user(ctx)?;
        let passage = match id.as_deref() {
            Some(id) => find_passage(id).ok_or_else(|| not_found("typing prompt"))?,
            None => TYPING_PASSAGES
                .choose(&mut rand::thread_rng())
                .ok_or_else(|| not_found("typing prompt"))?,
        };
        Ok(passage.into())
    }

    async fn typing_prompts(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<TypingPrompt>> {
        current_user(ctx)?;
        Ok(TYPING_PASSAGES.iter().map(TypingPrompt::from).collect())
    }

    /// HR, managers and QA analysts read everyone's results; others their own.
    async fn assessments(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<ID>,
        kind: Option<AssessmentKind>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<AssessmentNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let requested = parse_optional_id(employee_id.as_ref())?;
        let mut query =
            assessment::Entity::find().filter(assessment::Column::TenantId.eq(user.tenant_id));
        match requested {
            None if user.has_any(ASSESSMENT_READERS) => {}
            _ => {
                let id = target_employee(&user, requested, ASSESSMENT_READERS)?;
                query = query.filter(assessment::Column::EmployeeId.eq(id));
            }
        }
        if let Some(kind) = kind {
            query = query.filter(assessment::Column::Kind.eq(assessment::Kind::from(kind)));
        }
        let rows = query
            .order_by_desc(assessment::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AssessmentNode::from).collect())
    }
}

#[derive(Default)]
pub struct AssessmentsMutation;

#[Object]
impl AssessmentsMutation {
    /// Scores a finished typing test for the caller and stores the result.
    async fn submit_typing_test(
        &self,
        ctx: &Context<'_>,
        prompt_id: String,
        typed: String,
        elapsed_seconds: f64,
        keystrokes: Option<Vec<KeystrokeInput>>,
    ) -> async_graphql::Result<AssessmentNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let employee_id = own_employee(&user)?;
        let passage = find_passage(&prompt_id).ok_or_else(|| not_found("typing prompt"))?;
        if !elapsed_seconds.is_finite() || elapsed_seconds < 0.0 {
            return Err(validation_error("elapsedSeconds must be a non-negative number"));
        }
        let keystrokes = keystrokes.unwrap_or_default();
        if keystrokes.len() > MAX_KEYSTROKES {
            return Err(validation_error(format!(
                "at most {MAX_KEYSTROKES} keystrokes may be submitted"
            )));
        }
        let elapsed = Duration::from_secs_f64(elapsed_seconds.min(TYPING_TIME_LIMIT_SECS as f64));
        let snapshots: Vec<(String, Duration)> = keystrokes
            .into_iter()
            .filter(|k| k.at_ms >= 0)
            .map(|k| (k.text, Duration::from_millis(k.at_ms as u64)))
            .collect();
        let (result, samples) = score_typing(passage, &typed, elapsed, &snapshots)
            .map_err(|err| validation_error(err.to_string()))?;

        let details = json!({
            "promptId": passage.id,
            "samples": samples,
            "elapsedMs": result.elapsed_ms,
        });
        let model = assessment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            employee_id: Set(employee_id),
            kind: Set(assessment::Kind::Typing),
            score: Set(result.accuracy as i32),
            wpm: Set(Some(result.wpm as i32)),
            accuracy: Set(Some(result.accuracy as i32)),
            details: Set(Some(details)),
            assessed_by: Set(None),
            created_at: Set(now()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(assessment_id = %model.id, wpm = result.wpm, accuracy = result.accuracy, "typing test scored");
        Ok(model.into())
    }

    /// Rates a recorded call for `employeeId` and stores the report.
    async fn evaluate_call_quality(
        &self,
        ctx: &Context<'_>,
        employee_id: ID,
        transcript: String,
        rubric: Option<String>,
    ) -> async_graphql::Result<AssessmentNode> {
        let user = require_any(ctx, &[UserRole::QaAnalyst])?;
        let db = database(ctx)?;
        let employee = find_employee(db.as_ref(), user.tenant_id, parse_uuid(&employee_id)?).await?;
        let input = CallQualityInput {
            transcript: required_text("transcript", &transcript, MAX_TRANSCRIPT_CHARS)?,
            rubric: optional_text("rubric", rubric, 5000)?,
        };
        let client = model_client(ctx)?;
        let report = run_flow::<EvaluateCallQuality>(client.as_ref(), &input)
            .await
            .map_err(ai_error)?;

        let details = json!({
            "summary": report.summary,
            "strengths": report.strengths,
            "improvements": report.improvements,
        });
        let model = assessment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            employee_id: Set(employee.id),
            kind: Set(assessment::Kind::QaCall),
            score: Set(report.score as i32),
            wpm: Set(None),
            accuracy: Set(None),
            details: Set(Some(details)),
            assessed_by: Set(Some(user.user_id)),
            created_at: Set(now()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(assessment_id = %model.id, score = model.score, "call quality evaluated");
        Ok(model.into())
    }
}
