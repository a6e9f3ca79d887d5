use async_graphql::{Context, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::applicant;
use platform_api::validation_error;
use platform_genai::{
    flows::{
        GenerateInterviewQuestions, GenerateJobDescription, InterviewQuestionsInput,
        JobDescriptionInput, MAX_INTERVIEW_QUESTIONS, ScoreResume, ScoreResumeInput,
    },
    run_flow,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::{
    auth::UserRole,
    schema::{
        ai_error, conflict, database, db_error, model_client, normalize_email, not_found, now,
        optional_text, page_window, parse_uuid, require_any, required_text,
    },
};

const RECRUITERS: &[UserRole] = &[UserRole::Recruiter, UserRole::Hr];
const MAX_RESUME_CHARS: usize = 50_000;
const DEFAULT_QUESTION_COUNT: u32 = 5;

graphql_enum!(ApplicantStage => applicant::Stage {
    Applied, Screening, Interview, Offered, Hired, Rejected
});

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Applicant")]
pub struct ApplicantNode {
    pub id: ID,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub resume_text: String,
    pub status: ApplicantStage,
    pub ai_score: Option<i32>,
    pub ai_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<applicant::Model> for ApplicantNode {
    fn from(model: applicant::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            position: model.position,
            resume_text: model.resume_text,
            status: model.status.into(),
            ai_score: model.ai_score,
            ai_summary: model.ai_summary,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewApplicantInput {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub resume_text: String,
}

#[derive(Clone, Debug, InputObject)]
pub struct JobDescriptionRequest {
    pub title: String,
    pub department: Option<String>,
    pub seniority: Option<String>,
    pub key_skills: Option<Vec<String>>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "JobDescription")]
pub struct JobDescriptionNode {
    pub title: String,
    pub summary: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "InterviewQuestion")]
pub struct InterviewQuestionNode {
    pub question: String,
    pub focus: String,
}

async fn find_applicant(
    db: &sea_orm::DatabaseConnection,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<applicant::Model> {
    applicant::Entity::find_by_id(id)
        .filter(applicant::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("applicant"))
}

fn trimmed_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[derive(Default)]
pub struct RecruitmentQuery;

#[Object]
impl RecruitmentQuery {
    async fn applicants(
        &self,
        ctx: &Context<'_>,
        status: Option<ApplicantStage>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<ApplicantNode>> {
        let user = require_any(ctx, RECRUITERS)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let span = info_span!("applicants", tenant_id = %user.tenant_id, status = ?status);
        let mut query =
            applicant::Entity::find().filter(applicant::Column::TenantId.eq(user.tenant_id));
        if let Some(status) = status {
            query = query.filter(applicant::Column::Status.eq(applicant::Stage::from(status)));
        }
        let rows = query
            .order_by_desc(applicant::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .instrument(span)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(ApplicantNode::from).collect())
    }

    async fn applicant(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<ApplicantNode> {
        let user = require_any(ctx, RECRUITERS)?;
        let db = database(ctx)?;
        Ok(find_applicant(db.as_ref(), user.tenant_id, parse_uuid(&id)?)
            .await?
            .into())
    }
}

#[derive(Default)]
pub struct RecruitmentMutation;

#[Object]
impl RecruitmentMutation {
    async fn create_applicant(
        &self,
        ctx: &Context<'_>,
        input: NewApplicantInput,
    ) -> async_graphql::Result<ApplicantNode> {
        let user = require_any(ctx, RECRUITERS)?;
        let db = database(ctx)?;
        let timestamp = now();
        let model = applicant::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            full_name: Set(required_text("fullName", &input.full_name, 200)?),
            email: Set(normalize_email(&input.email)?),
            phone: Set(optional_text("phone", input.phone, 32)?),
            position: Set(required_text("position", &input.position, 120)?),
            resume_text: Set(required_text("resumeText", &input.resume_text, MAX_RESUME_CHARS)?),
            status: Set(applicant::Stage::Applied),
            ai_score: Set(None),
            ai_summary: Set(None),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(applicant_id = %model.id, "applicant created");
        Ok(model.into())
    }

    /// Moves an applicant one stage forward, or to `REJECTED` from any open
    /// stage.
    async fn update_applicant_status(
        &self,
        ctx: &Context<'_>,
        id: ID,
        status: ApplicantStage,
    ) -> async_graphql::Result<ApplicantNode> {
        let user = require_any(ctx, RECRUITERS)?;
        let db = database(ctx)?;
        let record = find_applicant(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let next = applicant::Stage::from(status);
        if !record.status.can_move_to(next) {
            return Err(conflict(format!(
                "cannot move applicant from {:?} to {:?}",
                record.status, next
            )));
        }
        let mut active: applicant::ActiveModel = record.into();
        active.status = Set(next);
        active.updated_at = Set(now());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Scores the stored resume against `jobDescription` and keeps the result
    /// on the applicant.
    async fn score_applicant(
        &self,
        ctx: &Context<'_>,
        id: ID,
        job_description: String,
    ) -> async_graphql::Result<ApplicantNode> {
        let user = require_any(ctx, RECRUITERS)?;
        let db = database(ctx)?;
        let job_description = required_text("jobDescription", &job_description, 20_000)?;
        let record = find_applicant(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let client = model_client(ctx)?;
        let score = run_flow::<ScoreResume>(
            client.as_ref(),
            &ScoreResumeInput {
                resume_text: record.resume_text.clone(),
                job_description,
            },
        )
        .await
        .map_err(ai_error)?;

        let mut active: applicant::ActiveModel = record.into();
        active.ai_score = Set(Some(score.score as i32));
        active.ai_summary = Set(Some(score.summary));
        active.updated_at = Set(now());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        info!(applicant_id = %updated.id, score = score.score, "applicant scored");
        Ok(updated.into())
    }

    async fn generate_job_description(
        &self,
        ctx: &Context<'_>,
        input: JobDescriptionRequest,
    ) -> async_graphql::Result<JobDescriptionNode> {
        require_any(ctx, RECRUITERS)?;
        let client = model_client(ctx)?;
        let input = JobDescriptionInput {
            title: required_text("title", &input.title, 120)?,
            department: optional_text("department", input.department, 120)?,
            seniority: optional_text("seniority", input.seniority, 60)?,
            key_skills: trimmed_list(input.key_skills.unwrap_or_default()),
        };
        let description = run_flow::<GenerateJobDescription>(client.as_ref(), &input)
            .await
            .map_err(ai_error)?;
        Ok(JobDescriptionNode {
            title: description.title,
            summary: description.summary,
            responsibilities: description.responsibilities,
            requirements: description.requirements,
        })
    }

    async fn generate_interview_questions(
        &self,
        ctx: &Context<'_>,
        role: String,
        job_description: Option<String>,
        count: Option<i32>,
    ) -> async_graphql::Result<Vec<InterviewQuestionNode>> {
        require_any(ctx, RECRUITERS)?;
        let count = count.map_or(Ok(DEFAULT_QUESTION_COUNT), |count| {
            u32::try_from(count)
                .ok()
                .filter(|count| (1..=MAX_INTERVIEW_QUESTIONS).contains(count))
                .ok_or_else(|| {
                    validation_error(format!(
                        "count must be between 1 and {MAX_INTERVIEW_QUESTIONS}"
                    ))
                })
        })?;
        let input = InterviewQuestionsInput {
            role: required_text("role", &role, 120)?,
            job_description: optional_text("jobDescription", job_description, 20_000)?,
            count,
        };
        let client = model_client(ctx)?;
        let generated = run_flow::<GenerateInterviewQuestions>(client.as_ref(), &input)
            .await
            .map_err(ai_error)?;
        Ok(generated
            .questions
            .into_iter()
            .map(|q| InterviewQuestionNode {
                question: q.question,
                focus: q.focus,
            })
            .collect())
    }
}
