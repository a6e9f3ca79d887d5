//! Free-standing AI helpers that do not persist anything.

use async_graphql::{Context, Enum, ID, InputObject, Object, SimpleObject};
use chrono::Utc;
use entity::{department, job_role};
use platform_api::validation_error;
use platform_genai::{
    InlineImage,
    flows::{
        ChatTurn, ChatbotInput, ChatbotReply, CompareFaces, CompareFacesInput, SuggestRole,
        SuggestRoleInput,
    },
    run_flow,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    auth::UserRole,
    directory::find_employee,
    schema::{
        ai_error, current_user, database, db_error, model_client, parse_uuid, require_any,
        required_text,
    },
};

pub const MAX_CHAT_MESSAGE_CHARS: usize = 4000;
pub const MAX_CHAT_HISTORY: usize = 20;
const MAX_SKILLS: usize = 50;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct ChatTurnInput {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct RoleSuggestionNode {
    pub suggested_role: String,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ChatReplyNode {
    pub reply: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct FaceMatchNode {
    pub is_match: bool,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Default)]
pub struct AssistantQuery;

#[Object]
impl AssistantQuery {
    /// Suggests the best-fitting job role of the tenant for an employee.
    async fn suggest_role(
        &self,
        ctx: &Context<'_>,
        employee_id: ID,
        skills: Option<Vec<String>>,
    ) -> async_graphql::Result<RoleSuggestionNode> {
        let user = require_any(ctx, &[UserRole::Hr, UserRole::Manager])?;
        let db = database(ctx)?;
        let employee = find_employee(db.as_ref(), user.tenant_id, parse_uuid(&employee_id)?).await?;
        let skills: Vec<String> = skills
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if skills.len() > MAX_SKILLS {
            return Err(validation_error(format!("at most {MAX_SKILLS} skills")));
        }

        let roles = job_role::Entity::find()
            .filter(job_role::Column::TenantId.eq(user.tenant_id))
            .order_by_asc(job_role::Column::Title)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        if roles.is_empty() {
            return Err(validation_error("no job roles are defined for this tenant"));
        }
        let current_role = employee
            .job_role_id
            .and_then(|id| roles.iter().find(|role| role.id == id))
            .map(|role| role.title.clone());
        let department = match employee.department_id {
            Some(id) => department::Entity::find_by_id(id)
                .one(db.as_ref())
                .await
                .map_err(db_error)?
                .map(|d| d.name),
            None => None,
        };
        let years_of_service = Utc::now()
            .date_naive()
            .years_since(employee.hire_date)
            .unwrap_or(0);

        let client = model_client(ctx)?;
        let suggestion = run_flow::<SuggestRole>(
            client.as_ref(),
            &SuggestRoleInput {
                employee_name: format!("{} {}", employee.first_name, employee.last_name),
                current_role,
                department,
                skills,
                years_of_service,
                available_roles: roles.into_iter().map(|role| role.title).collect(),
            },
        )
        .await
        .map_err(ai_error)?;
        Ok(RoleSuggestionNode {
            suggested_role: suggestion.suggested_role,
            confidence: suggestion.confidence,
            reasoning: suggestion.reasoning,
        })
    }
}

#[derive(Default)]
pub struct AssistantMutation;

#[Object]
impl AssistantMutation {
    /// HR assistant chat. The caller keeps the conversation and sends the
    /// recent turns back with every message.
    async fn chatbot_reply(
        &self,
        ctx: &Context<'_>,
        message: String,
        history: Option<Vec<ChatTurnInput>>,
    ) -> async_graphql::Result<ChatReplyNode> {
        current_user(ctx)?;
        let history = history.unwrap_or_default();
        let message = required_text("message", &message, MAX_CHAT_MESSAGE_CHARS)?;
        if history.len() > MAX_CHAT_HISTORY {
            return Err(validation_error(format!(
                "history may hold at most {MAX_CHAT_HISTORY} turns"
            )));
        }
        let history = history
            .into_iter()
            .map(|turn| {
                Ok(ChatTurn {
                    role: turn.role.as_str().to_string(),
                    content: required_text("history.content", &turn.content, MAX_CHAT_MESSAGE_CHARS)?,
                })
            })
            .collect::<async_graphql::Result<Vec<_>>>()?;
        let client = model_client(ctx)?;
        let answer = run_flow::<ChatbotReply>(client.as_ref(), &ChatbotInput { message, history })
            .await
            .map_err(ai_error)?;
        Ok(ChatReplyNode { reply: answer.reply })
    }

    /// Compares two face photos given as `data:image/...;base64,` URIs.
    async fn compare_faces(
        &self,
        ctx: &Context<'_>,
        reference_photo: String,
        candidate_photo: String,
    ) -> async_graphql::Result<FaceMatchNode> {
        require_any(ctx, &[UserRole::Hr])?;
        let input = CompareFacesInput {
            reference: InlineImage::parse_data_uri(reference_photo.trim()).map_err(ai_error)?,
            candidate: InlineImage::parse_data_uri(candidate_photo.trim()).map_err(ai_error)?,
        };
        let client = model_client(ctx)?;
        let verdict = run_flow::<CompareFaces>(client.as_ref(), &input)
            .await
            .map_err(ai_error)?;
        Ok(FaceMatchNode {
            is_match: verdict.is_match,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning,
        })
    }
}
