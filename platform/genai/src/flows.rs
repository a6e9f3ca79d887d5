//! The HR flows. Each pairs an input, a prompt template and a validated
//! output shape.

use serde::{Deserialize, Serialize};

use crate::{
    GenAiResult, InlineImage, Part,
    flow::{Flow, Validate, require_percentage, require_text, require_unit_interval},
};

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none given)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn require_items(field: &str, items: &[String]) -> Result<(), String> {
    if items.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    items.iter().try_for_each(|item| require_text(field, item))
}

// ---------------------------------------------------------------------------
// Role suggestion

pub struct SuggestRole;

#[derive(Debug, Clone, Serialize)]
pub struct SuggestRoleInput {
    pub employee_name: String,
    pub current_role: Option<String>,
    pub department: Option<String>,
    pub skills: Vec<String>,
    pub years_of_service: u32,
    pub available_roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleSuggestion {
    pub suggested_role: String,
    pub confidence: f64,
    pub reasoning: String,
}

impl Validate for RoleSuggestion {
    fn validate(&self) -> Result<(), String> {
        require_text("suggestedRole", &self.suggested_role)?;
        require_unit_interval("confidence", self.confidence)?;
        require_text("reasoning", &self.reasoning)
    }
}

impl Flow for SuggestRole {
    const NAME: &'static str = "suggestRole";
    type Input = SuggestRoleInput;
    type Output = RoleSuggestion;

    fn system() -> &'static str {
        "You are an HR career advisor. Suggest the best next role for an employee. \
         Respond with a single JSON object and nothing else, shaped as \
         {\"suggestedRole\": string, \"confidence\": number between 0 and 1, \"reasoning\": string}."
    }

    fn prompt(input: &SuggestRoleInput) -> GenAiResult<Vec<Part>> {
        Ok(vec![Part::text(format!(
            "Employee: {}\nCurrent role: {}\nDepartment: {}\nYears of service: {}\n\
             Skills:\n{}\n\nRoles available in the organisation:\n{}",
            input.employee_name,
            input.current_role.as_deref().unwrap_or("unassigned"),
            input.department.as_deref().unwrap_or("unassigned"),
            input.years_of_service,
            bullet_list(&input.skills),
            bullet_list(&input.available_roles),
        ))])
    }
}

// ---------------------------------------------------------------------------
// Resume scoring

pub struct ScoreResume;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResumeInput {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeScore {
    pub score: i64,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
}

impl Validate for ResumeScore {
    fn validate(&self) -> Result<(), String> {
        require_percentage("score", self.score)?;
        require_text("summary", &self.summary)
    }
}

impl Flow for ScoreResume {
    const NAME: &'static str = "scoreResume";
    type Input = ScoreResumeInput;
    type Output = ResumeScore;

    fn system() -> &'static str {
        "You are a recruiter screening candidates. Score how well the resume matches the job \
         description. Respond with a single JSON object and nothing else, shaped as \
         {\"score\": integer 0-100, \"summary\": string, \"strengths\": [string], \"gaps\": [string]}."
    }

    fn prompt(input: &ScoreResumeInput) -> GenAiResult<Vec<Part>> {
        Ok(vec![Part::text(format!(
            "Job description:\n{}\n\nResume:\n{}",
            input.job_description, input.resume_text
        ))])
    }
}

// ---------------------------------------------------------------------------
// HR assistant chat

pub struct ChatbotReply;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatbotInput {
    pub message: String,
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatbotAnswer {
    pub reply: String,
}

impl Validate for ChatbotAnswer {
    fn validate(&self) -> Result<(), String> {
        require_text("reply", &self.reply)
    }
}

impl Flow for ChatbotReply {
    const NAME: &'static str = "chatbotReply";
    const TEMPERATURE: f32 = 0.6;
    type Input = ChatbotInput;
    type Output = ChatbotAnswer;

    fn system() -> &'static str {
        "You are OptiTalent's HR help assistant. Answer employee questions about leave, \
         payroll, attendance, learning and company policy briefly and politely. \
         Respond with a single JSON object and nothing else, shaped as {\"reply\": string}."
    }

    fn prompt(input: &ChatbotInput) -> GenAiResult<Vec<Part>> {
        let mut transcript = String::new();
        for turn in &input.history {
            let speaker = if turn.role.eq_ignore_ascii_case("assistant") {
                "Assistant"
            } else {
                "User"
            };
            transcript.push_str(&format!("{speaker}: {}\n", turn.content));
        }
        transcript.push_str(&format!("User: {}\n", input.message));
        Ok(vec![Part::text(transcript)])
    }
}

// ---------------------------------------------------------------------------
// Face comparison

pub struct CompareFaces;

#[derive(Debug, Clone)]
pub struct CompareFacesInput {
    pub reference: InlineImage,
    pub candidate: InlineImage,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaceVerdict {
    pub is_match: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl Validate for FaceVerdict {
    fn validate(&self) -> Result<(), String> {
        require_unit_interval("confidence", self.confidence)
    }
}

impl Flow for CompareFaces {
    const NAME: &'static str = "compareFaces";
    const TEMPERATURE: f32 = 0.0;
    type Input = CompareFacesInput;
    type Output = FaceVerdict;

    fn system() -> &'static str {
        "You verify attendance photos. Decide whether the two photos show the same person. \
         Respond with a single JSON object and nothing else, shaped as \
         {\"isMatch\": boolean, \"confidence\": number between 0 and 1, \"reasoning\": string}."
    }

    fn prompt(input: &CompareFacesInput) -> GenAiResult<Vec<Part>> {
        Ok(vec![
            Part::text("Reference photo:"),
            Part::Image(input.reference.clone()),
            Part::text("Photo taken at clock-in:"),
            Part::Image(input.candidate.clone()),
        ])
    }
}

// ---------------------------------------------------------------------------
// Ticket triage

pub struct CategorizeTicket;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    It,
    Hr,
    Payroll,
    Facilities,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorizeTicketInput {
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketTriage {
    pub category: TicketCategory,
    pub priority: TicketPriority,
    #[serde(default)]
    pub rationale: String,
}

impl Validate for TicketTriage {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Flow for CategorizeTicket {
    const NAME: &'static str = "categorizeTicket";
    const TEMPERATURE: f32 = 0.0;
    type Input = CategorizeTicketInput;
    type Output = TicketTriage;

    fn system() -> &'static str {
        "You triage internal helpdesk tickets. Pick one category from IT, HR, PAYROLL, \
         FACILITIES, OTHER and one priority from LOW, MEDIUM, HIGH, URGENT. \
         Respond with a single JSON object and nothing else, shaped as \
         {\"category\": string, \"priority\": string, \"rationale\": string}."
    }

    fn prompt(input: &CategorizeTicketInput) -> GenAiResult<Vec<Part>> {
        Ok(vec![Part::text(format!(
            "Subject: {}\n\n{}",
            input.subject, input.description
        ))])
    }
}

// ---------------------------------------------------------------------------
// Job description drafting

pub struct GenerateJobDescription;

#[derive(Debug, Clone, Serialize)]
pub struct JobDescriptionInput {
    pub title: String,
    pub department: Option<String>,
    pub seniority: Option<String>,
    pub key_skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobDescription {
    pub title: String,
    pub summary: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
}

impl Validate for JobDescription {
    fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title)?;
        require_text("summary", &self.summary)?;
        require_items("responsibilities", &self.responsibilities)?;
        require_items("requirements", &self.requirements)
    }
}

impl Flow for GenerateJobDescription {
    const NAME: &'static str = "generateJobDescription";
    const TEMPERATURE: f32 = 0.7;
    type Input = JobDescriptionInput;
    type Output = JobDescription;

    fn system() -> &'static str {
        "You write job descriptions for an HR team. Respond with a single JSON object and \
         nothing else, shaped as {\"title\": string, \"summary\": string, \
         \"responsibilities\": [string], \"requirements\": [string]}."
    }

    fn prompt(input: &JobDescriptionInput) -> GenAiResult<Vec<Part>> {
        Ok(vec![Part::text(format!(
            "Title: {}\nDepartment: {}\nSeniority: {}\nKey skills:\n{}",
            input.title,
            input.department.as_deref().unwrap_or("any"),
            input.seniority.as_deref().unwrap_or("unspecified"),
            bullet_list(&input.key_skills),
        ))])
    }
}

// ---------------------------------------------------------------------------
// Interview questions

pub struct GenerateInterviewQuestions;

pub const MAX_INTERVIEW_QUESTIONS: u32 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct InterviewQuestionsInput {
    pub role: String,
    pub job_description: Option<String>,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterviewQuestion {
    pub question: String,
    #[serde(default)]
    pub focus: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InterviewQuestions {
    pub questions: Vec<InterviewQuestion>,
}

impl Validate for InterviewQuestions {
    fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("questions must not be empty".into());
        }
        if self.questions.len() > MAX_INTERVIEW_QUESTIONS as usize {
            return Err(format!(
                "at most {MAX_INTERVIEW_QUESTIONS} questions are allowed"
            ));
        }
        self.questions
            .iter()
            .try_for_each(|q| require_text("question", &q.question))
    }
}

impl Flow for GenerateInterviewQuestions {
    const NAME: &'static str = "generateInterviewQuestions";
    const TEMPERATURE: f32 = 0.7;
    type Input = InterviewQuestionsInput;
    type Output = InterviewQuestions;

    fn system() -> &'static str {
        "You prepare structured interviews. Respond with a single JSON object and nothing \
         else, shaped as {\"questions\": [{\"question\": string, \"focus\": string}]}."
    }

    fn prompt(input: &InterviewQuestionsInput) -> GenAiResult<Vec<Part>> {
        let count = input.count.clamp(1, MAX_INTERVIEW_QUESTIONS);
        let mut text = format!("Write {count} interview questions for the role: {}.", input.role);
        if let Some(description) = &input.job_description {
            text.push_str(&format!("\n\nJob description:\n{description}"));
        }
        Ok(vec![Part::text(text)])
    }
}

// ---------------------------------------------------------------------------
// Call quality

pub struct EvaluateCallQuality;

#[derive(Debug, Clone, Serialize)]
pub struct CallQualityInput {
    pub transcript: String,
    pub rubric: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallQualityReport {
    pub score: i64,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl Validate for CallQualityReport {
    fn validate(&self) -> Result<(), String> {
        require_percentage("score", self.score)?;
        require_text("summary", &self.summary)
    }
}

impl Flow for EvaluateCallQuality {
    const NAME: &'static str = "evaluateCallQuality";
    type Input = CallQualityInput;
    type Output = CallQualityReport;

    fn system() -> &'static str {
        "You are a call-centre quality analyst. Score the agent's handling of the call. \
         Respond with a single JSON object and nothing else, shaped as \
         {\"score\": integer 0-100, \"summary\": string, \"strengths\": [string], \
         \"improvements\": [string]}."
    }

    fn prompt(input: &CallQualityInput) -> GenAiResult<Vec<Part>> {
        let rubric = input.rubric.as_deref().unwrap_or(
            "greeting, empathy, accuracy of information, resolution, professional closing",
        );
        Ok(vec![Part::text(format!(
            "Rubric: {rubric}\n\nTranscript:\n{}",
            input.transcript
        ))])
    }
}
