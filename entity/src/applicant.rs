use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "applicant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub tenant_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    #[sea_orm(column_type = "Text")]
    pub resume_text: String,
    pub status: Stage,
    pub ai_score: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ai_summary: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Stage {
    #[sea_orm(string_value = "APPLIED")]
    Applied,
    #[sea_orm(string_value = "SCREENING")]
    Screening,
    #[sea_orm(string_value = "INTERVIEW")]
    Interview,
    #[sea_orm(string_value = "OFFERED")]
    Offered,
    #[sea_orm(string_value = "HIRED")]
    Hired,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Hired | Stage::Rejected)
    }

    fn rank(self) -> u8 {
        match self {
            Stage::Applied => 0,
            Stage::Screening => 1,
            Stage::Interview => 2,
            Stage::Offered => 3,
            Stage::Hired => 4,
            Stage::Rejected => 5,
        }
    }

    /// Forward one step at a time, or straight to `Rejected` from any open stage.
    pub fn can_move_to(self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Stage::Rejected || next.rank() == self.rank() + 1
    }
}

impl ActiveModelBehavior for ActiveModel {}
