use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    #[sea_orm(string_value = "onboarding")]
    Onboarding,
    #[sea_orm(string_value = "release")]
    Release,
    #[sea_orm(string_value = "hotfix")]
    Hotfix,
}

/// Release lifecycle. Transitions only move forward:
/// `Draft -> Active -> Archived`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum StepCategory {
    #[sea_orm(string_value = "deploy")]
    Deploy,
    #[sea_orm(string_value = "verify")]
    Verify,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    #[sea_orm(string_value = "bash")]
    Bash,
    #[sea_orm(string_value = "sql")]
    Sql,
    #[sea_orm(string_value = "text")]
    Text,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "skipped")]
    Skipped,
    #[sea_orm(string_value = "reverted")]
    Reverted,
}

impl StepCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepCategory::Deploy => "deploy",
            StepCategory::Verify => "verify",
        }
    }
}

impl StepStatus {
    /// Done and skipped both count towards release progress.
    pub fn is_progressed(&self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        assert!(StepStatus::Done.is_progressed());
        assert!(StepStatus::Skipped.is_progressed());
        assert!(!StepStatus::Pending.is_progressed());
        assert!(!StepStatus::Reverted.is_progressed());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReleaseType::Onboarding).unwrap(),
            "\"onboarding\""
        );
        let status: StepStatus = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(status, StepStatus::Skipped);
    }

    #[test]
    fn deploy_sorts_before_verify() {
        assert!(StepCategory::Deploy < StepCategory::Verify);
    }
}
