use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Position of an employee in the approval hierarchy.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Grade {
    /// Individual contributor.
    Ic,
    /// 課長
    Chief,
    /// 經理
    Manager,
    /// 總經理
    GeneralManager,
}

impl Grade {
    /// Derives a grade from a free-text job title.
    ///
    /// Only meant for importing legacy employee rows that predate the
    /// `grade` column; routing never looks at titles.
    pub fn from_job_title(title: &str) -> Self {
        if title.contains("總經理") {
            Grade::GeneralManager
        } else if title.contains("經理") {
            Grade::Manager
        } else if title.contains("課長") {
            Grade::Chief
        } else {
            Grade::Ic
        }
    }

    pub fn is_supervisor(self) -> bool {
        self != Grade::Ic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_titles_map_to_grades() {
        assert_eq!(Grade::from_job_title("總經理"), Grade::GeneralManager);
        assert_eq!(Grade::from_job_title("業務部經理"), Grade::Manager);
        assert_eq!(Grade::from_job_title("資訊課長"), Grade::Chief);
        assert_eq!(Grade::from_job_title("工程師"), Grade::Ic);
        assert_eq!(Grade::from_job_title(""), Grade::Ic);
    }

    #[test]
    fn grade_round_trips_through_database_string() {
        assert_eq!(Grade::GeneralManager.to_string(), "general_manager");
        assert_eq!("chief".parse::<Grade>().unwrap(), Grade::Chief);
    }
}
