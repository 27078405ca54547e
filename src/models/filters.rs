use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RemotePreference {
    Any,
    Yes,
    No,
}

impl Default for RemotePreference {
    fn default() -> Self {
        RemotePreference::Any
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeywordLogic {
    And,
    Or,
}

impl Default for KeywordLogic {
    fn default() -> Self {
        KeywordLogic::Or
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ExperienceLevel {
    Any,
    Internship,
    Entry,
    Associate,
    MidSenior,
    Director,
    Executive,
}

impl Default for ExperienceLevel {
    fn default() -> Self {
        ExperienceLevel::Any
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Volunteer,
    Other,
}

/// User-selected criteria a job is scored against.
///
/// Keyword and company lists keep insertion order so that `reasons` come out
/// in the order the user typed them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub remote_preference: RemotePreference,
    pub keywords: Vec<String>,
    pub keyword_logic: KeywordLogic,
    pub experience_level: ExperienceLevel,
    pub job_types: Vec<JobType>,
    pub posted_within_days: Option<u32>,
    pub salary_min: Option<f64>,
    pub excluded_companies: Vec<String>,
}

impl FilterCriteria {
    /// Lowercased, trimmed, de-duplicated keywords. Blank entries are dropped.
    pub fn normalized_keywords(&self) -> Vec<String> {
        normalize_set(&self.keywords)
    }

    pub fn normalized_excluded_companies(&self) -> Vec<String> {
        normalize_set(&self.excluded_companies)
    }

    pub fn is_company_excluded(&self, company: &str) -> bool {
        let company = company.to_lowercase();
        self.normalized_excluded_companies()
            .iter()
            .any(|excluded| company.contains(excluded.as_str()))
    }
}

fn normalize_set(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_lowercase();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
