use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub news_id: Uuid,
    pub code: String,
    pub confidence: f64,
    pub is_primary: bool,
}

/// The full output of the Classifier (C8) for one News item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub topics: Vec<Topic>,
    pub sector_code: Option<String>,
    pub country_code: Option<String>,
    pub news_type: NewsType,
    pub news_subtype: NewsSubtype,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NewsType {
    OneCompany,
    Market,
    Regulatory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NewsSubtype {
    Earnings,
    Guidance,
    MnA,
    Default,
    Sanctions,
    Hack,
    Legal,
    Esg,
    SupplyChain,
    TechOutage,
    ManagementChange,
    Other,
}
