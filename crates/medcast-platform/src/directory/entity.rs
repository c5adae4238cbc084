//! Directory Entities
//!
//! The reference data campaigns are built from: approved message templates,
//! recipient lists, and the medical reps the lists point at. These are
//! managed elsewhere; the dispatch platform only reads them.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use medcast_common::MessageTemplate;

/// An approved provider-side message template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// TSID
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Provider-side template code (e.g. "mr_product_launch")
    pub code: String,

    pub locale: String,

    /// Placeholder names in body order
    #[serde(default)]
    pub placeholders: Vec<String>,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl From<&Template> for MessageTemplate {
    fn from(template: &Template) -> Self {
        Self {
            id: template.id.clone(),
            code: template.code.clone(),
            locale: template.locale.clone(),
            placeholders: template.placeholders.clone(),
            active: template.active,
        }
    }
}

/// An ordered, named list of medical rep references
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientList {
    /// TSID
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Member MR ids, in send order
    #[serde(default)]
    pub member_ids: Vec<String>,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A medical representative contact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRep {
    /// TSID
    #[serde(rename = "_id")]
    pub id: String,

    pub phone: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    /// Template placeholder overrides for this rep
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, String>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
