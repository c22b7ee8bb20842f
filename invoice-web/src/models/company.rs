use serde::{Deserialize, Serialize};

/// The issuer's business identity printed on every quotation.
///
/// Comes from configuration, not from the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub company_name: String,
    pub logo_url: Option<String>,
    pub address: String,
    pub contact: String,
    pub business_number: String,
}
