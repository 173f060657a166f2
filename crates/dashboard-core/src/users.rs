//! Canonical user records built from loosely-named Airtable rows
//!
//! The users table has been edited by hand over time, so the same column
//! shows up as `Email`, `E-mail`, `email_address` and so on. Rows are mapped
//! once, here, onto [`UserRecord`]; nothing past this module sees raw field
//! names.

use airtable_client::AirtableRecord;
use serde::Serialize;
use serde_json::Value;

/// Accepted spellings of each canonical field, compared after lowercasing
/// and dropping everything but letters and digits
pub const FIELD_VARIANTS: &[(&str, &[&str])] = &[
    ("email", &["email", "e-mail", "email_address", "Email Address", "user_email", "login"]),
    ("name", &["name", "full_name", "Full Name", "nome", "display_name", "username"]),
    ("password", &["password", "senha", "pass", "pwd"]),
    (
        "workspace_id",
        &["workspace_id", "workspaceId", "Workspace ID", "gptmaker_workspace", "workspace"],
    ),
    (
        "gptmaker_token",
        &["gptmaker_token", "GPTMaker Token", "api_token", "apiToken", "token"],
    ),
    (
        "stripe_customer_id",
        &["stripe_customer_id", "stripeCustomerId", "Stripe Customer", "customer_id"],
    ),
    ("plan", &["plan", "plano", "subscription", "subscription_plan"]),
    ("role", &["role", "tipo", "user_type", "access_level"]),
];

/// A dashboard user in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub workspace_id: Option<String>,
    #[serde(skip_serializing)]
    pub gptmaker_token: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub plan: Option<String>,
    pub role: String,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Render a field value as text: strings as-is, numbers and booleans
/// printed, arrays (linked/lookup columns) by their first element
fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => return items.first().and_then(value_as_text),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Look up a canonical field in a record, trying every known spelling
pub fn canonical_field(record: &AirtableRecord, canonical: &str) -> Option<String> {
    let variants: Vec<String> = FIELD_VARIANTS
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, variants)| variants.iter().map(|v| normalize_key(v)).collect())
        .unwrap_or_else(|| vec![normalize_key(canonical)]);

    variants.iter().find_map(|variant| {
        record
            .fields
            .iter()
            .find(|(key, _)| normalize_key(key) == *variant)
            .and_then(|(_, value)| value_as_text(value))
    })
}

/// Map an Airtable row onto a [`UserRecord`]; rows without an email are
/// dropped
pub fn normalize_user(record: &AirtableRecord) -> Option<UserRecord> {
    let email = canonical_field(record, "email")?.to_lowercase();

    Some(UserRecord {
        id: record.id.clone(),
        email,
        name: canonical_field(record, "name"),
        password: canonical_field(record, "password"),
        workspace_id: canonical_field(record, "workspace_id"),
        gptmaker_token: canonical_field(record, "gptmaker_token"),
        stripe_customer_id: canonical_field(record, "stripe_customer_id"),
        plan: canonical_field(record, "plan"),
        role: canonical_field(record, "role")
            .map(|r| r.to_lowercase())
            .unwrap_or_else(|| "user".to_string()),
    })
}

/// Demo accounts used when no Airtable base is configured
pub fn mock_users() -> Vec<UserRecord> {
    vec![
        UserRecord {
            id: "mock-admin".to_string(),
            email: "admin@demo.com".to_string(),
            name: Some("Demo Admin".to_string()),
            password: Some("admin123".to_string()),
            workspace_id: Some("demo-workspace".to_string()),
            gptmaker_token: None,
            stripe_customer_id: Some("cus_demo_admin".to_string()),
            plan: Some("pro".to_string()),
            role: "admin".to_string(),
        },
        UserRecord {
            id: "mock-user".to_string(),
            email: "user@demo.com".to_string(),
            name: Some("Demo User".to_string()),
            password: Some("user123".to_string()),
            workspace_id: Some("demo-workspace".to_string()),
            gptmaker_token: None,
            stripe_customer_id: None,
            plan: Some("free".to_string()),
            role: "user".to_string(),
        },
    ]
}
