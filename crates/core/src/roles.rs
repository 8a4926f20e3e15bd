//! Well-known role name constants.
//!
//! Role names arrive from the identity collaborator as plain strings; these
//! are the ones the alarm pipeline addresses directly.

pub const ROLE_ADMINISTRATOR: &str = "administrator";
pub const ROLE_OPERATOR: &str = "operator";

/// Roles that receive escalated (high / critical) alarms and batch summaries.
pub const ESCALATION_ROLES: [&str; 2] = [ROLE_ADMINISTRATOR, ROLE_OPERATOR];
