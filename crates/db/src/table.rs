//! Registry of the application's tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Symbolic table names mapped to their physical names.
///
/// Every helper takes `impl AsRef<str>` for the table, so tables outside
/// this registry can still be addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Assignment,
    BackgroundJob,
    Campaign,
    CampaignContact,
    CannedResponse,
    CannedResponseLabel,
    InteractionStep,
    JobRequest,
    Label,
    Message,
    Notification,
    OptOut,
    Organization,
    QuestionResponse,
    Tag,
    TwilioPhoneNumber,
    User,
    UserOrganization,
    /// Unused, kept until the table is dropped.
    ZipCode,
}

impl Table {
    pub const ALL: [Table; 19] = [
        Self::Assignment,
        Self::BackgroundJob,
        Self::Campaign,
        Self::CampaignContact,
        Self::CannedResponse,
        Self::CannedResponseLabel,
        Self::InteractionStep,
        Self::JobRequest,
        Self::Label,
        Self::Message,
        Self::Notification,
        Self::OptOut,
        Self::Organization,
        Self::QuestionResponse,
        Self::Tag,
        Self::TwilioPhoneNumber,
        Self::User,
        Self::UserOrganization,
        Self::ZipCode,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assignment          => "assignment",
            Self::BackgroundJob       => "background_job",
            Self::Campaign            => "campaign",
            Self::CampaignContact     => "campaign_contact",
            Self::CannedResponse      => "canned_response",
            Self::CannedResponseLabel => "canned_response_label",
            Self::InteractionStep     => "interaction_step",
            Self::JobRequest          => "job_request",
            Self::Label               => "label",
            Self::Message             => "message",
            Self::Notification        => "notification",
            Self::OptOut              => "opt_out",
            Self::Organization        => "organization",
            Self::QuestionResponse    => "question_response",
            Self::Tag                 => "tag",
            Self::TwilioPhoneNumber   => "twilio_phone_number",
            Self::User                => "user",
            Self::UserOrganization    => "user_organization",
            Self::ZipCode             => "zip_code",
        }
    }
}

impl AsRef<str> for Table {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}
