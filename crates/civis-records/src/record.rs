//! The case record aggregate and its satellite values.
//!
//! A [`Record`] is one citizen request or incident moving through a
//! processing graph. The struct carries everything the lifecycle
//! operations decide on: the current step, the responsible group, the
//! responder configuration, alarms, and the claim linkage. Persistence
//! snapshots the whole aggregate; the store commits it together with
//! its history rows in one batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use civis_core::actor::Department;
use civis_core::id::{DistrictId, GroupId, RecordId, ThemeId, WorkflowId};
use civis_flow::process::Process;
use civis_flow::state::RecordState;

use crate::code::RecordCode;

/// How a record entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputChannel {
    /// Filed through the citizen web portal.
    Web,
    /// Taken over the phone by an operator.
    Phone,
    /// Filed in person at a service desk.
    OfficeDesk,
    /// Arrived as an email to a service inbox.
    Email,
    /// Opened internally, including internal claims.
    Internal,
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Web => "web",
            Self::Phone => "phone",
            Self::OfficeDesk => "office_desk",
            Self::Email => "email",
            Self::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

/// How the applicant wants the answer delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseChannel {
    /// Answer by email.
    Email,
    /// Answer by postal letter.
    Letter,
    /// Answer by text message.
    Sms,
    /// The applicant declined an answer.
    None,
}

/// The applicant's answer preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    /// Chosen delivery channel.
    pub channel: ResponseChannel,

    /// Destination address for the chosen channel (email address,
    /// postal address or phone number).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Preferred answer language, as an IETF tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ResponseConfig {
    /// Returns true if the applicant expects an answer.
    #[must_use]
    pub fn wants_response(&self) -> bool {
        self.channel != ResponseChannel::None
    }
}

/// A typed attribute attached to a record by its theme's intake form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFeature {
    /// Feature code from the theme's form definition.
    pub code: String,

    /// Captured value, when the feature was filled in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Attention flags shown to operators next to the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmFlags {
    /// A citizen claim was opened against this record.
    pub citizen_claim: bool,

    /// An internal conversation has unread messages waiting.
    pub internal_conversation_pending: bool,

    /// The answer deadline has passed without an answer.
    pub response_overdue: bool,
}

impl AlarmFlags {
    /// Recomputes the conversation alarm from the record's conversations.
    pub fn recompute_conversations(&mut self, conversations: &[Conversation]) {
        self.internal_conversation_pending = conversations
            .iter()
            .any(|c| c.internal && c.open && c.unread_messages > 0);
    }
}

/// A message thread attached to a record.
///
/// Threads live in the messaging subsystem; the record keeps enough of
/// a mirror to drive alarms and to close internal threads when the
/// record changes hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Identifier assigned by the messaging subsystem.
    pub id: String,

    /// True for internal group-to-group threads, false for threads
    /// with the applicant.
    pub internal: bool,

    /// Whether the thread still accepts messages.
    pub open: bool,

    /// Messages the responsible group has not read yet.
    pub unread_messages: u32,
}

impl Conversation {
    /// Closes the thread. Unread counts are kept for the archive.
    pub fn close(&mut self) {
        self.open = false;
    }
}

/// Closure details stamped when a record reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingMeta {
    /// When the record was closed or cancelled.
    pub closed_at: DateTime<Utc>,

    /// The municipal department that resolved it, when stated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
}

/// Service-delivery details recorded at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// End of the promised service window, when the resolution commits
    /// to future work (a repair date, a delivery date).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_until: Option<DateTime<Utc>>,

    /// Whether claims may be opened while the service window runs.
    pub claimable_during_service: bool,
}

/// Snapshot of the theme a record was filed under.
///
/// Themes are catalog data maintained elsewhere; the lifecycle only
/// needs the fields that drive behavior, captured at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// Theme identifier, the key into the routing rule tables.
    pub id: ThemeId,

    /// Display name for logs and history.
    pub name: String,

    /// The processing graph records of this theme follow.
    pub process: Process,

    /// Whether records of this theme need an identified applicant
    /// before processing can start.
    pub requires_applicant: bool,
}

/// Input for creating a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    /// Theme the record is filed under.
    pub theme: Theme,

    /// Pre-assigned public code (the municipal numberer runs outside
    /// this crate).
    pub code: RecordCode,

    /// District the request concerns, when located.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<DistrictId>,

    /// Identifier of the applicant, when the filing names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,

    /// How the record entered the system.
    pub input_channel: InputChannel,

    /// The applicant's answer preferences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_config: Option<ResponseConfig>,

    /// Intake form attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<RecordFeature>,

    /// Free-text description of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Workflow bundle this record belongs to, for multi-part requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowId>,

    /// Record this one was split from, for multi-request intakes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multirecord_from: Option<RecordId>,

    /// Record this one was flagged as similar to at intake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_to: Option<RecordId>,
}

/// A case record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier.
    pub id: RecordId,

    /// Public code, including the claim ticket for claims.
    pub code: RecordCode,

    /// Theme the record was filed under.
    pub theme: ThemeId,

    /// Processing graph, fixed at creation from the theme.
    pub process: Process,

    /// Current step in the processing graph.
    pub state: RecordState,

    /// Group currently responsible, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_group: Option<GroupId>,

    /// User within the responsible group the record is displayed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_displayed: Option<String>,

    /// District the request concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<DistrictId>,

    /// Identifier of the applicant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,

    /// Workflow bundle, when the record is part of a multi-part request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowId>,

    /// Claims opened in this record's family, synchronized across the
    /// root and every claim.
    pub claims_number: u32,

    /// The record this claim contests, for claim records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_from: Option<RecordId>,

    /// Blocks manual reassignment when set.
    pub reassignment_not_allowed: bool,

    /// Record this one was split from at intake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multirecord_from: Option<RecordId>,

    /// Record this one was flagged as similar to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similar_to: Option<RecordId>,

    /// How the record entered the system.
    pub input_channel: InputChannel,

    /// The applicant's answer preferences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_config: Option<ResponseConfig>,

    /// Intake form attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<RecordFeature>,

    /// Free-text description of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Operator attention flags.
    pub alarms: AlarmFlags,

    /// Message threads attached to the record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversations: Vec<Conversation>,

    /// Closure details, present once the record is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing: Option<ClosingMeta>,

    /// Service-delivery details, present once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Returns true if the record sits in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns true if this record is a claim.
    #[must_use]
    pub const fn is_claim(&self) -> bool {
        self.claimed_from.is_some()
    }

    /// Returns true if the applicant expects an answer.
    #[must_use]
    pub fn wants_response(&self) -> bool {
        self.response_config
            .as_ref()
            .map_or(false, ResponseConfig::wants_response)
    }

    /// Closes every open internal conversation and recomputes the
    /// conversation alarm. Returns the ids of the threads closed.
    ///
    /// Runs whenever the record changes responsible group: the new
    /// group must not inherit half-read internal threads of the old one.
    pub fn close_internal_conversations(&mut self) -> Vec<String> {
        let mut closed = Vec::new();
        for conversation in &mut self.conversations {
            if conversation.internal && conversation.open {
                conversation.close();
                closed.push(conversation.id.clone());
            }
        }
        self.alarms.recompute_conversations(&self.conversations);
        closed
    }

    /// Applies the bookkeeping shared by every change of responsible
    /// group: the new group, a cleared display user, closed internal
    /// threads and a fresh conversation alarm.
    ///
    /// Returns the ids of the internal threads that were closed.
    pub fn hand_over_to(&mut self, group: GroupId) -> Vec<String> {
        self.responsible_group = Some(group);
        self.user_displayed = None;
        self.close_internal_conversations()
    }

    /// Updates the modification timestamp.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
