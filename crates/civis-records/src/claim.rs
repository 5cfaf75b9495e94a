//! Claim eligibility and construction.
//!
//! A claim contests a closed record: the citizen (or an operator, for
//! internal follow-ups) reopens the matter as a fresh record that
//! shares the base code and takes the next ticket. This module holds
//! the eligibility gate and the factory that derives the claim record
//! from its source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use civis_core::id::RecordId;
use civis_flow::state::RecordState;

use crate::code::RecordCode;
use crate::config::LifecycleConfig;
use crate::error::{Error, Result};
use crate::record::{AlarmFlags, InputChannel, Record};

/// Who is contesting the closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// The citizen disputes the closure. The claim is routed like a
    /// fresh record.
    Citizen,

    /// An operator reopens the matter internally. The claim stays with
    /// the group that closed the source.
    Internal,
}

/// Options for opening a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOptions {
    /// Who is contesting the closure.
    pub kind: ClaimKind,

    /// Free-text note attached to the claim's creation row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ClaimOptions {
    /// Options for a citizen claim.
    #[must_use]
    pub const fn citizen() -> Self {
        Self {
            kind: ClaimKind::Citizen,
            comment: None,
        }
    }

    /// Options for an internal claim.
    #[must_use]
    pub const fn internal() -> Self {
        Self {
            kind: ClaimKind::Internal,
            comment: None,
        }
    }

    /// Attaches a free-text note.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Checks whether a claim may be opened against `source`.
///
/// `family` must hold the source's whole record family (root plus
/// claims); the check refuses a new claim while an earlier one is
/// still being processed.
///
/// # Errors
///
/// Returns a conflict when the source is still open or a sibling claim
/// is in flight, and a validation error when the claim window or the
/// service window refuses the request.
pub fn check_eligibility(
    source: &Record,
    family: &[Record],
    config: &LifecycleConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    if !source.is_terminal() {
        return Err(Error::conflict(
            "record is still open; claims contest a closure",
        ));
    }

    if family.iter().any(|r| r.is_claim() && !r.is_terminal()) {
        return Err(Error::conflict(
            "a claim on this record is already being processed",
        ));
    }

    if let (Some(window), Some(closing)) = (config.claim_window(), source.closing.as_ref()) {
        if now > closing.closed_at + window {
            return Err(Error::validation(format!(
                "the claim window of {} days has passed",
                config.claim_window_days
            )));
        }
    }

    if let Some(resolution) = &source.resolution {
        if let Some(until) = resolution.service_until {
            if now <= until && !resolution.claimable_during_service {
                return Err(Error::validation(
                    "the promised service window is still running",
                ));
            }
        }
    }

    Ok(())
}

/// Builds the claim record from its source.
///
/// Every field is set explicitly: copied from the source, reset, or
/// forced — nothing is inherited by accident. The claim always starts
/// in the validation step regardless of the source's processing graph
/// position at closure.
#[must_use]
pub fn build_claim(
    source: &Record,
    ticket: u32,
    description: Option<String>,
    options: &ClaimOptions,
    now: DateTime<Utc>,
) -> Record {
    let (input_channel, responsible_group, alarms) = match options.kind {
        ClaimKind::Citizen => (
            source.input_channel,
            // Routing assigns the group; until then the claim sits in
            // the intake queue.
            None,
            AlarmFlags {
                citizen_claim: true,
                ..AlarmFlags::default()
            },
        ),
        ClaimKind::Internal => (
            InputChannel::Internal,
            source.responsible_group,
            AlarmFlags::default(),
        ),
    };

    Record {
        // Fresh identity.
        id: RecordId::generate(),
        code: source.code.with_ticket(ticket),
        created_at: now,
        updated_at: now,

        // Forced lifecycle position.
        state: RecordState::PendingValidate,
        claims_number: ticket,
        claimed_from: Some(source.id),

        // Copied from the source.
        theme: source.theme,
        process: source.process,
        district: source.district,
        applicant: source.applicant.clone(),
        reassignment_not_allowed: source.reassignment_not_allowed,
        response_config: source.response_config.clone(),
        features: source.features.clone(),

        // Kind-dependent.
        input_channel,
        responsible_group,
        alarms,

        // Reset: the claim is a fresh matter.
        workflow: None,
        multirecord_from: None,
        similar_to: None,
        user_displayed: None,
        conversations: Vec::new(),
        closing: None,
        resolution: None,

        description,
    }
}

/// Returns the ticket for the next claim of a family, given the
/// family's current claim count.
#[must_use]
pub const fn next_ticket(claims_number: u32) -> u32 {
    RecordCode::next_ticket(claims_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClosingMeta, Resolution, ResponseChannel, ResponseConfig, Theme};
    use chrono::Duration;
    use civis_core::id::{GroupId, ThemeId};
    use civis_flow::process::Process;

    fn closed_record() -> Record {
        let now = Utc::now();
        let theme = Theme {
            id: ThemeId::generate(),
            name: "potholes".to_string(),
            process: Process::ResolutionResponse,
            requires_applicant: false,
        };
        Record {
            id: RecordId::generate(),
            code: "INC2024000001".parse().unwrap(),
            theme: theme.id,
            process: theme.process,
            state: RecordState::Closed,
            responsible_group: Some(GroupId::generate()),
            user_displayed: Some("clerk.munoz".to_string()),
            district: None,
            applicant: Some("citizen-771".to_string()),
            workflow: None,
            claims_number: 0,
            claimed_from: None,
            reassignment_not_allowed: false,
            multirecord_from: None,
            similar_to: None,
            input_channel: InputChannel::Web,
            response_config: Some(ResponseConfig {
                channel: ResponseChannel::Email,
                address: Some("someone@example.org".to_string()),
                language: None,
            }),
            features: Vec::new(),
            description: Some("pothole on elm street".to_string()),
            alarms: AlarmFlags::default(),
            conversations: Vec::new(),
            closing: Some(ClosingMeta {
                closed_at: now - Duration::days(3),
                department: None,
            }),
            resolution: None,
            created_at: now - Duration::days(10),
            updated_at: now - Duration::days(3),
        }
    }

    #[test]
    fn open_record_cannot_be_claimed() {
        let mut source = closed_record();
        source.state = RecordState::InResolution;
        let err = check_eligibility(&source, &[], &LifecycleConfig::default(), Utc::now())
            .unwrap_err();
        assert!(err.user_reason().unwrap().contains("still open"));
    }

    #[test]
    fn open_sibling_claim_blocks_another() {
        let source = closed_record();
        let mut sibling = build_claim(&source, 2, None, &ClaimOptions::citizen(), Utc::now());
        assert!(!sibling.is_terminal());

        let family = vec![source.clone(), sibling.clone()];
        let err =
            check_eligibility(&source, &family, &LifecycleConfig::default(), Utc::now())
                .unwrap_err();
        assert!(err.user_reason().unwrap().contains("already being processed"));

        // Once the sibling closes, a new claim is allowed again.
        sibling.state = RecordState::Closed;
        let family = vec![source.clone(), sibling];
        assert!(check_eligibility(&source, &family, &LifecycleConfig::default(), Utc::now())
            .is_ok());
    }

    #[test]
    fn claim_window_is_enforced() {
        let mut source = closed_record();
        source.closing = Some(ClosingMeta {
            closed_at: Utc::now() - Duration::days(60),
            department: None,
        });

        let config = LifecycleConfig::default(); // 30-day window
        let err = check_eligibility(&source, &[], &config, Utc::now()).unwrap_err();
        assert!(err.user_reason().unwrap().contains("claim window"));

        let unlimited = LifecycleConfig {
            claim_window_days: 0,
            ..LifecycleConfig::default()
        };
        assert!(check_eligibility(&source, &[], &unlimited, Utc::now()).is_ok());
    }

    #[test]
    fn service_window_blocks_unless_marked_claimable() {
        let mut source = closed_record();
        source.resolution = Some(Resolution {
            service_until: Some(Utc::now() + Duration::days(5)),
            claimable_during_service: false,
        });
        let err = check_eligibility(&source, &[], &LifecycleConfig::default(), Utc::now())
            .unwrap_err();
        assert!(err.user_reason().unwrap().contains("service window"));

        source.resolution = Some(Resolution {
            service_until: Some(Utc::now() + Duration::days(5)),
            claimable_during_service: true,
        });
        assert!(check_eligibility(&source, &[], &LifecycleConfig::default(), Utc::now()).is_ok());

        // A lapsed service window no longer blocks.
        source.resolution = Some(Resolution {
            service_until: Some(Utc::now() - Duration::days(1)),
            claimable_during_service: false,
        });
        assert!(check_eligibility(&source, &[], &LifecycleConfig::default(), Utc::now()).is_ok());
    }

    #[test]
    fn first_claim_takes_ticket_two() {
        let source = closed_record();
        let claim = build_claim(
            &source,
            next_ticket(source.claims_number),
            Some("the pothole is back".to_string()),
            &ClaimOptions::citizen(),
            Utc::now(),
        );
        assert_eq!(claim.code.to_string(), "INC2024000001-02");
        assert_eq!(claim.claims_number, 2);
        assert_eq!(claim.state, RecordState::PendingValidate);
        assert_eq!(claim.claimed_from, Some(source.id));
    }

    #[test]
    fn citizen_claim_awaits_routing_and_raises_the_alarm() {
        let source = closed_record();
        let claim = build_claim(&source, 2, None, &ClaimOptions::citizen(), Utc::now());
        assert_eq!(claim.responsible_group, None);
        assert!(claim.alarms.citizen_claim);
        assert_eq!(claim.input_channel, source.input_channel);
    }

    #[test]
    fn internal_claim_keeps_the_group_and_switches_channel() {
        let source = closed_record();
        let claim = build_claim(&source, 2, None, &ClaimOptions::internal(), Utc::now());
        assert_eq!(claim.responsible_group, source.responsible_group);
        assert!(!claim.alarms.citizen_claim);
        assert_eq!(claim.input_channel, InputChannel::Internal);
    }

    #[test]
    fn factory_resets_what_belongs_to_the_old_matter() {
        let mut source = closed_record();
        source.workflow = Some(civis_core::id::WorkflowId::generate());
        source.similar_to = Some(RecordId::generate());
        source.resolution = Some(Resolution {
            service_until: None,
            claimable_during_service: false,
        });

        let claim = build_claim(&source, 2, None, &ClaimOptions::citizen(), Utc::now());
        assert_eq!(claim.workflow, None);
        assert_eq!(claim.similar_to, None);
        assert_eq!(claim.user_displayed, None);
        assert_eq!(claim.closing, None);
        assert_eq!(claim.resolution, None);
        assert!(claim.conversations.is_empty());

        // While the applicant-facing configuration is carried over.
        assert_eq!(claim.response_config, source.response_config);
        assert_eq!(claim.applicant, source.applicant);
        assert_eq!(claim.district, source.district);
    }
}
