//! Claim-chain scenarios: tickets, family synchronization, eligibility.

use chrono::{Duration, Utc};

use civis_core::actor::Actor;
use civis_core::audit::AuditAction;
use civis_flow::process::Process;
use civis_flow::state::RecordState;
use civis_records::claim::ClaimOptions;
use civis_records::error::{Error, Result};
use civis_records::record::{ClosingMeta, InputChannel};
use civis_records::service::TransitionCommand;
use civis_records::store::RecordStore;
use civis_test_utils::{
    RecordFactory, TestContext, ThemeFactory, assert_assigned_to, assert_audited,
    assert_family_synchronized, assert_notified,
};

/// The first claim on `2024/001234` takes ticket 02, the
/// second takes 03, and the whole family agrees on the claim count.
#[tokio::test]
async fn claim_tickets_advance_and_the_family_stays_synchronized() -> Result<()> {
    let ctx = TestContext::new();
    let theme = ThemeFactory::for_process(Process::ClosedDirectly);
    let actor = Actor::user("clerk.vidal");

    let mut root = RecordFactory::closed(&theme, ctx.groups.streets);
    root.code = "2024/001234".parse()?;
    let root_id = root.id;
    ctx.plant(root).await?;

    let first = ctx
        .service
        .create_claim(
            root_id,
            Some("the lamppost is dark again".to_string()),
            ClaimOptions::citizen(),
            &actor,
        )
        .await?;
    assert_eq!(first.code.to_string(), "2024/001234-02");
    assert_eq!(first.claims_number, 2);
    assert_eq!(first.state, RecordState::PendingValidate);
    assert_eq!(first.claimed_from, Some(root_id));

    let root = ctx.service.record(root_id).await?;
    assert_eq!(root.claims_number, 2, "the source follows the ticket");

    // The open claim must close before the matter can be contested again.
    ctx.service
        .apply_transition(TransitionCommand::new(
            first.id,
            RecordState::Closed,
            actor.clone(),
        ))
        .await?;

    let second = ctx
        .service
        .create_claim(root_id, None, ClaimOptions::citizen(), &actor)
        .await?;
    assert_eq!(second.code.to_string(), "2024/001234-03");
    assert_eq!(second.claims_number, 3);

    let family = ctx.store.family("2024/001234").await?;
    assert_eq!(family.len(), 3);
    assert_family_synchronized(&family);
    Ok(())
}

/// A claim in flight blocks another one on the same family.
#[tokio::test]
async fn open_claim_blocks_the_next_one() -> Result<()> {
    let ctx = TestContext::new();
    let theme = ThemeFactory::for_process(Process::ClosedDirectly);
    let actor = Actor::user("clerk.vidal");

    let root = RecordFactory::closed(&theme, ctx.groups.streets);
    let root_id = root.id;
    ctx.plant(root).await?;

    ctx.service
        .create_claim(root_id, None, ClaimOptions::citizen(), &actor)
        .await?;
    let err = ctx
        .service
        .create_claim(root_id, None, ClaimOptions::citizen(), &actor)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict { .. }));
    assert!(err.user_reason().unwrap().contains("already being processed"));
    assert_audited(&ctx.audit, AuditAction::ClaimDenied, 1);
    Ok(())
}

/// Claims outside the configured window are refused.
#[tokio::test]
async fn lapsed_claim_window_refuses_the_claim() -> Result<()> {
    let ctx = TestContext::new();
    let theme = ThemeFactory::for_process(Process::ClosedDirectly);

    let mut root = RecordFactory::closed(&theme, ctx.groups.streets);
    root.closing = Some(ClosingMeta {
        closed_at: Utc::now() - Duration::days(60),
        department: None,
    });
    let root_id = root.id;
    ctx.plant(root).await?;

    let err = ctx
        .service
        .create_claim(root_id, None, ClaimOptions::citizen(), &Actor::user("clerk.vidal"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(err.user_reason().unwrap().contains("claim window"));
    Ok(())
}

/// Citizen claims are routed like fresh records and raise the alarm on
/// both sides of the chain.
#[tokio::test]
async fn citizen_claim_routes_and_raises_alarms() -> Result<()> {
    let ctx = TestContext::new();
    let theme = ThemeFactory::resolution_response();
    ctx.direct_rule(theme.id, RecordState::PendingValidate, ctx.groups.claims_desk);
    let actor = Actor::user("clerk.vidal");

    let root = RecordFactory::closed(&theme, ctx.groups.streets);
    let root_id = root.id;
    ctx.plant(root).await?;

    let claim = ctx
        .service
        .create_claim(root_id, None, ClaimOptions::citizen(), &actor)
        .await?;

    assert_assigned_to(&claim, ctx.groups.claims_desk);
    assert!(claim.alarms.citizen_claim);
    assert!(ctx.service.record(root_id).await?.alarms.citizen_claim);

    let rows = ctx.service.reassignments(claim.id).await?;
    assert_eq!(rows.len(), 1, "the claim gets its own initial assignment row");
    assert_notified(&ctx.dispatcher.sent(), "claim_created");
    Ok(())
}

/// Internal claims stay with the group that closed the source and skip
/// routing entirely.
#[tokio::test]
async fn internal_claim_keeps_the_closing_group() -> Result<()> {
    let ctx = TestContext::new();
    let theme = ThemeFactory::resolution_response();
    // A rule that would reroute a citizen claim; internal claims ignore it.
    ctx.direct_rule(theme.id, RecordState::PendingValidate, ctx.groups.claims_desk);

    let root = RecordFactory::closed(&theme, ctx.groups.streets);
    let root_id = root.id;
    ctx.plant(root).await?;

    let claim = ctx
        .service
        .create_claim(
            root_id,
            None,
            ClaimOptions::internal().with_comment("reopening after the site visit"),
            &Actor::user("boss.ferrer"),
        )
        .await?;

    assert_assigned_to(&claim, ctx.groups.streets);
    assert_eq!(claim.input_channel, InputChannel::Internal);
    assert!(!claim.alarms.citizen_claim);
    assert!(!ctx.service.record(root_id).await?.alarms.citizen_claim);
    Ok(())
}

/// A claim starts fresh: the source's in-flight baggage never carries
/// over, while the applicant-facing configuration does.
#[tokio::test]
async fn claim_resets_in_flight_state() -> Result<()> {
    let ctx = TestContext::new();
    let theme = ThemeFactory::resolution_response();
    let actor = Actor::user("clerk.vidal");

    let mut root = RecordFactory::closed(&theme, ctx.groups.streets);
    root.workflow = Some(civis_core::id::WorkflowId::generate());
    root.user_displayed = Some("clerk.vidal".to_string());
    let root_id = root.id;
    let response_config = root.response_config.clone();
    ctx.plant(root).await?;

    let claim = ctx
        .service
        .create_claim(root_id, None, ClaimOptions::citizen(), &actor)
        .await?;

    assert_eq!(claim.workflow, None);
    assert_eq!(claim.user_displayed, None);
    assert_eq!(claim.closing, None);
    assert!(claim.conversations.is_empty());
    assert_eq!(claim.response_config, response_config);

    let history = ctx.service.history(claim.id).await?;
    assert_eq!(history.len(), 1, "a claim starts with its own creation row");
    assert_eq!(history[0].previous_state, None);
    assert_eq!(history[0].next_state, RecordState::PendingValidate);
    Ok(())
}
