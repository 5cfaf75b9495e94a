//! Pre-built test fixtures for common lifecycle scenarios.
//!
//! Provides factory functions to create test data with sensible defaults.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use civis_core::actor::Actor;
use civis_core::audit::{AuditEmitter, TestAuditSink};
use civis_core::group::GroupTree;
use civis_core::id::{DistrictId, GroupId, RecordId, ThemeId};
use civis_core::permission::{AllowAll, PermissionChecker};
use civis_flow::process::Process;
use civis_flow::registry::ProcessRegistry;
use civis_flow::state::RecordState;
use civis_records::code::RecordCode;
use civis_records::config::LifecycleConfig;
use civis_records::dispatch::{InMemoryDispatcher, NotificationDispatcher};
use civis_records::error::Result as LifecycleResult;
use civis_records::history::StateHistoryEntry;
use civis_records::record::{
    AlarmFlags, ClosingMeta, InputChannel, NewRecord, Record, ResponseChannel, ResponseConfig,
    Theme,
};
use civis_records::service::RecordService;
use civis_records::store::{InMemoryRecordStore, NewRecordBatch, RecordStore};
use civis_routing::engine::DerivationEngine;
use civis_routing::error::{Error as RoutingError, Result as RoutingResult};
use civis_routing::rule::RoutingRule;
use civis_routing::store::{InMemoryRuleStore, RuleStore};

/// Named groups of the fixture hierarchy.
///
/// City Hall is the root ambit. Public Works (streets, parks) and the
/// Citizen Office (claims desk) are ambits of their own, so moving a
/// record between them crosses an ambit boundary. The error group
/// catches degraded routing.
#[derive(Debug, Clone, Copy)]
pub struct MunicipalGroups {
    /// Root of the hierarchy, an ambit head.
    pub city_hall: GroupId,
    /// Intake queue directly under City Hall.
    pub intake: GroupId,
    /// Public Works ambit head.
    pub works: GroupId,
    /// Street maintenance crew, inside Public Works.
    pub streets: GroupId,
    /// Parks crew, inside Public Works.
    pub parks: GroupId,
    /// Citizen Office ambit head.
    pub office: GroupId,
    /// Claims desk, inside the Citizen Office.
    pub claims_desk: GroupId,
    /// Fallback group for degraded routing.
    pub errors: GroupId,
}

/// Builds the fixture group hierarchy.
#[must_use]
pub fn municipal_tree() -> (GroupTree, MunicipalGroups) {
    let groups = MunicipalGroups {
        city_hall: GroupId::generate(),
        intake: GroupId::generate(),
        works: GroupId::generate(),
        streets: GroupId::generate(),
        parks: GroupId::generate(),
        office: GroupId::generate(),
        claims_desk: GroupId::generate(),
        errors: GroupId::generate(),
    };

    let tree = GroupTree::builder()
        .add_ambit(groups.city_hall, "City Hall", None)
        .add(groups.intake, "Central Intake", Some(groups.city_hall))
        .add_ambit(groups.works, "Public Works", Some(groups.city_hall))
        .add(groups.streets, "Streets", Some(groups.works))
        .add(groups.parks, "Parks", Some(groups.works))
        .add_ambit(groups.office, "Citizen Office", Some(groups.city_hall))
        .add(groups.claims_desk, "Claims Desk", Some(groups.office))
        .add(groups.errors, "Routing Errors", Some(groups.city_hall))
        .build()
        .expect("fixture tree should be consistent");

    (tree, groups)
}

/// Rule store that fails every lookup, for degradation tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRuleStore;

#[async_trait]
impl RuleStore for FailingRuleStore {
    async fn direct_rule(
        &self,
        _theme: ThemeId,
        _state: RecordState,
    ) -> RoutingResult<Option<GroupId>> {
        Err(RoutingError::lookup("rule table unavailable"))
    }

    async fn district_rule(
        &self,
        _theme: ThemeId,
        _state: RecordState,
        _district: DistrictId,
    ) -> RoutingResult<Option<GroupId>> {
        Err(RoutingError::lookup("rule table unavailable"))
    }
}

/// Test context with a pre-wired lifecycle service.
///
/// Every collaborator is the in-memory implementation, and the handles
/// stay public so tests can seed rules, plant records and read back
/// what the service announced.
pub struct TestContext {
    /// The service under test.
    pub service: RecordService,
    /// Shared record store.
    pub store: Arc<InMemoryRecordStore>,
    /// Rule table backing the derivation engine.
    pub rules: Arc<InMemoryRuleStore>,
    /// Captured notifications.
    pub dispatcher: Arc<InMemoryDispatcher>,
    /// Captured audit events.
    pub audit: Arc<TestAuditSink>,
    /// The fixture group hierarchy.
    pub groups: MunicipalGroups,
}

impl TestContext {
    /// Creates a context where every capability is granted.
    #[must_use]
    pub fn new() -> Self {
        Self::with_permissions(Arc::new(AllowAll))
    }

    /// Creates a context with an explicit permission checker.
    #[must_use]
    pub fn with_permissions(permissions: Arc<dyn PermissionChecker>) -> Self {
        let rules = Arc::new(InMemoryRuleStore::new());
        Self::build(
            Arc::clone(&rules) as Arc<dyn RuleStore>,
            rules,
            permissions,
        )
    }

    /// Creates a context whose derivation engine cannot reach its rule
    /// tables; every routed operation degrades to the error group.
    #[must_use]
    pub fn degraded() -> Self {
        Self::build(
            Arc::new(FailingRuleStore),
            Arc::new(InMemoryRuleStore::new()),
            Arc::new(AllowAll),
        )
    }

    fn build(
        engine_rules: Arc<dyn RuleStore>,
        rules: Arc<InMemoryRuleStore>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        let (tree, groups) = municipal_tree();
        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = Arc::new(InMemoryDispatcher::new());
        let audit = Arc::new(TestAuditSink::new());

        let service = RecordService::new(
            Arc::new(ProcessRegistry::builtin().expect("builtin graphs should be consistent")),
            DerivationEngine::new(engine_rules, groups.errors),
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::new(tree),
            permissions,
            Arc::clone(&dispatcher) as Arc<dyn NotificationDispatcher>,
            AuditEmitter::with_test_sink(Arc::clone(&audit)),
            LifecycleConfig::default(),
        );

        Self {
            service,
            store,
            rules,
            dispatcher,
            audit,
            groups,
        }
    }

    /// Seeds a direct routing rule.
    pub fn direct_rule(&self, theme: ThemeId, state: RecordState, group: GroupId) {
        self.rules
            .insert(RoutingRule::direct(theme, state, group))
            .expect("rule store accepts inserts");
    }

    /// Seeds a district routing rule.
    pub fn district_rule(
        &self,
        theme: ThemeId,
        state: RecordState,
        district: DistrictId,
        group: GroupId,
    ) {
        self.rules
            .insert(RoutingRule::district(theme, state, district, group))
            .expect("rule store accepts inserts");
    }

    /// Inserts a record snapshot with its creation history row, for
    /// tests that start mid-flight.
    pub async fn plant(&self, record: Record) -> LifecycleResult<()> {
        let history = StateHistoryEntry::creation(
            record.id,
            record.state,
            Actor::system(),
            record.responsible_group,
            None,
            record.created_at,
        );
        self.store
            .create(NewRecordBatch {
                record,
                history,
                reassignment: None,
            })
            .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for theme snapshots.
pub struct ThemeFactory;

impl ThemeFactory {
    /// A street-maintenance theme on the resolve-then-answer graph.
    #[must_use]
    pub fn resolution_response() -> Theme {
        Self::for_process(Process::ResolutionResponse)
    }

    /// A theme on an arbitrary processing graph.
    #[must_use]
    pub fn for_process(process: Process) -> Theme {
        Theme {
            id: ThemeId::generate(),
            name: format!("theme-{}", uuid::Uuid::new_v4().as_simple()),
            process,
            requires_applicant: false,
        }
    }

    /// A theme that refuses to start processing without an applicant.
    #[must_use]
    pub fn requiring_applicant(process: Process) -> Theme {
        Theme {
            requires_applicant: true,
            ..Self::for_process(process)
        }
    }
}

/// Factory for record filings and mid-flight snapshots.
pub struct RecordFactory;

impl RecordFactory {
    /// A record code no other test run will collide with.
    #[must_use]
    pub fn unique_code(prefix: &str) -> RecordCode {
        RecordCode::new(format!("{prefix}{}", uuid::Uuid::new_v4().as_simple()))
            .expect("generated code should be valid")
    }

    /// A complete citizen filing for the given theme.
    #[must_use]
    pub fn filing(theme: &Theme) -> NewRecord {
        Self::filing_with_code(theme, Self::unique_code("REC"))
    }

    /// A complete citizen filing with an explicit code.
    #[must_use]
    pub fn filing_with_code(theme: &Theme, code: RecordCode) -> NewRecord {
        NewRecord {
            theme: theme.clone(),
            code,
            district: None,
            applicant: Some("ciu-1044".to_string()),
            input_channel: InputChannel::Web,
            response_config: Some(ResponseConfig {
                channel: ResponseChannel::Email,
                address: Some("vecino@example.org".to_string()),
                language: Some("es".to_string()),
            }),
            features: Vec::new(),
            description: Some("lamppost 30412 dark for a week".to_string()),
            workflow: None,
            multirecord_from: None,
            similar_to: None,
        }
    }

    /// A filing with no identified applicant.
    #[must_use]
    pub fn anonymous(theme: &Theme) -> NewRecord {
        NewRecord {
            applicant: None,
            ..Self::filing(theme)
        }
    }

    /// A record snapshot at an arbitrary lifecycle position.
    ///
    /// Terminal snapshots carry a closing stamp dated now, so claim
    /// eligibility sees a fresh closure.
    #[must_use]
    pub fn snapshot(theme: &Theme, state: RecordState, group: Option<GroupId>) -> Record {
        let now = Utc::now();
        Record {
            id: RecordId::generate(),
            code: Self::unique_code("REC"),
            theme: theme.id,
            process: theme.process,
            state,
            responsible_group: group,
            user_displayed: None,
            district: None,
            applicant: Some("ciu-1044".to_string()),
            workflow: None,
            claims_number: 0,
            claimed_from: None,
            reassignment_not_allowed: false,
            multirecord_from: None,
            similar_to: None,
            input_channel: InputChannel::Web,
            response_config: Some(ResponseConfig {
                channel: ResponseChannel::Email,
                address: Some("vecino@example.org".to_string()),
                language: None,
            }),
            features: Vec::new(),
            description: None,
            alarms: AlarmFlags::default(),
            conversations: Vec::new(),
            closing: if state.is_terminal() {
                Some(ClosingMeta {
                    closed_at: now,
                    department: None,
                })
            } else {
                None
            },
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A closed record held by the given group, ready to be claimed.
    #[must_use]
    pub fn closed(theme: &Theme, group: GroupId) -> Record {
        Self::snapshot(theme, RecordState::Closed, Some(group))
    }
}
