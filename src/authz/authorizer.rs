use std::sync::Arc;

use serde_json::json;

use super::data_access::{self, Assignees, DataAccessLevel, ItemFacts, Record};
use super::elevated::{self, ElevatedLevel};
use super::evaluator::{self, EffectivePermissions, EvaluationResult};
use super::identity::Identity;
use super::pages;
use super::permission::PermissionToken;
use super::registry::Registry;
use crate::events::{DecisionEvent, DecisionSink, NoopSink, Query};

/// Entry point for callers: a shared registry plus the sink every decision is reported to.
///
/// Cheap to clone and safe to share across threads. Decisions are computed by
/// the pure functions in the sibling modules; this type only adds reporting.
#[derive(Clone)]
pub struct Authorizer {
    registry: Arc<Registry>,
    sink: Arc<dyn DecisionSink>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer").field("registry", &self.registry).finish_non_exhaustive()
    }
}

impl Authorizer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            sink: Arc::new(NoopSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn emit(&self, event: DecisionEvent) {
        self.sink.record(event);
    }

    pub fn has_permission(&self, identity: Option<&Identity>, permission: impl PermissionToken) -> bool {
        let allowed = evaluator::has_permission(&self.registry, identity, &permission);
        self.emit(
            DecisionEvent::new(Query::HasPermission, identity, permission.token(), allowed)
                .with_detail(self.grant_counts(identity)),
        );
        allowed
    }

    /// Short-circuits on the first held permission; each probe is reported.
    pub fn has_any_permission<P: PermissionToken>(&self, identity: Option<&Identity>, permissions: &[P]) -> bool {
        permissions.iter().any(|p| self.has_permission(identity, p))
    }

    pub fn has_all_permissions<P: PermissionToken>(&self, identity: Option<&Identity>, permissions: &[P]) -> bool {
        identity.is_some() && permissions.iter().all(|p| self.has_permission(identity, p))
    }

    pub fn check_permission_with_reason(
        &self,
        identity: Option<&Identity>,
        permission: impl PermissionToken,
    ) -> EvaluationResult {
        let result = evaluator::evaluate(&self.registry, identity, &permission);
        self.emit(
            DecisionEvent::new(Query::CheckPermission, identity, permission.token(), result.allowed).with_detail(json!({
                "reason": result.reason.to_string(),
            })),
        );
        result
    }

    pub fn has_page_access(&self, identity: Option<&Identity>, route: &str) -> bool {
        let guard = pages::resolve_route(&self.registry, route);
        let requirement = pages::guard_requirement(guard);

        let allowed = evaluator::satisfies_with(identity, requirement, |p| self.has_permission(identity, p));

        self.emit(
            DecisionEvent::new(Query::PageAccess, identity, route, allowed).with_detail(json!({
                "guard": guard.map(|g| g.path.as_str()),
                "required": requirement.permissions().len(),
            })),
        );
        allowed
    }

    pub fn get_data_access_level(&self, identity: Option<&Identity>, data_type: &str) -> DataAccessLevel {
        let level = data_access::classify(&self.registry, identity, data_type);
        self.emit(
            DecisionEvent::new(Query::DataAccessLevel, identity, data_type, level != DataAccessLevel::None)
                .with_detail(json!({ "level": level.as_str() })),
        );
        level
    }

    pub fn can_modify_data(
        &self,
        identity: Option<&Identity>,
        data_type: &str,
        owner_id: Option<&str>,
        item_department: Option<&str>,
        assigned_users: Option<&Assignees>,
    ) -> bool {
        let item = ItemFacts {
            owner_id,
            department: item_department,
            assigned: assigned_users.into(),
        };
        self.can_modify_item(identity, data_type, item)
    }

    /// Guard fed from the record's own ownership fields.
    pub fn can_modify_record<R: Record>(&self, identity: Option<&Identity>, data_type: &str, record: &R) -> bool {
        self.can_modify_item(identity, data_type, ItemFacts::of(record))
    }

    fn can_modify_item(&self, identity: Option<&Identity>, data_type: &str, item: ItemFacts<'_>) -> bool {
        let level = data_access::classify(&self.registry, identity, data_type);
        let allowed = identity.map_or(false, |identity| data_access::scope_admits(level, identity, item));
        self.emit(
            DecisionEvent::new(Query::CanModify, identity, data_type, allowed)
                .with_detail(json!({ "level": level.as_str() })),
        );
        allowed
    }

    pub fn filter_data_by_permission<'r, R: Record>(
        &self,
        identity: Option<&Identity>,
        records: &'r [R],
        data_type: &str,
    ) -> Vec<&'r R> {
        let level = data_access::classify(&self.registry, identity, data_type);
        let visible = match identity {
            Some(identity) => data_access::filter_by_level(level, identity, records),
            None => Vec::new(),
        };
        self.emit(
            DecisionEvent::new(Query::Filter, identity, data_type, !visible.is_empty()).with_detail(json!({
                "level": level.as_str(),
                "input": records.len(),
                "visible": visible.len(),
            })),
        );
        visible
    }

    /// Owning variant of [`Self::filter_data_by_permission`].
    pub fn filter_owned<R: Record + Clone>(&self, identity: Option<&Identity>, records: &[R], data_type: &str) -> Vec<R> {
        self.filter_data_by_permission(identity, records, data_type)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn has_elevated_access(&self, identity: Option<&Identity>, required: ElevatedLevel) -> bool {
        let allowed = elevated::has_elevated_access(self.registry.elevated_positions(), identity, required);
        self.emit(
            DecisionEvent::new(Query::ElevatedAccess, identity, required.as_str(), allowed).with_detail(json!({
                "position": identity.and_then(|i| i.position).map(|p| p.label()),
            })),
        );
        allowed
    }

    pub fn is_admin(&self, identity: Option<&Identity>) -> bool {
        self.has_elevated_access(identity, ElevatedLevel::Admin)
    }

    pub fn is_manager(&self, identity: Option<&Identity>) -> bool {
        self.has_elevated_access(identity, ElevatedLevel::Manager)
    }

    pub fn is_team_lead(&self, identity: Option<&Identity>) -> bool {
        self.has_elevated_access(identity, ElevatedLevel::TeamLead)
    }

    pub fn effective_permissions(&self, identity: Option<&Identity>) -> Option<EffectivePermissions> {
        let effective = evaluator::effective_permissions(&self.registry, identity);
        self.emit(
            DecisionEvent::new(Query::EffectivePermissions, identity, "*", effective.is_some())
                .with_detail(self.grant_counts(identity)),
        );
        effective
    }

    fn grant_counts(&self, identity: Option<&Identity>) -> serde_json::Value {
        match identity {
            Some(identity) => json!({
                "role_permissions": self.registry.role_permissions(identity.role).map_or(0, |p| p.len()),
                "granted_permissions": identity.granted_permissions.len(),
            }),
            None => serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::data_access::GenericRecord;
    use crate::authz::permission::Requirement;
    use crate::authz::identity::{Position, Role};
    use crate::authz::permissions;
    use crate::authz::registry::RouteGuard;
    use crate::events::MemorySink;

    fn authorizer() -> (Authorizer, Arc<MemorySink>) {
        let registry = Registry::builder()
            .grant(Role::Reception, [permissions::SCHEDULES_VIEW_DEPARTMENT])
            .grant(Role::Admin, [permissions::USERS_VIEW, permissions::USERS_UPDATE])
            .data_access(Role::Fitness, "members", DataAccessLevel::Department)
            .route(RouteGuard::prefix(
                "/admin",
                Requirement::AnyOf(vec![permissions::USERS_VIEW.into()]),
            ))
            .route(RouteGuard::exact(
                "/admin/permissions",
                Requirement::AllOf(vec![permissions::USERS_VIEW.into(), permissions::PERMISSIONS_MANAGE.into()]),
            ))
            .build()
            .unwrap();
        let sink = Arc::new(MemorySink::new());
        let authorizer = Authorizer::new(Arc::new(registry)).with_sink(sink.clone());
        (authorizer, sink)
    }

    #[test]
    fn emits_one_event_per_permission_check() {
        let (authz, sink) = authorizer();
        let identity = Identity::new("u1", Role::Reception).with_name("Lee");

        assert!(authz.has_permission(Some(&identity), permissions::SCHEDULES_VIEW_DEPARTMENT));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].query, Query::HasPermission);
        assert_eq!(events[0].subject, "schedules.view_department");
        assert_eq!(events[0].actor.as_ref().unwrap().name, "Lee");
        assert_eq!(events[0].detail["role_permissions"], 1);
        assert_eq!(events[0].detail["granted_permissions"], 0);
    }

    #[test]
    fn any_permission_short_circuits() {
        let (authz, sink) = authorizer();
        let identity = Identity::new("root", Role::Admin);

        assert!(authz.has_any_permission(
            Some(&identity),
            &[permissions::USERS_VIEW, permissions::USERS_UPDATE, permissions::USERS_DELETE]
        ));
        assert_eq!(sink.events().len(), 1);
        assert!(!authz.has_any_permission::<crate::authz::Permission>(Some(&identity), &[]));
    }

    #[test]
    fn page_access() {
        let (authz, _) = authorizer();
        let admin = Identity::new("root", Role::Admin);
        let reception = Identity::new("u1", Role::Reception);
        let delegated = Identity::new("root2", Role::Admin).with_granted([permissions::PERMISSIONS_MANAGE]);

        assert!(authz.has_page_access(Some(&admin), "/admin/staff"));
        assert!(!authz.has_page_access(Some(&reception), "/admin/staff"));
        assert!(!authz.has_page_access(None, "/admin/staff"));
        assert!(authz.has_page_access(Some(&reception), "/manuals"));
        assert!(!authz.has_page_access(None, "/manuals"));

        assert!(!authz.has_page_access(Some(&admin), "/admin/permissions"));
        assert!(authz.has_page_access(Some(&delegated), "/admin/permissions"));
    }

    #[test]
    fn page_access_reports_the_governing_guard() {
        let (authz, sink) = authorizer();
        let admin = Identity::new("root", Role::Admin);

        assert!(authz.has_page_access(Some(&admin), "/admin/staff/"));
        assert!(authz.has_page_access(Some(&admin), "/manuals"));
        assert!(!authz.has_page_access(Some(&admin), "/admin/permissions?tab=2"));

        let events: Vec<_> = sink.events().into_iter().filter(|e| e.query == Query::PageAccess).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].detail["guard"], "/admin");
        assert_eq!(events[0].detail["required"], 1);
        assert!(events[1].detail["guard"].is_null());
        assert_eq!(events[1].detail["required"], 0);
        assert_eq!(events[2].detail["guard"], "/admin/permissions");
        assert_eq!(events[2].detail["required"], 2);
    }

    #[test]
    fn all_permissions_needs_every_one() {
        let (authz, _) = authorizer();
        let admin = Identity::new("root", Role::Admin);
        let delegated = Identity::new("root2", Role::Admin).with_granted([permissions::PERMISSIONS_MANAGE]);

        assert!(authz.has_all_permissions(Some(&admin), &[permissions::USERS_VIEW, permissions::USERS_UPDATE]));
        assert!(!authz.has_all_permissions(Some(&admin), &[permissions::USERS_VIEW, permissions::PERMISSIONS_MANAGE]));
        assert!(authz.has_all_permissions(
            Some(&delegated),
            &[permissions::USERS_VIEW, permissions::PERMISSIONS_MANAGE]
        ));

        // vacuous for a signed-in identity, never for an anonymous one
        assert!(authz.has_all_permissions::<crate::authz::Permission>(Some(&admin), &[]));
        assert!(!authz.has_all_permissions::<crate::authz::Permission>(None, &[]));
        assert!(!authz.has_all_permissions(None, &[permissions::USERS_VIEW]));
    }

    #[test]
    fn sink_does_not_influence_decisions() {
        let (with_memory, _) = authorizer();
        let silent = Authorizer::new(Arc::new(with_memory.registry().clone()));
        let identity = Identity::new("u1", Role::Fitness).with_department("A");

        for perm in [permissions::USERS_VIEW, permissions::SCHEDULES_VIEW_DEPARTMENT] {
            assert_eq!(
                with_memory.has_permission(Some(&identity), perm),
                silent.has_permission(Some(&identity), perm)
            );
        }
        assert_eq!(
            with_memory.get_data_access_level(Some(&identity), "members"),
            silent.get_data_access_level(Some(&identity), "members")
        );
    }

    #[test]
    fn guard_and_filter_share_rules() {
        let (authz, sink) = authorizer();
        let identity = Identity::new("u1", Role::Fitness).with_department("A");
        let records: Vec<GenericRecord> = serde_json::from_value(json!([
            { "department": "A", "created_by": "u9" },
            { "department": "B", "created_by": "u1" },
            { "department": "B", "created_by": "u9" },
            { "assigned_to": "u1" }
        ]))
        .unwrap();

        let visible = authz.filter_data_by_permission(Some(&identity), &records, "members");
        assert_eq!(visible.len(), 3);

        for record in &records {
            let shown = visible.iter().any(|r| std::ptr::eq(*r, record));
            assert_eq!(shown, authz.can_modify_record(Some(&identity), "members", record));
        }

        let filter_event = sink.events().into_iter().find(|e| e.query == Query::Filter).unwrap();
        assert_eq!(filter_event.detail["input"], 4);
        assert_eq!(filter_event.detail["visible"], 3);
    }

    #[test]
    fn can_modify_data_with_explicit_facts() {
        let (authz, _) = authorizer();
        let identity = Identity::new("u1", Role::Fitness).with_department("A");
        let assignees = Assignees::Many(vec!["u4".into(), "u1".into()]);

        assert!(authz.can_modify_data(Some(&identity), "members", None, Some("A"), None));
        assert!(authz.can_modify_data(Some(&identity), "members", Some("u1"), Some("Z"), None));
        assert!(authz.can_modify_data(Some(&identity), "members", None, None, Some(&assignees)));
        assert!(!authz.can_modify_data(Some(&identity), "members", Some("u2"), Some("B"), None));
        assert!(!authz.can_modify_data(Some(&identity), "tasks", Some("u1"), Some("A"), None));
        assert!(!authz.can_modify_data(None, "members", Some("u1"), Some("A"), None));
    }

    #[test]
    fn elevated_shortcuts() {
        let (authz, _) = authorizer();
        let lead = Identity::new("u1", Role::Fitness).with_position(Position::TeamLead);
        let admin = Identity::new("root", Role::Admin);

        assert!(authz.is_team_lead(Some(&lead)));
        assert!(!authz.is_manager(Some(&lead)));
        assert!(!authz.is_admin(Some(&lead)));
        assert!(authz.is_admin(Some(&admin)));
        assert!(!authz.is_team_lead(Some(&admin)));
        assert!(!authz.is_admin(None));
    }

    #[test]
    fn unauthenticated_is_most_restrictive_everywhere() {
        let (authz, sink) = authorizer();
        let records = vec![GenericRecord::default()];

        assert!(!authz.has_permission(None, permissions::USERS_VIEW));
        assert!(!authz.check_permission_with_reason(None, permissions::USERS_VIEW).allowed);
        assert!(!authz.has_page_access(None, "/"));
        assert_eq!(authz.get_data_access_level(None, "members"), DataAccessLevel::None);
        assert!(authz.filter_data_by_permission(None, &records, "members").is_empty());
        assert!(!authz.can_modify_record(None, "members", &records[0]));
        assert!(!authz.has_elevated_access(None, ElevatedLevel::TeamLead));
        assert!(authz.effective_permissions(None).is_none());

        assert!(sink.events().iter().all(|e| !e.allowed && e.actor.is_none()));
    }
}
