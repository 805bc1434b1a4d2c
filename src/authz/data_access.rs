//! Record-level visibility and mutation rules.
//!
//! A `(role, data type)` pair resolves to a [`DataAccessLevel`]. The collection
//! filter and the modification guard both apply that level through
//! [`scope_admits`], so whatever the filter shows at `own`/`department` the guard
//! also lets the same actor change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::identity::Identity;
use super::registry::Registry;

/// Maximum scope an actor has over a data type. Ordered `None < Own < Department < All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataAccessLevel {
    #[default]
    None,
    Own,
    Department,
    All,
}

impl DataAccessLevel {
    pub const ALL: [DataAccessLevel; 4] = [
        DataAccessLevel::None,
        DataAccessLevel::Own,
        DataAccessLevel::Department,
        DataAccessLevel::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataAccessLevel::None => "none",
            DataAccessLevel::Own => "own",
            DataAccessLevel::Department => "department",
            DataAccessLevel::All => "all",
        }
    }
}

/// `assigned_to` as stored on records: a single user id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assignees {
    One(String),
    Many(Vec<String>),
}

/// Borrowed view of a record's assignees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignedTo<'a> {
    #[default]
    Nobody,
    One(&'a str),
    Many(&'a [String]),
    /// A raw JSON array; non-string entries never match.
    Values(&'a [Value]),
}

impl AssignedTo<'_> {
    pub fn contains(&self, user_id: &str) -> bool {
        match self {
            AssignedTo::Nobody => false,
            AssignedTo::One(id) => *id == user_id,
            AssignedTo::Many(ids) => ids.iter().any(|id| id == user_id),
            AssignedTo::Values(ids) => ids.iter().any(|id| id.as_str() == Some(user_id)),
        }
    }
}

impl<'a> From<&'a Assignees> for AssignedTo<'a> {
    fn from(value: &'a Assignees) -> Self {
        match value {
            Assignees::One(id) => AssignedTo::One(id),
            Assignees::Many(ids) => AssignedTo::Many(ids),
        }
    }
}

impl<'a> From<Option<&'a Assignees>> for AssignedTo<'a> {
    fn from(value: Option<&'a Assignees>) -> Self {
        value.map(AssignedTo::from).unwrap_or_default()
    }
}

impl<'a> From<&'a [String]> for AssignedTo<'a> {
    fn from(value: &'a [String]) -> Self {
        AssignedTo::Many(value)
    }
}

impl<'a> From<&'a str> for AssignedTo<'a> {
    fn from(value: &'a str) -> Self {
        AssignedTo::One(value)
    }
}

impl<'a> From<&'a Value> for AssignedTo<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(id) => AssignedTo::One(id),
            Value::Array(ids) => AssignedTo::Values(ids),
            _ => AssignedTo::Nobody,
        }
    }
}

/// The ownership facts the engine reads from a domain entity. Every field is optional.
pub trait Record {
    fn created_by(&self) -> Option<&str> {
        None
    }

    fn assigned_to(&self) -> AssignedTo<'_> {
        AssignedTo::Nobody
    }

    fn department(&self) -> Option<&str> {
        None
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn created_by(&self) -> Option<&str> {
        (**self).created_by()
    }

    fn assigned_to(&self) -> AssignedTo<'_> {
        (**self).assigned_to()
    }

    fn department(&self) -> Option<&str> {
        (**self).department()
    }
}

/// Record of unknown shape, as received over the wire.
///
/// Kept as the raw JSON object so it serializes back exactly as it came in.
/// Ownership fields that are missing, `null` or not strings are treated as absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenericRecord(pub Map<String, Value>);

impl GenericRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for GenericRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl Record for GenericRecord {
    fn created_by(&self) -> Option<&str> {
        self.text("created_by")
    }

    fn assigned_to(&self) -> AssignedTo<'_> {
        self.0.get("assigned_to").map(AssignedTo::from).unwrap_or_default()
    }

    fn department(&self) -> Option<&str> {
        self.text("department")
    }
}

/// Ownership facts about a single item, as passed to the modification guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFacts<'a> {
    pub owner_id: Option<&'a str>,
    pub department: Option<&'a str>,
    pub assigned: AssignedTo<'a>,
}

impl<'a> ItemFacts<'a> {
    pub fn of<R: Record>(record: &'a R) -> Self {
        Self {
            owner_id: record.created_by(),
            department: record.department(),
            assigned: record.assigned_to(),
        }
    }
}

/// Level configured for the identity's role; `None` when unauthenticated or unlisted.
pub fn classify(registry: &Registry, identity: Option<&Identity>, data_type: &str) -> DataAccessLevel {
    match identity {
        Some(identity) => registry.data_access_level(identity.role, data_type),
        None => DataAccessLevel::None,
    }
}

/// Whether an item falls inside `level` for `identity`.
///
/// `own` needs the actor to be the creator or an assignee. `department` adds
/// items filed under the actor's department; an actor without a department
/// never matches on department.
pub fn scope_admits(level: DataAccessLevel, identity: &Identity, item: ItemFacts<'_>) -> bool {
    let owns = || item.owner_id == Some(identity.id.as_str()) || item.assigned.contains(&identity.id);

    match level {
        DataAccessLevel::None => false,
        DataAccessLevel::Own => owns(),
        DataAccessLevel::Department => {
            owns()
                || matches!(
                    (identity.department.as_deref(), item.department),
                    (Some(mine), Some(theirs)) if mine == theirs
                )
        }
        DataAccessLevel::All => true,
    }
}

/// Subset of `records` visible at `level`, in input order.
pub fn filter_by_level<'r, R: Record>(level: DataAccessLevel, identity: &Identity, records: &'r [R]) -> Vec<&'r R> {
    match level {
        DataAccessLevel::None => Vec::new(),
        DataAccessLevel::All => records.iter().collect(),
        DataAccessLevel::Own | DataAccessLevel::Department => records
            .iter()
            .filter(|record| scope_admits(level, identity, ItemFacts::of(*record)))
            .collect(),
    }
}

pub fn filter_records<'r, R: Record>(
    registry: &Registry,
    identity: Option<&Identity>,
    records: &'r [R],
    data_type: &str,
) -> Vec<&'r R> {
    match identity {
        Some(identity) => filter_by_level(classify(registry, Some(identity), data_type), identity, records),
        None => Vec::new(),
    }
}

pub fn can_modify(registry: &Registry, identity: Option<&Identity>, data_type: &str, item: ItemFacts<'_>) -> bool {
    match identity {
        Some(identity) => scope_admits(classify(registry, Some(identity), data_type), identity, item),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::identity::Role;
    use serde_json::json;

    fn record(id: i64, department: Option<&str>, created_by: Option<&str>, assigned_to: Option<Value>) -> GenericRecord {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::from(id));
        if let Some(department) = department {
            fields.insert("department".into(), Value::from(department));
        }
        if let Some(created_by) = created_by {
            fields.insert("created_by".into(), Value::from(created_by));
        }
        if let Some(assigned_to) = assigned_to {
            fields.insert("assigned_to".into(), assigned_to);
        }
        GenericRecord(fields)
    }

    fn ids(records: &[&GenericRecord]) -> Vec<i64> {
        records.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect()
    }

    fn sample_records() -> Vec<GenericRecord> {
        vec![
            record(1, Some("A"), Some("u9"), None),
            record(2, Some("B"), Some("u1"), None),
            record(3, Some("B"), Some("u9"), None),
            record(4, None, None, Some(json!("u1"))),
            record(5, Some("C"), Some("u7"), Some(json!(["u2", "u1"]))),
            record(6, None, None, None),
        ]
    }

    #[test]
    fn level_ordering_is_total() {
        assert!(DataAccessLevel::None < DataAccessLevel::Own);
        assert!(DataAccessLevel::Own < DataAccessLevel::Department);
        assert!(DataAccessLevel::Department < DataAccessLevel::All);
        assert_eq!(DataAccessLevel::default(), DataAccessLevel::None);
    }

    #[test]
    fn department_level_keeps_owned_records_from_other_departments() {
        let registry = Registry::builder()
            .data_access(Role::Fitness, "members", DataAccessLevel::Department)
            .build()
            .unwrap();
        let identity = Identity::new("u1", Role::Fitness).with_department("A");
        let records = sample_records();

        let visible = filter_records(&registry, Some(&identity), &records[..3], "members");
        assert_eq!(ids(&visible), vec![1, 2]);
    }

    #[test]
    fn own_level_matches_creator_or_assignee() {
        let identity = Identity::new("u1", Role::Tennis).with_department("A");
        let records = sample_records();

        let visible = filter_by_level(DataAccessLevel::Own, &identity, &records);
        assert_eq!(ids(&visible), vec![2, 4, 5]);
    }

    #[test]
    fn none_and_all_levels() {
        let identity = Identity::new("u1", Role::Golf);
        let records = sample_records();

        assert!(filter_by_level(DataAccessLevel::None, &identity, &records).is_empty());
        assert_eq!(ids(&filter_by_level(DataAccessLevel::All, &identity, &records)), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn identity_without_department_never_matches_by_department() {
        let identity = Identity::new("u3", Role::Fitness);
        let records = sample_records();

        assert!(filter_by_level(DataAccessLevel::Department, &identity, &records).is_empty());
        assert!(!scope_admits(DataAccessLevel::Department, &identity, ItemFacts::default()));
    }

    #[test]
    fn unauthenticated_gets_nothing() {
        let registry = Registry::builder()
            .data_access(Role::Admin, "members", DataAccessLevel::All)
            .build()
            .unwrap();
        let records = sample_records();

        assert_eq!(classify(&registry, None, "members"), DataAccessLevel::None);
        assert!(filter_records(&registry, None, &records, "members").is_empty());
        assert!(!can_modify(&registry, None, "members", ItemFacts::default()));
    }

    #[test]
    fn modification_guard_rules() {
        let registry = Registry::builder()
            .data_access(Role::Fitness, "tasks", DataAccessLevel::Own)
            .data_access(Role::Fitness, "schedules", DataAccessLevel::Department)
            .data_access(Role::Admin, "tasks", DataAccessLevel::All)
            .build()
            .unwrap();
        let fitness = Identity::new("u1", Role::Fitness).with_department("A");
        let admin = Identity::new("root", Role::Admin);
        let assignees = vec!["u2".to_string(), "u1".to_string()];

        let owned = ItemFacts { owner_id: Some("u1"), ..Default::default() };
        let assigned = ItemFacts { assigned: AssignedTo::from(assignees.as_slice()), ..Default::default() };
        let same_department = ItemFacts { owner_id: Some("u9"), department: Some("A"), ..Default::default() };
        let foreign = ItemFacts { owner_id: Some("u9"), department: Some("B"), ..Default::default() };

        assert!(can_modify(&registry, Some(&fitness), "tasks", owned));
        assert!(can_modify(&registry, Some(&fitness), "tasks", assigned));
        assert!(!can_modify(&registry, Some(&fitness), "tasks", same_department));

        assert!(can_modify(&registry, Some(&fitness), "schedules", same_department));
        assert!(can_modify(&registry, Some(&fitness), "schedules", owned));
        assert!(!can_modify(&registry, Some(&fitness), "schedules", foreign));

        assert!(!can_modify(&registry, Some(&fitness), "members", owned));
        assert!(can_modify(&registry, Some(&admin), "tasks", foreign));
    }

    #[test]
    fn filter_is_order_preserving_subsequence_and_scopes_nest() {
        let identities = [
            Identity::new("u1", Role::Fitness).with_department("A"),
            Identity::new("u1", Role::Fitness),
            Identity::new("u2", Role::Reception).with_department("B"),
            Identity::new("u7", Role::Golf).with_department("C"),
        ];
        let records = sample_records();

        for identity in &identities {
            let by_level: Vec<Vec<&GenericRecord>> = DataAccessLevel::ALL
                .iter()
                .map(|level| filter_by_level(*level, identity, &records))
                .collect();

            for visible in &by_level {
                // Subsequence: every survivor appears after the previous one in the input.
                let mut cursor = 0;
                for item in visible {
                    let pos = records[cursor..]
                        .iter()
                        .position(|r| std::ptr::eq(r, *item))
                        .expect("filtered record must come from input, in order");
                    cursor += pos + 1;
                }
            }

            for pair in by_level.windows(2) {
                for item in &pair[0] {
                    assert!(pair[1].iter().any(|r| std::ptr::eq(*r, *item)), "scopes must nest");
                }
            }
        }
    }

    #[test]
    fn visible_implies_modifiable_at_own_and_department() {
        let identities = [
            Identity::new("u1", Role::Fitness).with_department("A"),
            Identity::new("u1", Role::Fitness),
            Identity::new("u2", Role::Reception).with_department("B"),
        ];
        let records = sample_records();

        for level in [DataAccessLevel::Own, DataAccessLevel::Department] {
            let registry = Registry::builder()
                .data_access(Role::Fitness, "t", level)
                .data_access(Role::Reception, "t", level)
                .build()
                .unwrap();

            for identity in &identities {
                for record in &records {
                    let visible = !filter_records(&registry, Some(identity), std::slice::from_ref(record), "t").is_empty();
                    let modifiable = can_modify(&registry, Some(identity), "t", ItemFacts::of(record));
                    assert_eq!(visible, modifiable, "level {:?}, identity {}, record {:?}", level, identity.id, record.get("id"));
                }
            }
        }
    }

    #[test]
    fn generic_record_accepts_scalar_or_list_assignees_and_keeps_extra_fields() {
        let scalar: GenericRecord =
            serde_json::from_value(json!({"id": 1, "assigned_to": "u1", "title": "stretch"})).unwrap();
        assert!(scalar.assigned_to().contains("u1"));
        assert_eq!(scalar.get("title"), Some(&Value::from("stretch")));

        let list: GenericRecord = serde_json::from_value(json!({"assigned_to": ["u2", "u3"]})).unwrap();
        assert!(list.assigned_to().contains("u3"));
        assert!(!list.assigned_to().contains("u1"));

        let round = serde_json::to_value(&scalar).unwrap();
        assert_eq!(round, json!({"id": 1, "assigned_to": "u1", "title": "stretch"}));
    }

    #[test]
    fn generic_record_treats_null_and_non_string_fields_as_absent() {
        let raw = json!({
            "id": null,
            "created_by": 42,
            "department": null,
            "assigned_to": [7, "u1", null],
            "note": "x"
        });
        let record: GenericRecord = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(record.created_by(), None);
        assert_eq!(record.department(), None);
        assert!(record.assigned_to().contains("u1"));
        assert!(!record.assigned_to().contains("7"));

        let numeric_only: GenericRecord = serde_json::from_value(json!({"assigned_to": 7})).unwrap();
        assert_eq!(numeric_only.assigned_to(), AssignedTo::Nobody);

        // nothing is dropped or rewritten on the way back out
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn all_level_returns_records_unchanged() {
        let identity = Identity::new("u1", Role::Admin);
        let records: Vec<GenericRecord> = serde_json::from_value(json!([
            {"id": null, "department": null, "created_by": null, "note": "x"},
            {"created_by": 42, "assigned_to": null}
        ]))
        .unwrap();

        let visible: Vec<GenericRecord> = filter_by_level(DataAccessLevel::All, &identity, &records)
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(visible, records);
    }
}
