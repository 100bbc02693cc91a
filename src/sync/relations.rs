//! The relation registry.
//!
//! Each many-to-many link is declared once per direction. Summary relations
//! come in pairs (Location↔Patient, MetricGroup↔Metric) so either side's
//! controller can trigger a sync; sessions only ever own their links and keep
//! usage counters on the referenced groups and metrics.

use super::types::{EntityKind, Relation, SyncMode};

/// A location's `patients` mirrored as `locations` summaries on each patient.
pub const LOCATION_PATIENTS: Relation = Relation {
    name: "location-patients",
    owner_kind: EntityKind::Location,
    foreign_kind: EntityKind::Patient,
    owner_refs_field: "patients",
    mode: SyncMode::Summary {
        summary_shape: &["name"],
        foreign_refs_field: "locations",
    },
};

/// A patient's `locations` mirrored as `patients` summaries on each location.
pub const PATIENT_LOCATIONS: Relation = Relation {
    name: "patient-locations",
    owner_kind: EntityKind::Patient,
    foreign_kind: EntityKind::Location,
    owner_refs_field: "locations",
    mode: SyncMode::Summary {
        summary_shape: &["firstName", "lastName"],
        foreign_refs_field: "patients",
    },
};

/// A metric group's `metrics` mirrored as `metricGroups` summaries on each metric.
pub const METRIC_GROUP_METRICS: Relation = Relation {
    name: "metricgroup-metrics",
    owner_kind: EntityKind::MetricGroup,
    foreign_kind: EntityKind::Metric,
    owner_refs_field: "metrics",
    mode: SyncMode::Summary {
        summary_shape: &["name"],
        foreign_refs_field: "metricGroups",
    },
};

/// A metric's `metricGroups` mirrored as `metrics` summaries on each group.
pub const METRIC_METRIC_GROUPS: Relation = Relation {
    name: "metric-metricgroups",
    owner_kind: EntityKind::Metric,
    foreign_kind: EntityKind::MetricGroup,
    owner_refs_field: "metricGroups",
    mode: SyncMode::Summary {
        summary_shape: &["name", "unit"],
        foreign_refs_field: "metrics",
    },
};

/// Sessions referencing a metric group bump its `sessionCount`.
pub const SESSION_METRIC_GROUPS: Relation = Relation {
    name: "session-metricgroups",
    owner_kind: EntityKind::Session,
    foreign_kind: EntityKind::MetricGroup,
    owner_refs_field: "metricGroups",
    mode: SyncMode::Counter {
        counter_field: "sessionCount",
    },
};

/// Sessions referencing a metric bump its `sessionCount`.
pub const SESSION_METRICS: Relation = Relation {
    name: "session-metrics",
    owner_kind: EntityKind::Session,
    foreign_kind: EntityKind::Metric,
    owner_refs_field: "metrics",
    mode: SyncMode::Counter {
        counter_field: "sessionCount",
    },
};

/// Every registered relation.
pub const ALL: &[Relation] = &[
    LOCATION_PATIENTS,
    PATIENT_LOCATIONS,
    METRIC_GROUP_METRICS,
    METRIC_METRIC_GROUPS,
    SESSION_METRIC_GROUPS,
    SESSION_METRICS,
];

/// Look up a relation by name.
pub fn find(name: &str) -> Option<&'static Relation> {
    ALL.iter().find(|r| r.name == name)
}

/// All relations a change to an `owner` document must drive.
pub fn owned_by(owner: EntityKind) -> impl Iterator<Item = &'static Relation> {
    ALL.iter().filter(move |r| r.owner_kind == owner)
}
