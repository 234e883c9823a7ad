//! Delete-propagation policy across the entity dependency graph.
//!
//! Every parent→child foreign key carries exactly one on-delete policy.
//! The tables below are static data; resolving them against live rows
//! (counting blockers, walking the cascade tree) is the database crate's
//! job, which keeps the policy itself unit-testable.

/// The entity kinds managed by the inventory core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Region,
    Zone,
    Site,
    Room,
    Rack,
    TenantGroup,
    Tenant,
    HardwareType,
    HardwareInfo,
    Hardware,
    InterfaceConnection,
    User,
}

impl EntityKind {
    /// Storage table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Zone => "zone",
            Self::Site => "site",
            Self::Room => "room",
            Self::Rack => "rack",
            Self::TenantGroup => "tenant_group",
            Self::Tenant => "tenant",
            Self::HardwareType => "hardware_type",
            Self::HardwareInfo => "hardware_info",
            Self::Hardware => "hardware",
            Self::InterfaceConnection => "interface_connection",
            Self::User => "user",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Zone => "zone",
            Self::Site => "site",
            Self::Room => "room",
            Self::Rack => "rack",
            Self::TenantGroup => "tenant group",
            Self::Tenant => "tenant",
            Self::HardwareType => "hardware type",
            Self::HardwareInfo => "hardware model",
            Self::Hardware => "hardware",
            Self::InterfaceConnection => "interface",
            Self::User => "user",
        }
    }
}

/// What happens to dependent rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Children are deleted together with the parent, transitively.
    Cascade,
    /// Deletion is refused while any live child references the parent.
    Restrict,
    /// The child's reference is cleared; the child itself survives.
    Nullify,
}

/// One parent→child foreign-key relationship and its on-delete policy.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub parent: EntityKind,
    pub child: EntityKind,
    /// Foreign-key field on the child table.
    pub foreign_key: &'static str,
    pub on_delete: DeletePolicy,
}

/// The full relationship graph. Hardware appears twice as a parent of
/// interface connections: once as the owning device (cascade) and once
/// as the uplink target (nullify).
pub const RELATIONS: &[Relation] = &[
    Relation {
        parent: EntityKind::Region,
        child: EntityKind::Zone,
        foreign_key: "region_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::Zone,
        child: EntityKind::Site,
        foreign_key: "zone_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::Site,
        child: EntityKind::Room,
        foreign_key: "site_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::Room,
        child: EntityKind::Rack,
        foreign_key: "room_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::Rack,
        child: EntityKind::Hardware,
        foreign_key: "rack_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::TenantGroup,
        child: EntityKind::Tenant,
        foreign_key: "tenant_group_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::Tenant,
        child: EntityKind::Hardware,
        foreign_key: "tenant_id",
        on_delete: DeletePolicy::Nullify,
    },
    Relation {
        parent: EntityKind::HardwareType,
        child: EntityKind::HardwareInfo,
        foreign_key: "hardware_type_id",
        on_delete: DeletePolicy::Restrict,
    },
    Relation {
        parent: EntityKind::HardwareInfo,
        child: EntityKind::Hardware,
        foreign_key: "hardware_info_id",
        on_delete: DeletePolicy::Restrict,
    },
    Relation {
        parent: EntityKind::Hardware,
        child: EntityKind::InterfaceConnection,
        foreign_key: "hardware_id",
        on_delete: DeletePolicy::Cascade,
    },
    Relation {
        parent: EntityKind::Hardware,
        child: EntityKind::InterfaceConnection,
        foreign_key: "connected_switch_id",
        on_delete: DeletePolicy::Nullify,
    },
];

/// All relationships in which `kind` is the parent.
pub fn children_of(kind: EntityKind) -> impl Iterator<Item = &'static Relation> {
    RELATIONS.iter().filter(move |r| r.parent == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kinds reachable from `root` by following cascade edges only.
    fn cascade_closure(root: EntityKind) -> Vec<EntityKind> {
        let mut reached = vec![root];
        let mut i = 0;
        while i < reached.len() {
            for rel in children_of(reached[i]) {
                if rel.on_delete == DeletePolicy::Cascade && !reached.contains(&rel.child) {
                    reached.push(rel.child);
                }
            }
            i += 1;
        }
        reached
    }

    #[test]
    fn region_cascade_reaches_interfaces() {
        let closure = cascade_closure(EntityKind::Region);
        for kind in [
            EntityKind::Zone,
            EntityKind::Site,
            EntityKind::Room,
            EntityKind::Rack,
            EntityKind::Hardware,
            EntityKind::InterfaceConnection,
        ] {
            assert!(closure.contains(&kind), "{kind:?} missing from cascade");
        }
    }

    /// A top-level restrict check is sufficient only if no restrict
    /// parent can be reached through a cascade edge. Guards the cascade
    /// executor's assumption.
    #[test]
    fn restrict_parents_never_sit_under_a_cascade() {
        let restrict_parents: Vec<EntityKind> = RELATIONS
            .iter()
            .filter(|r| r.on_delete == DeletePolicy::Restrict)
            .map(|r| r.parent)
            .collect();

        for rel in RELATIONS.iter().filter(|r| r.on_delete == DeletePolicy::Cascade) {
            for reached in cascade_closure(rel.child) {
                assert!(
                    !restrict_parents.contains(&reached),
                    "{reached:?} is a restrict parent reachable via cascade from {:?}",
                    rel.parent
                );
            }
        }
    }

    #[test]
    fn cascade_graph_is_acyclic() {
        for rel in RELATIONS {
            if rel.on_delete == DeletePolicy::Cascade {
                assert!(
                    !cascade_closure(rel.child).contains(&rel.parent),
                    "cycle through {:?} -> {:?}",
                    rel.parent,
                    rel.child
                );
            }
        }
    }

    #[test]
    fn tables_and_labels_are_distinct() {
        let kinds = [
            EntityKind::Region,
            EntityKind::Zone,
            EntityKind::Site,
            EntityKind::Room,
            EntityKind::Rack,
            EntityKind::TenantGroup,
            EntityKind::Tenant,
            EntityKind::HardwareType,
            EntityKind::HardwareInfo,
            EntityKind::Hardware,
            EntityKind::InterfaceConnection,
            EntityKind::User,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.table(), b.table());
                assert_ne!(a.label(), b.label());
            }
        }
    }
}
