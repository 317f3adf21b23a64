//! Allocation validation schema
//!
//! Every rule is a named invariant check over the whole [`AllocationSet`]
//! returning the violations it found. Checks are pure and synchronous; they
//! run on every edit for live form state and again as the submission gate.

use super::model::{AllocationSet, ServiceAllocation};
use stratus_common::{
    Service, ValidationErrors, Violation, ViolationKind, MEMORY_UNIT, VCPU_MEMORY_RATIO, VCPU_UNIT,
};
use tracing::debug;

/// The minimum total vCPU that has to be allocated.
pub const MIN_TOTAL_VCPU: u32 = VCPU_UNIT;

/// The minimum amount of memory that has to be allocated in total.
pub const MIN_TOTAL_MEMORY: u32 = (MIN_TOTAL_VCPU / VCPU_UNIT) * VCPU_MEMORY_RATIO * MEMORY_UNIT;

/// The maximum total vCPU that can be allocated.
pub const MAX_TOTAL_VCPU: u32 = 60 * VCPU_UNIT;

/// The maximum amount of memory that can be allocated in total.
pub const MAX_TOTAL_MEMORY: u32 = MAX_TOTAL_VCPU * VCPU_MEMORY_RATIO;

/// Replicas bounds per service.
pub const MIN_SERVICE_REPLICAS: u32 = 1;
pub const MAX_SERVICE_REPLICAS: u32 = 32;

/// The minimum vCPU per service.
pub const MIN_SERVICE_VCPU: u32 = VCPU_UNIT / 4;

/// The maximum vCPU per service.
pub const MAX_SERVICE_VCPU: u32 = 15 * VCPU_UNIT;

/// The minimum memory per service.
pub const MIN_SERVICE_MEMORY: u32 = 128;

/// The maximum memory per service.
pub const MAX_SERVICE_MEMORY: u32 =
    (MAX_SERVICE_VCPU / VCPU_UNIT) * VCPU_MEMORY_RATIO * MEMORY_UNIT;

/// Field path of the total vCPU
pub const TOTAL_VCPU_FIELD: &str = "total_available_vcpu";

/// Field path of the total memory
pub const TOTAL_MEMORY_FIELD: &str = "total_available_memory";

/// An invariant check over a whole allocation set
pub type InvariantCheck = fn(&AllocationSet) -> Vec<Violation>;

/// All invariants, by name, in reporting order
pub const INVARIANTS: &[(&str, InvariantCheck)] = &[
    ("service-bounds", check_service_bounds),
    ("total-bounds", check_total_bounds),
    ("is-matching-ratio", check_replica_ratio),
    ("is-equal-to-services", check_totals_match_services),
];

/// Run every invariant and collect what they report
pub fn violations(set: &AllocationSet) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for (name, check) in INVARIANTS {
        let found = check(set);
        if !found.is_empty() {
            debug!(invariant = *name, count = found.len(), "Invariant violated");
        }
        errors.extend(found);
    }
    errors
}

/// Validate an allocation set
pub fn validate(set: &AllocationSet) -> Result<(), ValidationErrors> {
    violations(set).into_result()
}

/// Each service's replicas, vCPU, and memory within their domains
pub fn check_service_bounds(set: &AllocationSet) -> Vec<Violation> {
    let mut found = Vec::new();
    for (service, allocation) in set.services() {
        check_service(service, allocation, &mut found);
    }
    found
}

fn check_service(service: Service, allocation: &ServiceAllocation, found: &mut Vec<Violation>) {
    bounded(
        found,
        service.field("replicas"),
        "Replicas",
        allocation.replicas,
        MIN_SERVICE_REPLICAS,
        MAX_SERVICE_REPLICAS,
    );
    bounded(
        found,
        service.field("vcpu"),
        "vCPUs",
        allocation.vcpu,
        MIN_SERVICE_VCPU,
        MAX_SERVICE_VCPU,
    );
    bounded(
        found,
        service.field("memory"),
        "Memory",
        allocation.memory,
        MIN_SERVICE_MEMORY,
        MAX_SERVICE_MEMORY,
    );
}

/// Both totals within their domains
pub fn check_total_bounds(set: &AllocationSet) -> Vec<Violation> {
    let mut found = Vec::new();
    bounded(
        &mut found,
        TOTAL_VCPU_FIELD.to_string(),
        "Total Available vCPUs",
        set.total_available_vcpu,
        MIN_TOTAL_VCPU,
        MAX_TOTAL_VCPU,
    );
    bounded(
        &mut found,
        TOTAL_MEMORY_FIELD.to_string(),
        "Available Memory",
        set.total_available_memory,
        MIN_TOTAL_MEMORY,
        MAX_TOTAL_MEMORY,
    );
    found
}

/// Replicated services keep the memory:vCPU ratio, reported at `replicas`
pub fn check_replica_ratio(set: &AllocationSet) -> Vec<Violation> {
    set.services()
        .filter(|(_, allocation)| allocation.is_replicated() && !allocation.matches_ratio())
        .map(|(service, _)| {
            Violation::new(
                service.field("replicas"),
                "is-matching-ratio",
                ViolationKind::Ratio,
                format!(
                    "vCPU and Memory for this service must match the 1:{} ratio if more than one replica is selected.",
                    VCPU_MEMORY_RATIO
                ),
            )
        })
        .collect()
}

/// Totals equal the exact sums of the services
pub fn check_totals_match_services(set: &AllocationSet) -> Vec<Violation> {
    let mut found = Vec::new();
    if u64::from(set.total_available_vcpu) != set.services_vcpu() {
        found.push(Violation::new(
            TOTAL_VCPU_FIELD,
            "is-equal-to-services",
            ViolationKind::Sum,
            "Total vCPUs must be equal to the sum of all services.",
        ));
    }
    if u64::from(set.total_available_memory) != set.services_memory() {
        found.push(Violation::new(
            TOTAL_MEMORY_FIELD,
            "is-equal-to-services",
            ViolationKind::Sum,
            "Total memory must be equal to the sum of all services.",
        ));
    }
    found
}

fn bounded(found: &mut Vec<Violation>, field: String, label: &str, value: u32, min: u32, max: u32) {
    if value < min {
        found.push(Violation::new(
            field,
            "min",
            ViolationKind::Bounds,
            format!("{} must be greater than or equal to {}", label, min),
        ));
    } else if value > max {
        found.push(Violation::new(
            field,
            "max",
            ViolationKind::Bounds,
            format!("{} must be less than or equal to {}", label, max),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_set() -> AllocationSet {
        AllocationSet {
            enabled: true,
            ..AllocationSet::default()
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(MIN_TOTAL_MEMORY, 2048);
        assert_eq!(MAX_TOTAL_MEMORY, 120_000);
        assert_eq!(MIN_SERVICE_VCPU, 250);
        assert_eq!(MAX_SERVICE_MEMORY, 30_720);
    }

    #[test]
    fn test_default_allocation_passes() {
        let set = valid_set();
        assert_eq!(set.services_vcpu(), 2000);
        assert!(validate(&set).is_ok());
    }

    #[test]
    fn test_ratio_mismatch_reported_at_replicas() {
        let mut set = valid_set();
        set.database = ServiceAllocation::new(2, 1000, 1024);
        set.sync_totals();

        let errors = validate(&set).unwrap_err();
        assert!(errors.has("database.replicas", ViolationKind::Ratio));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_ratio_ignored_for_single_replica() {
        let mut set = valid_set();
        set.auth = ServiceAllocation::new(1, 250, 1024);
        set.sync_totals();
        assert!(validate(&set).is_ok());
    }

    #[test]
    fn test_sum_mismatch_reported_at_total() {
        let mut set = valid_set();
        set.total_available_vcpu = 2500;

        let errors = validate(&set).unwrap_err();
        assert!(errors.has(TOTAL_VCPU_FIELD, ViolationKind::Sum));
        assert!(!errors.has(TOTAL_MEMORY_FIELD, ViolationKind::Sum));
    }

    #[test]
    fn test_memory_sum_mismatch_reported_at_total() {
        let mut set = valid_set();
        set.storage.memory = 512;

        let errors = validate(&set).unwrap_err();
        assert!(errors.has(TOTAL_MEMORY_FIELD, ViolationKind::Sum));
        assert!(!errors.has(TOTAL_VCPU_FIELD, ViolationKind::Sum));
        assert_eq!(errors.len(), 1);

        set.sync_totals();
        assert!(validate(&set).is_ok());
    }

    #[test]
    fn test_bounds() {
        let mut set = valid_set();
        set.storage.replicas = 33;
        set.auth.vcpu = 100;
        set.graphql_api.memory = 64;
        set.sync_totals();

        let errors = validate(&set).unwrap_err();
        assert!(errors.has("storage.replicas", ViolationKind::Bounds));
        assert!(errors.has("auth.vcpu", ViolationKind::Bounds));
        assert!(errors.has("graphql_api.memory", ViolationKind::Bounds));
        let message = &errors.for_field("auth.vcpu").next().unwrap().message;
        assert_eq!(message, "vCPUs must be greater than or equal to 250");
    }

    #[test]
    fn test_zero_replicas_out_of_bounds() {
        let mut set = valid_set();
        set.database.replicas = 0;
        let errors = validate(&set).unwrap_err();
        assert!(errors.has("database.replicas", ViolationKind::Bounds));
        assert!(!errors.has("database.replicas", ViolationKind::Ratio));
    }

    #[test]
    fn test_total_bounds() {
        let mut set = valid_set();
        set.database = ServiceAllocation::new(1, 15_000, 30_720);
        set.graphql_api = ServiceAllocation::new(1, 15_000, 30_720);
        set.auth = ServiceAllocation::new(1, 15_000, 30_720);
        set.storage = ServiceAllocation::new(1, 15_000, 30_720);
        set.sync_totals();

        let errors = validate(&set).unwrap_err();
        // 60 vCPU is allowed, 122880 MiB is above the memory cap
        assert!(!errors.has(TOTAL_VCPU_FIELD, ViolationKind::Bounds));
        assert!(errors.has(TOTAL_MEMORY_FIELD, ViolationKind::Bounds));
    }

    #[test]
    fn test_every_invariant_is_named() {
        let names: Vec<_> = INVARIANTS.iter().map(|(name, _)| *name).collect();
        assert!(names.contains(&"is-matching-ratio"));
        assert!(names.contains(&"is-equal-to-services"));
    }
}
