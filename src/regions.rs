/// Region registry for the metro economic dashboard.
///
/// Defines the canonical list of metropolitan areas (CBSAs) a user can
/// select. This is the single source of truth for region codes; all other
/// modules should reference regions from here rather than hardcoding codes.
/// Extending the dashboard to a new metro means adding an entry here.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Region metadata
// ---------------------------------------------------------------------------

/// A selectable metropolitan statistical area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Official CBSA title, used verbatim in discovery search text.
    pub name: &'static str,
    /// 5-digit CBSA code. Join key between the selection and provider ids.
    pub code: &'static str,
}

/// All selectable regions, ordered roughly by population.
///
/// Names use the en dash the Census Bureau uses between principal cities.
pub static REGION_REGISTRY: &[Region] = &[
    Region { name: "New York–Newark–Jersey City, NY-NJ-PA", code: "35620" },
    Region { name: "Los Angeles–Long Beach–Anaheim, CA", code: "31080" },
    Region { name: "Chicago–Naperville–Elgin, IL-IN-WI", code: "16980" },
    Region { name: "Dallas–Fort Worth–Arlington, TX", code: "19100" },
    Region { name: "Houston–The Woodlands–Sugar Land, TX", code: "26420" },
    Region { name: "Atlanta–Sandy Springs–Roswell, GA", code: "12060" },
    Region { name: "Miami–Fort Lauderdale–West Palm Beach, FL", code: "33100" },
    Region { name: "Phoenix–Mesa–Chandler, AZ", code: "38060" },
    Region { name: "Seattle–Tacoma–Bellevue, WA", code: "42660" },
    Region { name: "Tampa–St. Petersburg–Clearwater, FL", code: "45300" },
    Region { name: "Denver–Aurora–Lakewood, CO", code: "19740" },
    Region { name: "Orlando–Kissimmee–Sanford, FL", code: "36740" },
    Region { name: "Charlotte–Concord–Gastonia, NC-SC", code: "16740" },
    Region { name: "Austin–Round Rock–Georgetown, TX", code: "12420" },
    Region { name: "Nashville-Davidson–Murfreesboro–Franklin, TN", code: "34980" },
];

/// Returns the codes of all registered regions, in registry order.
pub fn all_region_codes() -> Vec<&'static str> {
    REGION_REGISTRY.iter().map(|r| r.code).collect()
}

/// Looks up a region by CBSA code. Returns `None` if not found.
pub fn find_region(code: &str) -> Option<&'static Region> {
    REGION_REGISTRY.iter().find(|r| r.code == code)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
