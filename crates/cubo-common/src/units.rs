//! Length units for cube edge sizes.
//!
//! Edge sizes are given either in pixels (`px`) or in a physical length unit
//! that is converted to metres through a [`UnitRegistry`].

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{CuboError, CuboResult};

/// Unit tag reserved for pixel counts.
pub const PIXELS: &str = "px";

/// Process-wide default unit table, built on first use and never mutated.
static DEFAULT_UNITS: Lazy<UnitRegistry> = Lazy::new(UnitRegistry::builtin);

/// Unit of an edge size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EdgeUnit {
    /// A pixel count at the requested resolution.
    Pixels,
    /// A named physical length unit, looked up in a [`UnitRegistry`].
    Length(String),
}

impl EdgeUnit {
    /// Map `"px"` to [`EdgeUnit::Pixels`] and anything else to a named unit.
    ///
    /// Whether the name is known is only checked when it is converted.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s == PIXELS {
            EdgeUnit::Pixels
        } else {
            EdgeUnit::Length(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EdgeUnit::Pixels => PIXELS,
            EdgeUnit::Length(name) => name,
        }
    }
}

impl Default for EdgeUnit {
    fn default() -> Self {
        EdgeUnit::Pixels
    }
}

impl fmt::Display for EdgeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EdgeUnit {
    fn from(s: String) -> Self {
        EdgeUnit::parse(&s)
    }
}

impl From<EdgeUnit> for String {
    fn from(unit: EdgeUnit) -> Self {
        unit.as_str().to_string()
    }
}

/// Conversion table from length unit names to metres.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    metres_per_unit: HashMap<String, f64>,
}

impl UnitRegistry {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            metres_per_unit: HashMap::new(),
        }
    }

    /// The shared default table.
    pub fn global() -> &'static UnitRegistry {
        &DEFAULT_UNITS
    }

    fn builtin() -> Self {
        let mut registry = Self::empty();

        // SI metre and its prefixes. Symbols are case sensitive (Mm vs mm).
        let metric: [(&[&str], f64); 10] = [
            (&["nm", "nanometer", "nanometre", "nanometers", "nanometres"], 1e-9),
            (&["um", "µm", "micrometer", "micrometre", "micrometers", "micrometres", "micron", "microns"], 1e-6),
            (&["mm", "millimeter", "millimetre", "millimeters", "millimetres"], 1e-3),
            (&["cm", "centimeter", "centimetre", "centimeters", "centimetres"], 1e-2),
            (&["dm", "decimeter", "decimetre", "decimeters", "decimetres"], 1e-1),
            (&["m", "meter", "metre", "meters", "metres"], 1.0),
            (&["dam", "decameter", "decametre", "decameters", "decametres"], 1e1),
            (&["hm", "hectometer", "hectometre", "hectometers", "hectometres"], 1e2),
            (&["km", "kilometer", "kilometre", "kilometers", "kilometres"], 1e3),
            (&["Mm", "megameter", "megametre", "megameters", "megametres"], 1e6),
        ];

        // International yard and pound agreement (1959) and international nautical mile.
        let imperial: [(&[&str], f64); 5] = [
            (&["in", "inch", "inches"], 0.0254),
            (&["ft", "foot", "feet"], 0.3048),
            (&["yd", "yard", "yards"], 0.9144),
            (&["mi", "mile", "miles"], 1609.344),
            (&["nmi", "nautical_mile", "nautical_miles"], 1852.0),
        ];

        for (names, factor) in metric.iter().chain(imperial.iter()) {
            for name in names.iter() {
                registry
                    .metres_per_unit
                    .insert((*name).to_string(), *factor);
            }
        }

        registry
    }

    /// Register a unit, replacing any previous definition of the same name.
    pub fn register(&mut self, name: &str, metres_per_unit: f64) -> CuboResult<()> {
        let name = name.trim();
        if name.is_empty() || name == PIXELS {
            return Err(CuboError::invalid(
                "unit",
                format!("'{}' cannot be registered as a length unit", name),
            ));
        }
        if !metres_per_unit.is_finite() || metres_per_unit <= 0.0 {
            return Err(CuboError::invalid(
                "unit",
                format!("conversion factor for '{}' must be positive, got {}", name, metres_per_unit),
            ));
        }
        self.metres_per_unit
            .insert(name.to_string(), metres_per_unit);
        Ok(())
    }

    /// Builder form of [`UnitRegistry::register`].
    pub fn with_unit(mut self, name: &str, metres_per_unit: f64) -> CuboResult<Self> {
        self.register(name, metres_per_unit)?;
        Ok(self)
    }

    /// Metres in one `name`.
    pub fn metres_per_unit(&self, name: &str) -> CuboResult<f64> {
        self.metres_per_unit
            .get(name.trim())
            .copied()
            .ok_or_else(|| CuboError::UnknownUnit(name.to_string()))
    }

    /// Convert `value` expressed in `name` to metres.
    pub fn to_metres(&self, value: f64, name: &str) -> CuboResult<f64> {
        Ok(value * self.metres_per_unit(name)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metres_per_unit.contains_key(name.trim())
    }

    pub fn len(&self) -> usize {
        self.metres_per_unit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metres_per_unit.is_empty()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        DEFAULT_UNITS.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_unit_parse() {
        assert_eq!(EdgeUnit::parse("px"), EdgeUnit::Pixels);
        assert_eq!(EdgeUnit::parse(" px "), EdgeUnit::Pixels);
        assert_eq!(EdgeUnit::parse("km"), EdgeUnit::Length("km".into()));
        assert_eq!(EdgeUnit::Length("m".into()).to_string(), "m");
    }

    #[test]
    fn test_builtin_units() {
        let units = UnitRegistry::global();
        assert_eq!(units.metres_per_unit("m").unwrap(), 1.0);
        assert_eq!(units.metres_per_unit("km").unwrap(), 1000.0);
        assert_eq!(units.metres_per_unit("kilometre").unwrap(), 1000.0);
        assert_eq!(units.metres_per_unit("Mm").unwrap(), 1e6);
        assert_eq!(units.metres_per_unit("mm").unwrap(), 1e-3);
        assert_eq!(units.metres_per_unit("ft").unwrap(), 0.3048);
        assert_eq!(units.to_metres(2.0, "mi").unwrap(), 3218.688);
    }

    #[test]
    fn test_unknown_unit() {
        let err = UnitRegistry::global()
            .metres_per_unit("furlong-typo")
            .unwrap_err();
        assert!(matches!(err, CuboError::UnknownUnit(ref name) if name == "furlong-typo"));
    }

    #[test]
    fn test_register_extends_copy_only() {
        let mut units = UnitRegistry::default();
        units.register("furlong", 201.168).unwrap();
        assert_eq!(units.metres_per_unit("furlong").unwrap(), 201.168);
        assert!(!UnitRegistry::global().contains("furlong"));
    }

    #[test]
    fn test_register_rejects_bad_definitions() {
        let mut units = UnitRegistry::empty();
        assert!(units.register("px", 1.0).is_err());
        assert!(units.register("", 1.0).is_err());
        assert!(units.register("chain", 0.0).is_err());
        assert!(units.register("chain", f64::NAN).is_err());
        assert!(units.is_empty());
    }
}
