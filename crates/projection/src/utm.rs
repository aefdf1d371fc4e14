//! UTM zone selection and EPSG codes.
//!
//! Zones are the 60 regular 6° bands; the Norway and Svalbard exceptions are
//! not applied, so a point always lands in the zone whose central meridian is
//! nearest its longitude.

use std::fmt;

use once_cell::sync::Lazy;

/// Number of UTM zones.
pub const ZONE_COUNT: u8 = 60;

/// First EPSG code of the WGS 84 / UTM north series (zone 1N = 32601).
const EPSG_NORTH_BASE: u32 = 32600;
/// First EPSG code of the WGS 84 / UTM south series (zone 1S = 32701).
const EPSG_SOUTH_BASE: u32 = 32700;

/// (zone, hemisphere) -> EPSG lookup, built once.
///
/// Index `[hemisphere][zone - 1]`, north first.
static EPSG_TABLE: Lazy<[[u32; ZONE_COUNT as usize]; 2]> = Lazy::new(|| {
    let mut table = [[0u32; ZONE_COUNT as usize]; 2];
    for zone in 1..=ZONE_COUNT {
        table[0][zone as usize - 1] = EPSG_NORTH_BASE + zone as u32;
        table[1][zone as usize - 1] = EPSG_SOUTH_BASE + zone as u32;
    }
    table
});

/// Hemisphere of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Hemisphere for a latitude; the equator belongs to the north.
    pub fn for_latitude(lat: f64) -> Self {
        if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }

    fn index(self) -> usize {
        match self {
            Hemisphere::North => 0,
            Hemisphere::South => 1,
        }
    }
}

/// A UTM zone (1..=60) in one hemisphere.
///
/// Only built through the constructors, so the zone number is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

impl UtmZone {
    /// Create a zone, returning `None` for numbers outside 1..=60.
    pub fn new(number: u8, hemisphere: Hemisphere) -> Option<Self> {
        (1..=ZONE_COUNT)
            .contains(&number)
            .then_some(Self { number, hemisphere })
    }

    /// The zone whose central meridian is nearest `lon`.
    ///
    /// Longitude 180 falls in zone 60 rather than wrapping to zone 1.
    pub fn for_point(lat: f64, lon: f64) -> Self {
        let band = ((lon + 180.0) / 6.0).floor() + 1.0;
        let number = if band.is_nan() {
            1
        } else {
            band.clamp(1.0, ZONE_COUNT as f64) as u8
        };
        Self {
            number,
            hemisphere: Hemisphere::for_latitude(lat),
        }
    }

    /// Look up the zone of a WGS 84 / UTM EPSG code.
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        let hemisphere = match epsg {
            c if c > EPSG_NORTH_BASE && c <= EPSG_NORTH_BASE + ZONE_COUNT as u32 => {
                Hemisphere::North
            }
            c if c > EPSG_SOUTH_BASE && c <= EPSG_SOUTH_BASE + ZONE_COUNT as u32 => {
                Hemisphere::South
            }
            _ => return None,
        };
        EPSG_TABLE[hemisphere.index()]
            .iter()
            .position(|&code| code == epsg)
            .map(|i| Self {
                number: i as u8 + 1,
                hemisphere,
            })
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// EPSG code of this zone (WGS 84 datum).
    pub fn epsg(&self) -> u32 {
        EPSG_TABLE[self.hemisphere.index()][self.number as usize - 1]
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        (self.number as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        };
        write!(f, "{}{}", self.number, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_for_known_points() {
        // Central Germany
        let zone = UtmZone::for_point(50.0, 10.0);
        assert_eq!(zone.number(), 32);
        assert_eq!(zone.epsg(), 32632);

        // Sydney
        let zone = UtmZone::for_point(-33.87, 151.21);
        assert_eq!(zone.number(), 56);
        assert_eq!(zone.epsg(), 32756);

        // New York
        assert_eq!(UtmZone::for_point(40.71, -74.0).epsg(), 32618);
    }

    #[test]
    fn test_zone_edges() {
        assert_eq!(UtmZone::for_point(0.0, -180.0).number(), 1);
        assert_eq!(UtmZone::for_point(0.0, 180.0).number(), 60);
        assert_eq!(UtmZone::for_point(0.0, 0.0).number(), 31);
        assert_eq!(UtmZone::for_point(0.0, -0.000001).number(), 30);
    }

    #[test]
    fn test_epsg_for_any_longitude() {
        for lon in [-540.0, -180.0, 179.999, 180.0, 720.0, f64::NAN, f64::INFINITY] {
            let zone = UtmZone::for_point(10.0, lon);
            assert!((1..=ZONE_COUNT).contains(&zone.number()), "zone {} for {}", zone, lon);
            assert_eq!(UtmZone::from_epsg(zone.epsg()), Some(zone));
        }
    }

    #[test]
    fn test_equator_is_north() {
        assert_eq!(UtmZone::for_point(0.0, 3.0).hemisphere(), Hemisphere::North);
        assert_eq!(UtmZone::for_point(-0.0001, 3.0).hemisphere(), Hemisphere::South);
    }

    #[test]
    fn test_epsg_roundtrip() {
        for number in 1..=ZONE_COUNT {
            for hemisphere in [Hemisphere::North, Hemisphere::South] {
                let zone = UtmZone::new(number, hemisphere).unwrap();
                assert_eq!(UtmZone::from_epsg(zone.epsg()), Some(zone));
            }
        }
    }

    #[test]
    fn test_from_epsg_rejects_other_codes() {
        assert_eq!(UtmZone::from_epsg(4326), None);
        assert_eq!(UtmZone::from_epsg(32600), None);
        assert_eq!(UtmZone::from_epsg(32661), None);
        assert_eq!(UtmZone::from_epsg(32700), None);
    }

    #[test]
    fn test_central_meridian() {
        assert_eq!(UtmZone::new(1, Hemisphere::North).unwrap().central_meridian(), -177.0);
        assert_eq!(UtmZone::new(32, Hemisphere::North).unwrap().central_meridian(), 9.0);
        assert_eq!(UtmZone::new(60, Hemisphere::South).unwrap().central_meridian(), 177.0);
        assert!(UtmZone::new(0, Hemisphere::North).is_none());
        assert!(UtmZone::new(0, Hemisphere::South).is_none());
        assert!(UtmZone::new(61, Hemisphere::North).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(UtmZone::for_point(-33.87, 151.21).to_string(), "56S");
    }
}
