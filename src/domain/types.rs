//! Shared types for campus navigation

use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Newtype wrapper for building IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BuildingId(pub u32);

impl std::fmt::Display for BuildingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Build from a GeoJSON-ordered `[lng, lat]` pair
    #[inline]
    pub const fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self { latitude: pair[1], longitude: pair[0] }
    }

    /// Finite and within lat/lng bounds
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters (haversine, mean Earth radius)
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }

    #[inline]
    fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Directory entry. Extra fields in the source JSON are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Building {
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Maneuver classification from the directions provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManeuverType {
    Turn,
    Depart,
    Arrive,
    Continue,
    NewName,
    Merge,
    OnRamp,
    OffRamp,
    Fork,
    EndOfRoad,
    Roundabout,
    Rotary,
    RoundaboutTurn,
    ExitRoundabout,
    ExitRotary,
    Notification,
    Other(String),
}

impl std::str::FromStr for ManeuverType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "turn" => ManeuverType::Turn,
            "depart" => ManeuverType::Depart,
            "arrive" => ManeuverType::Arrive,
            "continue" => ManeuverType::Continue,
            "new name" => ManeuverType::NewName,
            "merge" => ManeuverType::Merge,
            "on ramp" => ManeuverType::OnRamp,
            "off ramp" => ManeuverType::OffRamp,
            "fork" => ManeuverType::Fork,
            "end of road" => ManeuverType::EndOfRoad,
            "roundabout" => ManeuverType::Roundabout,
            "rotary" => ManeuverType::Rotary,
            "roundabout turn" => ManeuverType::RoundaboutTurn,
            "exit roundabout" => ManeuverType::ExitRoundabout,
            "exit rotary" => ManeuverType::ExitRotary,
            "notification" => ManeuverType::Notification,
            other => ManeuverType::Other(other.to_string()),
        })
    }
}

impl ManeuverType {
    pub fn as_str(&self) -> &str {
        match self {
            ManeuverType::Turn => "turn",
            ManeuverType::Depart => "depart",
            ManeuverType::Arrive => "arrive",
            ManeuverType::Continue => "continue",
            ManeuverType::NewName => "new name",
            ManeuverType::Merge => "merge",
            ManeuverType::OnRamp => "on ramp",
            ManeuverType::OffRamp => "off ramp",
            ManeuverType::Fork => "fork",
            ManeuverType::EndOfRoad => "end of road",
            ManeuverType::Roundabout => "roundabout",
            ManeuverType::Rotary => "rotary",
            ManeuverType::RoundaboutTurn => "roundabout turn",
            ManeuverType::ExitRoundabout => "exit roundabout",
            ManeuverType::ExitRotary => "exit rotary",
            ManeuverType::Notification => "notification",
            ManeuverType::Other(s) => s,
        }
    }
}

impl Serialize for ManeuverType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ManeuverType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // FromStr is infallible
        Ok(s.parse().unwrap_or(ManeuverType::Other(s)))
    }
}

/// One maneuver along a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub instruction_text: String,
    pub maneuver_type: ManeuverType,
    pub maneuver_location: Coordinate,
}

/// A walking route. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub geometry: Vec<Coordinate>,
    pub duration_seconds: f64,
    pub steps: Vec<Step>,
}

impl Route {
    /// Estimated travel time in whole minutes
    pub fn travel_time_minutes(&self) -> u64 {
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return 0;
        }
        (self.duration_seconds / 60.0).round() as u64
    }
}

/// A single position fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    /// Horizontal accuracy in meters, when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

impl LocationSample {
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self { coordinate, timestamp, accuracy_m: None }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maneuver_type_from_str() {
        assert_eq!("turn".parse::<ManeuverType>().unwrap(), ManeuverType::Turn);
        assert_eq!("end of road".parse::<ManeuverType>().unwrap(), ManeuverType::EndOfRoad);
        assert!(matches!(
            "use lane".parse::<ManeuverType>().unwrap(),
            ManeuverType::Other(_)
        ));
    }

    #[test]
    fn test_maneuver_type_serde() {
        let t: ManeuverType = serde_json::from_str(r#""new name""#).unwrap();
        assert_eq!(t, ManeuverType::NewName);
        assert_eq!(serde_json::to_string(&ManeuverType::Turn).unwrap(), r#""turn""#);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(45.0, -122.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_distance_one_degree_longitude_at_equator() {
        let d = Coordinate::new(0.0, 0.0).distance_to(&Coordinate::new(0.0, 1.0));
        // 2 * pi * 6371008.8 / 360
        assert!((d - 111_195.08).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        let c = Coordinate::new(37.7749, -122.4194);
        assert_eq!(c.distance_to(&c), 0.0);
    }

    #[test]
    fn test_building_ignores_extra_fields() {
        let json = r#"{"id": 3, "name": "Library", "latitude": 1.5, "longitude": 2.5, "floors": 4}"#;
        let b: Building = serde_json::from_str(json).unwrap();
        assert_eq!(b.id, BuildingId(3));
        assert_eq!(b.coordinate(), Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn test_travel_time_minutes_rounds() {
        let route = Route { geometry: vec![], duration_seconds: 150.0, steps: vec![] };
        assert_eq!(route.travel_time_minutes(), 3);
        let route = Route { geometry: vec![], duration_seconds: 89.0, steps: vec![] };
        assert_eq!(route.travel_time_minutes(), 1);
    }
}
