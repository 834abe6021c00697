// Places that can be called out
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PlaceError;
use crate::spatial::GeoPoint;

/// A point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

impl Place {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
        }
    }
}

/// Supplies candidate places around a point
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn places_near(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<Place>, PlaceError>;
}

/// A fixed, in-memory set of places
#[derive(Debug, Clone, Default)]
pub struct StaticPlaces {
    places: Vec<Place>,
}

impl StaticPlaces {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }

    /// Load a JSON array of places
    pub fn from_file(path: &Path) -> Result<Self, PlaceError> {
        let content = std::fs::read_to_string(path)?;
        let places: Vec<Place> = serde_json::from_str(&content)?;
        tracing::info!("Loaded {} places from {:?}", places.len(), path);
        Ok(Self::new(places))
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait]
impl PlaceSource for StaticPlaces {
    async fn places_near(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<Place>, PlaceError> {
        Ok(self
            .places
            .iter()
            .filter(|p| center.distance_m(&p.location) <= radius_m)
            .cloned()
            .collect())
    }
}
