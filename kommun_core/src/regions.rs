//! Region boundaries loaded once from the municipality GeoJSON.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point, Rect};
use geojson::GeoJson;
use kommun_proto::RegionId;
use thiserror::Error;

const ID_PROPERTY: &str = "id";
const NAME_PROPERTY: &str = "kom_namn";

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub boundary: MultiPolygon<f64>,
}

impl Region {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.boundary.contains(&Point::new(x, y))
    }
}

/// Immutable lookup over the loaded regions, in dataset order.
#[derive(Debug, Clone, Default)]
pub struct GeoRegistry {
    regions: Vec<Region>,
    index: HashMap<RegionId, usize>,
    bounds: Option<Rect<f64>>,
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to read region boundaries from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse region boundaries: {0}")]
    Parse(#[from] geojson::Error),
    #[error("region boundaries must be a FeatureCollection")]
    NotFeatureCollection,
}

impl GeoRegistry {
    pub fn from_file(path: &Path) -> Result<Self, GeoError> {
        let contents = fs::read_to_string(path).map_err(|source| GeoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = GeoRegistry::from_geojson_str(&contents)?;
        tracing::info!(
            target: "kommun::geo",
            path = %path.display(),
            regions = registry.len(),
            "geo_registry.loaded"
        );
        Ok(registry)
    }

    /// Keeps Polygon and MultiPolygon features that carry an `id`; anything
    /// else is skipped with a warning. A repeated id replaces the earlier one.
    pub fn from_geojson_str(json: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = json.parse::<GeoJson>()? else {
            return Err(GeoError::NotFeatureCollection);
        };

        let mut registry = GeoRegistry::default();
        for (position, feature) in collection.features.into_iter().enumerate() {
            let properties = feature.properties.unwrap_or_default();
            let Some(id) = properties.get(ID_PROPERTY).and_then(property_id) else {
                tracing::warn!(target: "kommun::geo", position, "geo_registry.skip=missing_id");
                continue;
            };
            let name = properties
                .get(NAME_PROPERTY)
                .and_then(|value| value.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());

            let boundary = match feature.geometry.map(|g| Geometry::<f64>::try_from(g.value)) {
                Some(Ok(Geometry::Polygon(polygon))) => MultiPolygon::new(vec![polygon]),
                Some(Ok(Geometry::MultiPolygon(multi))) => multi,
                Some(Ok(_)) | None => {
                    tracing::warn!(target: "kommun::geo", %id, "geo_registry.skip=not_polygonal");
                    continue;
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        target: "kommun::geo",
                        %id,
                        error = %err,
                        "geo_registry.skip=bad_geometry"
                    );
                    continue;
                }
            };

            registry.insert(Region { id, name, boundary });
        }
        Ok(registry)
    }

    fn insert(&mut self, region: Region) {
        if let Some(rect) = region.boundary.bounding_rect() {
            self.bounds = Some(match self.bounds {
                Some(existing) => Rect::new(
                    (existing.min().x.min(rect.min().x), existing.min().y.min(rect.min().y)),
                    (existing.max().x.max(rect.max().x), existing.max().y.max(rect.max().y)),
                ),
                None => rect,
            });
        }
        match self.index.get(&region.id) {
            Some(&slot) => self.regions[slot] = region,
            None => {
                self.index.insert(region.id.clone(), self.regions.len());
                self.regions.push(region);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.index.get(id).map(|&slot| &self.regions[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Position in dataset order, used for stepping hover with the keyboard.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn by_position(&self, position: usize) -> Option<&Region> {
        self.regions.get(position)
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    /// Region whose boundary contains the point (longitude, latitude).
    pub fn region_at(&self, x: f64, y: f64) -> Option<&Region> {
        self.regions.iter().find(|region| region.contains(x, y))
    }
}

fn property_id(value: &serde_json::Value) -> Option<RegionId> {
    match value {
        serde_json::Value::String(text) if !text.is_empty() => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
