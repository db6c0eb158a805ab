//! Administrative boundary lookup.
//!
//! Resolves detection coordinates to province and department names
//! using GADM GeoJSON boundary files (level 1 carries `NAME_1`,
//! level 2 `NAME_2`). Both layers are optional; an atlas without
//! layers resolves every point to `(None, None)`.

use std::fs;
use std::path::Path;

use geo::{Contains, Point};
use geojson::GeoJson;
use tracing::{debug, warn};

use crate::errors::FiresiftError;

#[derive(Debug)]
struct NamedArea {
    name: String,
    shape: geo::Geometry<f64>,
}

/// Province and department boundaries for point lookup.
#[derive(Debug, Default)]
pub struct AdminAtlas {
    provinces: Vec<NamedArea>,
    departments: Vec<NamedArea>,
}

impl AdminAtlas {
    /// Load boundary layers from optional GeoJSON files.
    ///
    /// A path that does not exist disables that layer with a warning;
    /// lookups still work and return `None` for it.
    ///
    /// # Errors
    ///
    /// Returns [`FiresiftError::Geo`] when a present file is not a
    /// GeoJSON feature collection.
    pub fn load(
        provinces: Option<&Path>,
        departments: Option<&Path>,
    ) -> Result<Self, FiresiftError> {
        let provinces = match provinces {
            Some(path) => load_layer(path, "NAME_1")?,
            None => Vec::new(),
        };
        let departments = match departments {
            Some(path) => load_layer(path, "NAME_2")?,
            None => Vec::new(),
        };

        Ok(Self {
            provinces,
            departments,
        })
    }

    /// True when no layer is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty() && self.departments.is_empty()
    }

    /// Resolve a point to its province and department names.
    ///
    /// The first containing feature wins in each layer.
    #[must_use]
    pub fn locate(&self, lat: f64, lon: f64) -> (Option<&str>, Option<&str>) {
        let point = Point::new(lon, lat);
        (
            first_containing(&self.provinces, &point),
            first_containing(&self.departments, &point),
        )
    }
}

fn first_containing<'a>(areas: &'a [NamedArea], point: &Point<f64>) -> Option<&'a str> {
    areas
        .iter()
        .find(|area| area.shape.contains(point))
        .map(|area| area.name.as_str())
}

fn load_layer(path: &Path, name_key: &str) -> Result<Vec<NamedArea>, FiresiftError> {
    if !path.exists() {
        warn!(path = %path.display(), "boundary file not found, layer disabled");
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(path)?;
    let geojson = text
        .parse::<GeoJson>()
        .map_err(|e| FiresiftError::Geo(format!("{}: {e}", path.display())))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(FiresiftError::Geo(format!(
            "{}: expected a feature collection",
            path.display()
        )));
    };

    let mut areas = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(name) = feature
            .property(name_key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
        else {
            continue;
        };
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        match geo::Geometry::<f64>::try_from(geometry) {
            Ok(shape) => areas.push(NamedArea { name, shape }),
            Err(e) => {
                debug!(name, error = %e, "skipping feature with unsupported geometry");
            }
        }
    }

    debug!(path = %path.display(), areas = areas.len(), "boundary layer loaded");
    Ok(areas)
}
