use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::foundation::error::ConfigError;

/// Default radar image side length, in radar pixels.
pub const DEFAULT_RADAR_SIZE: f64 = 1024.0;

fn default_radar_size() -> f64 {
    DEFAULT_RADAR_SIZE
}

fn default_flip_y() -> bool {
    true
}

/// Radar calibration for one map.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MapProfile {
    /// Canonical map name (`de_*`).
    pub name: String,
    /// World x of the radar image's left edge.
    pub origin_x: f64,
    /// World y of the radar image's top edge.
    pub origin_y: f64,
    /// World units per radar pixel.
    pub scale: f64,
    /// Radar image side length in radar pixels.
    #[serde(default = "default_radar_size")]
    pub radar_size: f64,
    /// World +y points up on the radar (image y grows downwards).
    #[serde(default = "default_flip_y")]
    pub flip_y: bool,
    /// Optional radar backdrop PNG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop: Option<PathBuf>,
}

impl MapProfile {
    fn builtin(name: &str, origin_x: f64, origin_y: f64, scale: f64) -> Self {
        Self {
            name: name.to_owned(),
            origin_x,
            origin_y,
            scale,
            radar_size: DEFAULT_RADAR_SIZE,
            flip_y: true,
            backdrop: None,
        }
    }

    /// Check calibration values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidProfile {
            map: self.name.clone(),
            reason: reason.to_owned(),
        };
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(invalid("scale must be finite and > 0"));
        }
        if !(self.radar_size.is_finite() && self.radar_size > 0.0) {
            return Err(invalid("radar_size must be finite and > 0"));
        }
        if !(self.origin_x.is_finite() && self.origin_y.is_finite()) {
            return Err(invalid("origin must be finite"));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<MapProfile>),
    Wrapped { maps: Vec<MapProfile> },
}

/// Registry of map calibrations, keyed by canonical map name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapCatalog {
    profiles: BTreeMap<String, MapProfile>,
}

impl MapCatalog {
    /// Catalog with the competitive map pool calibrations.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for p in [
            MapProfile::builtin("de_dust2", -2476.0, 3239.0, 4.4),
            MapProfile::builtin("de_mirage", -3230.0, 1713.0, 5.0),
            MapProfile::builtin("de_inferno", -2087.0, 3870.0, 4.9),
            MapProfile::builtin("de_nuke", -3453.0, -790.0, 7.0),
            MapProfile::builtin("de_overpass", -4831.0, 1781.0, 5.2),
            MapProfile::builtin("de_ancient", -2953.0, 2382.0, 5.0),
            MapProfile::builtin("de_anubis", -2796.0, 2279.0, 5.2),
            MapProfile::builtin("de_vertigo", -3168.0, 2048.0, 4.0),
        ] {
            catalog.profiles.insert(p.name.clone(), p);
        }
        catalog
    }

    /// Parse profiles from JSON: either a list of profiles or `{ "maps": [...] }`.
    pub fn from_reader<R: std::io::Read>(r: R) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_reader(r).map_err(|e| ConfigError::Load {
            path: "<reader>".to_owned(),
            reason: e.to_string(),
        })?;
        let list = match file {
            CatalogFile::List(l) => l,
            CatalogFile::Wrapped { maps } => maps,
        };
        let mut catalog = Self::default();
        for mut p in list {
            p.name = normalize_map_name(&p.name);
            p.validate()?;
            catalog.profiles.insert(p.name.clone(), p);
        }
        Ok(catalog)
    }

    /// Load profiles from a JSON file. Relative backdrop paths resolve against the file's
    /// directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |reason: String| ConfigError::Load {
            path: path.display().to_string(),
            reason,
        };
        let f = File::open(path).map_err(|e| load_err(e.to_string()))?;
        let mut catalog = Self::from_reader(BufReader::new(f)).map_err(|e| match e {
            ConfigError::Load { reason, .. } => load_err(reason),
            other => other,
        })?;
        if let Some(dir) = path.parent() {
            for p in catalog.profiles.values_mut() {
                if let Some(b) = p.backdrop.as_mut()
                    && b.is_relative()
                {
                    *b = dir.join(&*b);
                }
            }
        }
        Ok(catalog)
    }

    /// Add or replace profiles from `other`.
    pub fn merge(&mut self, other: MapCatalog) {
        self.profiles.extend(other.profiles);
    }

    /// Insert a single profile (name is normalized).
    pub fn insert(&mut self, mut profile: MapProfile) -> Result<(), ConfigError> {
        profile.name = normalize_map_name(&profile.name);
        profile.validate()?;
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Look up the profile for `map`. Missing maps are an error, never a default.
    pub fn get(&self, map: &str) -> Result<&MapProfile, ConfigError> {
        let key = normalize_map_name(map);
        self.profiles
            .get(&key)
            .ok_or_else(|| ConfigError::UnknownMap(map.to_owned()))
    }

    /// Known map names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// All profiles, sorted by name.
    pub fn profiles(&self) -> impl Iterator<Item = &MapProfile> {
        self.profiles.values()
    }
}

/// Canonicalize a map identifier: `"maps/de_dust2.bsp"`, `"Dust2"` → `"de_dust2"`.
pub fn normalize_map_name(raw: &str) -> String {
    let base = raw
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let base = base
        .strip_suffix(".bsp")
        .or_else(|| base.strip_suffix(".vpk"))
        .unwrap_or(&base);
    if base.is_empty() || base.contains('_') {
        base.to_owned()
    } else {
        format!("de_{base}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/map/catalog.rs"]
mod tests;
