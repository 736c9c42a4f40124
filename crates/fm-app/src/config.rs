//! Dataset configuration from the "properties" sheet.

use std::collections::BTreeMap;
use std::str::FromStr;

use fm_core::{Real, parse_finite};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigPropName {
    Title,
    Description,
    SourceName,
    SourceUrl,
    MapBbox,
    IgnoreErrors,
    MapboxAccessToken,
}

impl ConfigPropName {
    pub const ALL: [ConfigPropName; 7] = [
        ConfigPropName::Title,
        ConfigPropName::Description,
        ConfigPropName::SourceName,
        ConfigPropName::SourceUrl,
        ConfigPropName::MapBbox,
        ConfigPropName::IgnoreErrors,
        ConfigPropName::MapboxAccessToken,
    ];

    /// Key as written in the sheet.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigPropName::Title => "title",
            ConfigPropName::Description => "description",
            ConfigPropName::SourceName => "source.name",
            ConfigPropName::SourceUrl => "source.url",
            ConfigPropName::MapBbox => "map.bbox",
            ConfigPropName::IgnoreErrors => "ignore.errors",
            ConfigPropName::MapboxAccessToken => "mapbox.accessToken",
        }
    }
}

impl FromStr for ConfigPropName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigPropName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::Config(format!("Unknown property: {s}")))
    }
}

/// One row of the properties sheet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigProp {
    pub property: String,
    #[serde(default, deserialize_with = "fm_data::model::lenient_cell")]
    pub value: Option<String>,
}

impl ConfigProp {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            value: Some(value.to_string()),
        }
    }
}

/// Resolved configuration. Every property defaults to unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: BTreeMap<ConfigPropName, String>,
}

impl Config {
    /// Apply sheet rows over the defaults. Empty values and unknown
    /// properties are skipped.
    pub fn from_props(props: &[ConfigProp]) -> Self {
        let mut config = Config::default();
        for prop in props {
            let Some(value) = prop.value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            match prop.property.parse::<ConfigPropName>() {
                Ok(name) => {
                    config.values.insert(name, value.to_string());
                }
                Err(_) => tracing::debug!(property = %prop.property, "ignoring unknown property"),
            }
        }
        config
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        let props: Vec<ConfigProp> = serde_json::from_str(json)?;
        Ok(Self::from_props(&props))
    }

    pub fn get(&self, name: ConfigPropName) -> Option<&str> {
        self.values.get(&name).map(String::as_str)
    }

    pub fn set(&mut self, name: ConfigPropName, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.get(ConfigPropName::Title)
    }

    /// Duplicate-flow warnings are not surfaced when this is set.
    pub fn ignore_errors(&self) -> bool {
        self.get(ConfigPropName::IgnoreErrors) == Some("yes")
    }

    /// `map.bbox` as `[west, south, east, north]`.
    pub fn map_bbox(&self) -> AppResult<Option<[Real; 4]>> {
        let Some(raw) = self.get(ConfigPropName::MapBbox) else {
            return Ok(None);
        };
        let parts: Vec<Real> = raw.split(',').filter_map(parse_finite).collect();
        match parts[..] {
            [w, s, e, n] if raw.split(',').count() == 4 => Ok(Some([w, s, e, n])),
            _ => Err(AppError::Config(format!("Invalid map.bbox: {raw}"))),
        }
    }
}
