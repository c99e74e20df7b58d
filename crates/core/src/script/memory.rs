use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{ScriptError, ScriptRegistry, ScriptedSeries};

/// Scripted series kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryScriptRegistry {
    series: RwLock<BTreeMap<String, ScriptedSeries>>,
}

impl InMemoryScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with scripted series.
    pub fn with_series(series: impl IntoIterator<Item = ScriptedSeries>) -> Self {
        let map = series.into_iter().map(|s| (s.name.clone(), s)).collect();
        Self {
            series: RwLock::new(map),
        }
    }
}

fn poisoned() -> ScriptError {
    ScriptError::Database("script registry lock poisoned".to_string())
}

impl ScriptRegistry for InMemoryScriptRegistry {
    fn get(&self, name: &str) -> Result<Option<ScriptedSeries>, ScriptError> {
        let series = self.series.read().map_err(|_| poisoned())?;
        Ok(series.get(name).cloned())
    }

    fn save(&self, series: &ScriptedSeries) -> Result<(), ScriptError> {
        let mut map = self.series.write().map_err(|_| poisoned())?;
        map.insert(series.name.clone(), series.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ScriptedSeries>, ScriptError> {
        let series = self.series.read().map_err(|_| poisoned())?;
        Ok(series.values().cloned().collect())
    }
}
