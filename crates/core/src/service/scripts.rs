//! Scripted series registration.

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CommandResult, SubscriptionService};
use crate::error::CommandError;
use crate::script::ScriptedSeries;

/// Registration or update of a scripted series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub name: String,
    pub update_day: Weekday,
    /// Force the episode counter. New scripts start at 0 without it.
    #[serde(default)]
    pub episode: Option<u32>,
    /// Download links by episode number, merged into those already known.
    #[serde(default)]
    pub releases: BTreeMap<u32, String>,
}

impl SubscriptionService {
    /// Register a scripted series or publish new releases for one.
    pub async fn register_script(
        &self,
        request: &ScriptRequest,
    ) -> Result<CommandResult, CommandError> {
        debug!(
            "script name: {} releases: {:?}",
            request.name,
            request.releases.keys()
        );
        let _guard = self.write_lock.lock().await;
        let result = self.register_script_locked(request);
        self.respond("script", result)
    }

    fn register_script_locked(
        &self,
        request: &ScriptRequest,
    ) -> Result<CommandResult, CommandError> {
        let Some(scripts) = self.scripts.as_ref() else {
            return Err(CommandError::Validation(
                "Scripted series are not enabled".to_string(),
            ));
        };

        let name = request.name.trim();
        if name.is_empty() {
            return Err(CommandError::Validation(
                "Script name must not be empty".to_string(),
            ));
        }
        let blank = request.releases.iter().find(|(_, link)| link.trim().is_empty());
        if let Some((episode, _)) = blank {
            return Err(CommandError::Validation(format!(
                "Release {} of {} has no download link",
                episode, name
            )));
        }

        let (mut scripted, message) = match scripts.get(name)? {
            Some(existing) => (existing, format!("Script {} updated", name)),
            None => (
                ScriptedSeries::new(name, 0, request.update_day),
                format!("Script {} registered", name),
            ),
        };

        scripted.update_day = request.update_day;
        if let Some(episode) = request.episode {
            scripted.episode = episode;
        }
        scripted.releases.extend(request.releases.clone());

        scripts.save(&scripted)?;
        info!(
            "Script {} at episode {} with {} releases",
            scripted.name,
            scripted.episode,
            scripted.releases.len()
        );

        Ok(CommandResult::success(message).with_data(&scripted))
    }

    /// List scripted series.
    pub async fn list_scripts(&self) -> Result<CommandResult, CommandError> {
        let result = match self.scripts.as_ref() {
            Some(scripts) => scripts.list().map_err(CommandError::from),
            None => Ok(Vec::new()),
        }
        .map(|scripts| {
            CommandResult::success(format!("{} scripts", scripts.len())).with_data(&scripts)
        });
        self.respond("scripts", result)
    }
}
