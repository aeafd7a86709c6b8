//! App Core for tagshelf.
//!
//! Central struct holding the settings engine, the bookmark manager and the
//! scoring pipeline, wired to whichever record store the settings select.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::managers::bookmark_manager::BookmarkManager;
use crate::platform;
use crate::services::completion::{CompletionClient, OpenAiClient};
use crate::services::notifier::Notifier;
use crate::services::score_function::{ApiKeySource, ScoreFunction, ScoringOptions};
use crate::services::scoring::{HttpScoringClient, LocalScoringClient, ScoringClient, ScoringFlow};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::store::{open_store, MemoryStore, RecordStore};

/// Central application struct holding all managers and services.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub bookmarks: BookmarkManager,
    pub scoring: ScoringFlow,
    /// Present when scoring runs in-process rather than against a deployed function.
    pub score_function: Option<Arc<ScoreFunction>>,
}

impl App {
    /// Creates the App from loaded settings, opening the configured store and
    /// the OpenAI completion client.
    pub fn new(
        settings_engine: SettingsEngine,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let settings = settings_engine.get_settings().clone();
        let store = open_store(&settings.storage, &platform::get_data_dir())?;
        let completion = Arc::new(OpenAiClient::new(
            &settings.scoring.completion_endpoint,
            Duration::from_secs(settings.scoring.request_timeout_secs),
        )?);
        let api_key = ApiKeySource::Env(settings.scoring.api_key_env.clone());
        Self::with_store(settings_engine, store, completion, api_key, notifier)
    }

    /// Creates the App over an explicit store and completion client.
    pub fn with_store(
        settings_engine: SettingsEngine,
        store: Arc<dyn RecordStore>,
        completion: Arc<dyn CompletionClient>,
        api_key: ApiKeySource,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let scoring_settings = settings_engine.get_settings().scoring.clone();

        let (client, score_function): (Arc<dyn ScoringClient>, Option<Arc<ScoreFunction>>) =
            match scoring_settings.function_url.as_deref() {
                Some(url) => {
                    info!(url, "scoring via deployed function");
                    let client = HttpScoringClient::new(
                        url,
                        Duration::from_secs(scoring_settings.request_timeout_secs),
                    )?;
                    (Arc::new(client), None)
                }
                None => {
                    let function = Arc::new(ScoreFunction::new(
                        store.clone(),
                        completion,
                        api_key,
                        ScoringOptions::from(&scoring_settings),
                    ));
                    (Arc::new(LocalScoringClient::new(function.clone())), Some(function))
                }
            };

        Ok(Self {
            settings_engine,
            bookmarks: BookmarkManager::new(store, notifier),
            scoring: ScoringFlow::new(client),
            score_function,
        })
    }

    /// An App over an empty in-memory store with default settings.
    ///
    /// Settings writes go to `settings_path`.
    pub fn in_memory(
        settings_path: &str,
        completion: Arc<dyn CompletionClient>,
        api_key: ApiKeySource,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let settings_engine = SettingsEngine::new(Some(settings_path.to_string()));
        Self::with_store(
            settings_engine,
            Arc::new(MemoryStore::new()),
            completion,
            api_key,
            notifier,
        )
    }
}
