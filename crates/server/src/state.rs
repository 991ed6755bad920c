//! Application State
//!
//! Shared state across all handlers.

use std::path::PathBuf;
use std::sync::Arc;

use callbot_config::Settings;
use callbot_core::CallRecordStore;
use callbot_pipeline::{CallOrchestrator, PipelineError, VoiceSynthesizer};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<CallOrchestrator>,
    /// Standalone synthesizer for `/tts`, available even when the pipeline
    /// skips synthesis
    pub synthesizer: Arc<VoiceSynthesizer>,
    pub store: Arc<dyn CallRecordStore>,
}

impl AppState {
    pub fn new(
        config: Settings,
        orchestrator: CallOrchestrator,
        synthesizer: VoiceSynthesizer,
    ) -> Self {
        let store = orchestrator.store().clone();
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            synthesizer: Arc::new(synthesizer),
            store,
        }
    }

    /// Wire every service from settings around `store`
    pub fn from_settings(
        config: Settings,
        store: Arc<dyn CallRecordStore>,
    ) -> Result<Self, PipelineError> {
        let orchestrator = CallOrchestrator::from_settings(&config, store)?;
        let synthesizer = VoiceSynthesizer::from_config(&config.tts)?;
        Ok(Self::new(config, orchestrator, synthesizer))
    }

    pub fn monitor_dir(&self) -> &PathBuf {
        &self.config.recordings.monitor_dir
    }
}
