pub mod aggregator;
pub mod completion;
pub mod notifier;
pub mod score_function;
pub mod scoring;
pub mod settings_engine;
pub mod validation;
