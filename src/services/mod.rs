pub mod alias_cache;
pub mod antispam_service;
pub mod ceg_engine;
pub mod classifier_service;
pub mod enrichment_service;
pub mod event_extractor_service;
pub mod event_study_service;
pub mod graph_writer_service;
pub mod image_service;
pub mod linker_service;
pub mod outbox_relay_service;
pub mod retry;
pub mod source_poller_service;
