//! # vitae-jobs
//!
//! Async worker pool, processing pipeline, stuck-run reaper, and
//! completion notifier for vitae.
//!
//! This crate provides:
//! - A worker pool consuming the durable processing queue, each unit of
//!   work under a hard ceiling
//! - The processing pipeline: tenant context, extraction chain,
//!   atomic persistence, optional enhancement, notification
//! - The reaper reclaiming runs stuck past the SLA, across all
//!   partitions
//! - Fire-and-forget completion events on a broadcast bus
//!
//! ## Example
//!
//! ```ignore
//! use vitae_jobs::{
//!     CompletionNotifier, ProcessingPipeline, Reaper, ReaperConfig, Worker, WorkerConfig,
//! };
//! use vitae_db::Database;
//! use vitae_extract::{EnhancementStage, ExtractionChain};
//! use vitae_core::EventBus;
//!
//! let db = Database::connect("postgres://...").await?;
//! let bus = EventBus::new();
//! let pipeline = ProcessingPipeline::new(
//!     db.clone(),
//!     ExtractionChain::from_env(),
//!     EnhancementStage::from_env(),
//!     CompletionNotifier::new(bus.clone()),
//! );
//!
//! let worker = Worker::new(db.clone(), pipeline, WorkerConfig::from_env());
//! let handle = worker.start();
//!
//! let reaper = Reaper::new(db, ReaperConfig::from_env());
//! let reaper_handle = reaper.start();
//!
//! // ... later
//! handle.shutdown().await?;
//! reaper_handle.shutdown().await?;
//! ```

pub mod notifier;
pub mod pipeline;
pub mod reaper;
pub mod worker;

// Re-export core types
pub use vitae_core::*;

pub use notifier::CompletionNotifier;
pub use pipeline::ProcessingPipeline;
pub use reaper::{Reaper, ReaperConfig, ReaperHandle, SweepReport};
pub use worker::{Worker, WorkerConfig, WorkerEvent, WorkerHandle};
