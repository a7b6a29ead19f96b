//! Client side of shellcache.
//!
//! This crate provides the HTTP fetch pipeline, request classification and the
//! offline-first worker engine driven by the server.

pub mod classify;
pub mod fetch;
pub mod worker;

pub use classify::{Category, ClassifiedRequest, Classifier, ClassifierRules, Strategy};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{
    CacheStorage, ClientAction, ClientEvent, ClientMessage, FetchOutcome, Registration, RegistrationStatus,
    ShellWorker, Source, StrategyResult, SyncReport, WorkerConfig, WorkerHandlers, WorkerState,
};
