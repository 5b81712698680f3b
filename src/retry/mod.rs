//! Resilient remote calls
//!
//! Every outbound call to a model provider or knowledge base runs through
//! one executor: the caller supplies the operation, an error classifier and
//! a [`RetryPolicy`], and gets back a [`RemoteResult`].

pub mod classify;
pub mod executor;
pub mod policy;

pub use classify::{
    classify_error_code, classify_reqwest_error, classify_status, fatal_always, ErrorClass,
};
pub use executor::{
    execute, AttemptOutcome, CallAttempt, ErrorKind, Executor, RemoteError, RemoteResult,
};
pub use policy::{presets, RetryPolicy};
