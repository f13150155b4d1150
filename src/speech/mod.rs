//! Speech module: voice resolution, token lifecycle and synthesis dispatch.
//!
//! Talks to the Azure speech service over REST; the service sits behind the
//! [`SpeechBackend`] trait.

mod azure;
mod backend;
mod catalog;
mod dispatcher;
mod error;
mod resolver;
mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use azure::AzureSpeechClient;
pub use backend::SpeechBackend;
pub use dispatcher::{DispatchState, SynthesisDispatcher};
