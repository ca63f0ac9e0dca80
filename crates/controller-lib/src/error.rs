//! Error taxonomy for the soft-limit controller
//!
//! Parse-time errors (`InvalidQuantity`, `InvalidPercentage`) degrade to
//! "resource kind not enforced" and are never fatal. Pass-time errors are
//! per-pod: logged, counted, and skipped without aborting the pass.

use crate::quantity::ResourceKind;
use thiserror::Error;

/// Boxed source for errors that can originate from more than one layer.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// A quantity literal did not match the resource kind's accepted grammar.
    #[error("invalid {kind} quantity {text:?}")]
    InvalidQuantity { text: String, kind: ResourceKind },

    /// A percentage literal whose numeric prefix is not a valid number.
    #[error("invalid percentage literal {text:?}")]
    InvalidPercentage { text: String },

    /// Listing the pod set failed; aborts the current pass only.
    #[error("failed to list pods")]
    List(#[source] kube::Error),

    /// The metrics service could not be reached or returned an undecodable body.
    #[error("metrics unavailable for {workload}")]
    MetricsUnavailable {
        workload: String,
        #[source]
        source: BoxedSource,
    },

    /// Deleting a pod failed.
    #[error("failed to terminate {workload}")]
    Termination {
        workload: String,
        #[source]
        source: kube::Error,
    },
}
