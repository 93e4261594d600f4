//! HTTP implementations of the collaborator traits in
//! [`crate::resolve::source`].
//!
//! | Client | Trait | Service |
//! |--------|-------|---------|
//! | [`TarkClient`] | `AnnotationSource` | Ensembl TARK transcript archive |
//! | [`EnsemblClient`] | `VariantSource` | Ensembl REST variation endpoint |
//! | [`PanelAppClient`] | `PanelSource` | Genomics England PanelApp |
//!
//! All share [`http::HttpClient`], which retries transient failures with
//! exponential backoff and reports exhausted retries as
//! `Error::ExternalService`.

pub mod ensembl;
pub mod http;
pub mod panelapp;
pub mod tark;

pub use ensembl::EnsemblClient;
pub use http::RetryPolicy;
pub use panelapp::PanelAppClient;
pub use tark::TarkClient;
