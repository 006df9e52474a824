pub mod classifier;
pub mod credential_loader;
pub mod credential_resolver;
pub mod folder_crawler;
pub mod query_builder;
pub mod reindex;
pub mod search;
pub mod sheets_gateway;

#[cfg(test)]
pub(crate) mod fake_drive;

pub use classifier::LegibilityClassifier;
pub use credential_resolver::{CredentialResolver, CredentialStrategy, RequestContext};
pub use reindex::ReindexTrigger;
pub use search::{SearchSettings, run_search};
pub use sheets_gateway::SheetsGateway;
