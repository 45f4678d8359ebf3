// Accreditation Ledger - Core Library
// Tracks a public certification registry and keeps the history of who was
// listed when. Exposes all modules for the binary and for tests.

pub mod config;
pub mod error;
pub mod extractor;      // Pluggable markup strategies → trust-tagged observation
pub mod fetch;          // Page transport behind a trait
pub mod organization;   // Records + registry aggregate
pub mod pipeline;       // One run, end to end
pub mod presenter;      // Static status page
pub mod reconciliation; // The state machine
pub mod store;          // Durable JSON state
pub mod temporal;       // UTC timestamp codec

// Re-export commonly used types
pub use config::LedgerConfig;
pub use error::{ConfigError, ExtractionError, FetchError, RenderError, StoreError};
pub use extractor::{
    default_strategies, is_organization_link, Candidate, ExtractionResult, ExtractionStrategy,
    Extractor, Listing, MarkupScheme,
    CompanyBlockStrategy, ElementorImageBoxStrategy, HeadingListStrategy, JetListingGridStrategy,
};
pub use fetch::{PageSource, StaticPageSource};
#[cfg(feature = "http")]
pub use fetch::HttpPageSource;
pub use organization::{
    AccreditationStatus, OrganizationRecord, RecordError, RegistryState, UpdateOutcome,
};
pub use pipeline::{Pipeline, RunReport};
pub use presenter::{render_document, Presenter};
pub use reconciliation::{
    ChangeKind, Reconciler, Reconciliation, ReconciliationSummary, StatusChange,
};
pub use store::RegistryStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
