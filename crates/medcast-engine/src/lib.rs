//! MedCast Campaign Dispatch Engine
//!
//! The orchestrator that turns a submitted campaign (template + recipient
//! list) into one provider send per recipient, with a per-recipient delivery
//! ledger, bounded-rate pacing, and campaign-level aggregation.
//!
//! External collaborators are injected as traits (see [`ports`]): the
//! recipient-list store, the messaging provider, the delivery ledger, and
//! the campaign store. In-memory implementations for tests and development
//! live in [`memory`].

pub mod aggregator;
pub mod engine;
pub mod memory;
pub mod pacer;
pub mod ports;

pub use aggregator::{CampaignAggregator, DeliveryStats};
pub use engine::{
    CampaignResult, CancelFlag, DispatchEngine, DispatchError, EngineConfig, FailedRecipient,
    SentRecipient, SubmitRequest,
};
pub use pacer::Pacer;
pub use ports::{
    CampaignStore, DeliveryLedger, MessageSender, RecipientResolver, ResolveError, SendError,
    TemplateStore,
};
