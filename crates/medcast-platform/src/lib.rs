//! MedCast Platform
//!
//! Infrastructure around the dispatch engine:
//! - Campaign and delivery persistence (MongoDB)
//! - Directory aggregates: templates, recipient lists, medical reps
//! - WhatsApp Cloud API message sender
//! - Engine port adapters backed by the repositories
//! - Campaign REST API
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities / MongoDB documents
//! - `repository` - Data access
//! - `api` - REST endpoints (where applicable)

// Aggregates
pub mod campaign;
pub mod delivery;
pub mod directory;

// Messaging provider
pub mod provider;

// Engine port adapters
pub mod adapters;

// Shared infrastructure
pub mod shared;

pub use shared::error::{PlatformError, Result};

pub use campaign::entity::Campaign;
pub use campaign::repository::CampaignRepository;
pub use delivery::entity::DeliveryRecord;
pub use delivery::repository::DeliveryRepository;
pub use directory::entity::{MedicalRep, RecipientList, Template};
pub use directory::repository::{MedicalRepRepository, RecipientListRepository, TemplateRepository};
pub use provider::whatsapp::WhatsAppSender;
