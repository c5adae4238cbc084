pub mod mongo;

pub use mongo::{
    MongoCampaignStore, MongoDeliveryLedger, MongoRecipientResolver, MongoTemplateStore,
};
