pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod billing_transport;
        pub(crate) mod bound_service_transport;
        pub(crate) mod broadcast_registry;
        pub(crate) mod broadcast_transport;
        pub(crate) mod purchase_flow;
    }
    pub(crate) mod models {
        pub(crate) mod bundle;
        pub(crate) mod purchase_data_model;
        pub(crate) mod sku_details_model;
        pub(crate) mod store_message;
        pub(crate) mod store_response_models;
    }
    pub(crate) mod repositories {
        pub(crate) mod billing_repository_impl;
    }
}

pub mod domain {
    pub mod entities {
        pub mod activity_result;
        pub mod authorization_token;
        pub mod billing_status;
        pub mod inventory;
        pub mod item_type;
        pub mod operation_result;
        pub mod purchase_request;
        pub mod receipt;
        pub mod response_code;
        pub mod sku_details;
    }
    pub mod repositories {
        pub mod billing_repository;
    }
}

pub mod client;
pub mod config;
pub mod constants;
pub mod correlator;
pub mod errors;
pub mod host;
pub mod listener;
pub mod security;
mod util;

pub use client::{PurchaseClient, SetupPhase};
pub use config::{BillingConfig, StoreConfig};
pub use correlator::{CorrelatorError, ResponseCorrelator};
pub use data::{
    datasources::broadcast_registry::{BroadcastObserver, BroadcastRegistry, ObserverId},
    models::{
        bundle::Bundle,
        purchase_data_model::PurchaseState,
        store_message::{BroadcastAction, StoreMessage},
    },
    repositories::billing_repository_impl::BillingRepositoryImpl,
};
pub use domain::{
    entities::{
        activity_result::ActivityResult, authorization_token::AuthorizationToken,
        billing_status::BillingStatus, inventory::Inventory, item_type::ItemType,
        operation_result::OperationResult, purchase_request::PurchaseRequest, receipt::Receipt,
        response_code::ResponseCode, sku_details::SkuDetails,
    },
    repositories::billing_repository::{BillingRepository, PurchaseFinishedCallback},
};
pub use errors::BillingError;
pub use host::{BroadcastSender, Environment, HostBindings, PurchaseLauncher, StoreService};
pub use listener::{BillingEvent, BillingListener, ChannelListener};
pub use security::{ReceiptVerifier, RsaReceiptVerifier, SignatureAlgorithm};
