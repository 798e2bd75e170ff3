use super::item_type::ItemType;

/// Parameters for [`PurchaseClient::launch_purchase`](crate::PurchaseClient::launch_purchase).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub(crate) sku: String,
    pub(crate) item_type: ItemType,
    pub(crate) payload: String,
    /// `None` defers to the client's global auto-consume flag.
    pub(crate) auto_consume: Option<bool>,
}

impl PurchaseRequest {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            item_type: ItemType::Inapp,
            payload: String::new(),
            auto_consume: None,
        }
    }

    pub fn item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn auto_consume(mut self, auto_consume: bool) -> Self {
        self.auto_consume = Some(auto_consume);
        self
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }
}
