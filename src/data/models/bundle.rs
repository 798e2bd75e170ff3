use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    constants::RESPONSE_CODE, domain::entities::response_code::ResponseCode,
    errors::BillingError,
};

/// String-keyed payload exchanged with the store: bound-service replies,
/// broadcast extras and the purchase screen's result data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(Map<String, Value>);

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: Bundle) {
        self.0.extend(other.0);
    }

    /// Decodes the bundle into one of the typed response models.
    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Result<T, BillingError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| BillingError::BadResponse(e.to_string()))
    }

    /// Reads `RESPONSE_CODE`. An absent code means OK; anything other than
    /// an integer is a bad response.
    pub fn response_code(&self) -> Result<ResponseCode, BillingError> {
        match self.0.get(RESPONSE_CODE) {
            None | Some(Value::Null) => {
                debug!("Bundle with null response code, assuming OK (known issue)");
                Ok(ResponseCode::Ok)
            }
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(ResponseCode::from_code)
                .ok_or_else(|| {
                    BillingError::BadResponse(format!("response code out of range: {n}"))
                }),
            Some(other) => Err(BillingError::BadResponse(format!(
                "unexpected type for bundle response code: {other}"
            ))),
        }
    }
}

impl From<Map<String, Value>> for Bundle {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
