use std::fmt;

use super::response_code::ResponseCode;

/// Outcome of a billing operation: a response code plus a readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    code: ResponseCode,
    message: String,
}

impl OperationResult {
    /// The message is suffixed with the code's description, e.g.
    /// `"Unable to buy item (response: 7:Item Already Owned)"`. An empty
    /// message yields the bare description.
    pub fn new(code: ResponseCode, message: impl AsRef<str>) -> Self {
        let message = message.as_ref().trim();
        let message = if message.is_empty() {
            code.description()
        } else {
            format!("{} (response: {})", message, code.description())
        };
        Self { code, message }
    }

    pub fn ok(message: impl AsRef<str>) -> Self {
        Self::new(ResponseCode::Ok, message)
    }

    pub fn code(&self) -> ResponseCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_success(&self) -> bool {
        self.code.is_ok()
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IabResult: {}", self.message)
    }
}
