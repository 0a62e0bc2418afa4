//! Creation requests.

use serde::{Deserialize, Serialize};

/// Operator input for one barcode.
///
/// Missing form fields deserialize as empty strings; only the serial number
/// is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub serial_number: String,

    #[serde(default)]
    pub customer_name: String,

    #[serde(default)]
    pub customer_number: String,
}

impl CreateRequest {
    /// Create a request
    pub fn new(
        serial_number: impl Into<String>,
        customer_name: impl Into<String>,
        customer_number: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            customer_name: customer_name.into(),
            customer_number: customer_number.into(),
        }
    }

    /// Filename stem `"{serial} {name} {number}"`; the encoder adds the extension
    pub fn artifact_stem(&self) -> String {
        format!(
            "{} {} {}",
            self.serial_number, self.customer_name, self.customer_number
        )
    }
}
