//! Delivery addresses.

use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, CommerceResult};

fn default_address_type() -> String {
    "home".to_string()
}

/// A delivery address as entered by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub landmark: String,
    #[serde(default)]
    pub alternate_phone: String,
    #[serde(default = "default_address_type")]
    pub address_type: String,
}

impl Address {
    /// Trim every field and require the deliverable ones.
    pub fn validate(&mut self) -> CommerceResult<()> {
        for field in [
            &mut self.name,
            &mut self.mobile,
            &mut self.address,
            &mut self.city,
            &mut self.state,
            &mut self.pincode,
            &mut self.locality,
            &mut self.landmark,
            &mut self.alternate_phone,
            &mut self.address_type,
        ] {
            *field = field.trim().to_string();
        }

        let required = [
            &self.name,
            &self.mobile,
            &self.address,
            &self.city,
            &self.state,
            &self.pincode,
        ];
        if required.iter().any(|f| f.is_empty()) {
            return Err(CommerceError::invalid("All address fields are required"));
        }
        if self.address_type.is_empty() {
            self.address_type = default_address_type();
        }
        Ok(())
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address.as_str()];
        if !self.locality.is_empty() {
            parts.push(&self.locality);
        }
        parts.push(&self.city);
        parts.push(&self.state);
        parts.push(&self.pincode);
        parts.join(", ")
    }
}

/// Validate a list of addresses in place.
pub fn validate_all(addresses: &mut [Address]) -> CommerceResult<()> {
    addresses.iter_mut().try_for_each(Address::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Address {
        serde_json::from_value(serde_json::json!({
            "name": "Asha Rao",
            "mobile": "9876543210",
            "address": "12 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560001"
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_and_one_line() {
        let mut address = home();
        address.validate().unwrap();
        assert_eq!(address.address_type, "home");
        assert_eq!(address.locality, "");
        assert_eq!(address.one_line(), "12 MG Road, Bengaluru, Karnataka, 560001");
    }

    #[test]
    fn test_missing_required_field() {
        let mut address = home();
        address.city = "  ".into();
        let err = address.validate().unwrap_err();
        assert_eq!(err.to_string(), "All address fields are required");
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(home()).unwrap();
        assert!(json.get("alternatePhone").is_some());
        assert_eq!(json["addressType"], "home");
    }
}
