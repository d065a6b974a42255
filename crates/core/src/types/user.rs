//! User records and delivery addresses.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::Uid;

/// A user document stored under `users/<uid>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: Uid,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Set once the user has saved a delivery address.
    pub location_status: bool,
}

impl UserRecord {
    /// Name to greet the user with: display name, then email local part, then uid.
    #[must_use]
    pub fn greeting_name(&self) -> String {
        if !self.display_name.trim().is_empty() {
            return self.display_name.clone();
        }
        Email::parse(&self.email).map_or_else(
            |_| self.uid.to_string(),
            |email| email.local_part().to_owned(),
        )
    }
}

/// Errors from validating an [`Address`] before saving it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The mobile number contains something other than digits, spaces, `+` or `-`.
    #[error("invalid mobile number: {0}")]
    InvalidPhone(String),
}

/// Delivery address as entered on the profile page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub mobile_number: String,
    pub backup_mobile_number: String,
    pub door_number: String,
    pub street: String,
    pub city: String,
    pub pincode: String,
    pub landmark: String,
}

impl Address {
    /// Check required fields. Landmark and backup number are optional.
    ///
    /// # Errors
    ///
    /// Returns the first missing or malformed field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("name", &self.name),
            ("mobile number", &self.mobile_number),
            ("door number", &self.door_number),
            ("street", &self.street),
            ("city", &self.city),
            ("pincode", &self.pincode),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(field));
            }
        }

        for phone in [&self.mobile_number, &self.backup_mobile_number] {
            if !phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-'))
            {
                return Err(AddressError::InvalidPhone(phone.clone()));
            }
        }
        Ok(())
    }

    /// Single-line form for order summaries.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![
            format!("{}, {}", self.door_number, self.street),
            self.city.clone(),
            self.pincode.clone(),
        ];
        if !self.landmark.trim().is_empty() {
            parts.push(format!("near {}", self.landmark));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            name: "Asha".to_string(),
            mobile_number: "+91 98765-43210".to_string(),
            door_number: "12B".to_string(),
            street: "Lake Road".to_string(),
            city: "Chennai".to_string(),
            pincode: "600001".to_string(),
            ..Address::default()
        }
    }

    #[test]
    fn test_validate_accepts_optional_fields_blank() {
        assert_eq!(address().validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_missing_field() {
        let mut addr = address();
        addr.city = "  ".to_string();
        assert_eq!(addr.validate(), Err(AddressError::MissingField("city")));
    }

    #[test]
    fn test_validate_rejects_letters_in_phone() {
        let mut addr = address();
        addr.backup_mobile_number = "call me".to_string();
        assert!(matches!(addr.validate(), Err(AddressError::InvalidPhone(_))));
    }

    #[test]
    fn test_user_record_tolerates_sparse_document() {
        let user: UserRecord = serde_json::from_value(serde_json::json!({ "uid": "u1" })).unwrap();
        assert!(!user.location_status);
        assert!(user.address.is_none());
        assert_eq!(user.greeting_name(), "u1");
    }

    #[test]
    fn test_greeting_name_falls_back_to_email() {
        let user = UserRecord {
            uid: Uid::new("u1"),
            email: "asha@example.com".to_string(),
            ..UserRecord::default()
        };
        assert_eq!(user.greeting_name(), "asha");
    }
}
