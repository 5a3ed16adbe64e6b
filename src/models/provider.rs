//! Provider rows and their request payloads.

use serde::{Deserialize, Serialize};

use crate::validation::{
    is_valid_email, is_valid_phone, optional_text, present, required_text, FieldErrors,
    EMAIL_MAX_LEN, INVALID_EMAIL, INVALID_PHONE, LABEL_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN,
};

/// A transportation/service company owning service areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub language: String,
    pub currency: String,
}

/// Validated provider fields, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProvider {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub language: String,
    pub currency: String,
}

impl NewProvider {
    pub fn with_id(self, id: u64) -> Provider {
        Provider {
            id,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
            language: self.language,
            currency: self.currency,
        }
    }
}

/// Create/update request body. Every field is optional at the wire level
/// so missing fields are reported as validation errors, not parse errors.
///
/// `None` is an absent field, `Some(None)` an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub language: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub currency: Option<Option<String>>,
}

impl ProviderPayload {
    /// Fill absent fields from the stored row (PATCH semantics). Explicit
    /// nulls are kept so validation rejects them.
    pub fn or_existing(self, existing: &Provider) -> Self {
        let keep = |value: &String| Some(Some(value.clone()));
        Self {
            name: self.name.or_else(|| keep(&existing.name)),
            email: self.email.or_else(|| keep(&existing.email)),
            phone_number: self.phone_number.or_else(|| keep(&existing.phone_number)),
            language: self.language.or_else(|| keep(&existing.language)),
            currency: self.currency.or_else(|| keep(&existing.currency)),
        }
    }

    pub fn validate(self) -> Result<NewProvider, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required_text(&mut errors, "name", self.name, NAME_MAX_LEN);

        let email = required_text(&mut errors, "email", self.email, EMAIL_MAX_LEN)
            .filter(|email| {
                let ok = is_valid_email(email);
                if !ok {
                    errors.add("email", INVALID_EMAIL);
                }
                ok
            });

        let phone_number =
            required_text(&mut errors, "phone_number", self.phone_number, PHONE_MAX_LEN).filter(
                |phone| {
                    let ok = is_valid_phone(phone);
                    if !ok {
                        errors.add("phone_number", INVALID_PHONE);
                    }
                    ok
                },
            );

        let language = optional_text(&mut errors, "language", self.language, LABEL_MAX_LEN);
        let currency = optional_text(&mut errors, "currency", self.currency, LABEL_MAX_LEN);

        match (name, email, phone_number, language, currency) {
            (Some(name), Some(email), Some(phone_number), Some(language), Some(currency))
                if errors.is_empty() =>
            {
                Ok(NewProvider {
                    name,
                    email,
                    phone_number,
                    language,
                    currency,
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{BLANK, NULL, REQUIRED};

    fn text(value: &str) -> Option<Option<String>> {
        Some(Some(value.to_string()))
    }

    fn valid_payload() -> ProviderPayload {
        ProviderPayload {
            name: text("Uber"),
            email: text("example@example.com"),
            phone_number: text("18338738237"),
            language: text("English"),
            currency: text("Dollar"),
        }
    }

    #[test]
    fn test_valid_payload() {
        let provider = valid_payload().validate().unwrap().with_id(4);
        assert_eq!(provider.id, 4);
        assert_eq!(provider.name, "Uber");
        assert_eq!(provider.currency, "Dollar");
    }

    #[test]
    fn test_missing_email() {
        let payload = ProviderPayload {
            email: None,
            ..valid_payload()
        };
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.fields().count(), 1);
    }

    #[test]
    fn test_every_required_field_reported() {
        let errors = ProviderPayload::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["email", "name", "phone_number"]);
    }

    #[test]
    fn test_optional_labels_default_empty() {
        let payload = ProviderPayload {
            language: None,
            currency: None,
            ..valid_payload()
        };
        let provider = payload.validate().unwrap();
        assert_eq!(provider.language, "");
        assert_eq!(provider.currency, "");
    }

    #[test]
    fn test_bad_formats() {
        let payload = ProviderPayload {
            email: text("ABC"),
            phone_number: text("ABC"),
            ..valid_payload()
        };
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(&[INVALID_EMAIL.to_string()][..]));
        assert_eq!(
            errors.get("phone_number"),
            Some(&[INVALID_PHONE.to_string()][..])
        );
    }

    #[test]
    fn test_blank_name() {
        let payload = ProviderPayload {
            name: text(""),
            ..valid_payload()
        };
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.get("name"), Some(&[BLANK.to_string()][..]));
    }

    #[test]
    fn test_partial_update_keeps_stored_values() {
        let existing = valid_payload().validate().unwrap().with_id(1);
        let patch = ProviderPayload {
            currency: text("Euro"),
            ..ProviderPayload::default()
        };
        let updated = patch.or_existing(&existing).validate().unwrap().with_id(1);
        assert_eq!(updated.currency, "Euro");
        assert_eq!(updated.email, existing.email);
        assert_eq!(updated.name, existing.name);
    }

    #[test]
    fn test_partial_update_rejects_null() {
        let existing = valid_payload().validate().unwrap().with_id(1);
        let patch: ProviderPayload =
            serde_json::from_str(r#"{"email": null, "language": null}"#).unwrap();
        let errors = patch.or_existing(&existing).validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("language"), Some(&[NULL.to_string()][..]));
        assert_eq!(errors.fields().count(), 2);
    }
}
