//! Participant identity accepted by the session engine.
//!
//! The engine is schema-agnostic: it only reads the identifier (for
//! one-play-per-person enforcement) and the display name (for the ranking).
//! [`RegistrationForm`] is the kiosk's current schema and produces a
//! [`PlayerIdentity`] once every field checks out.

use crate::error::{ErrorSeverity, GameError};

/// A validated participant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerIdentity {
    identifier: String,
    name: String,
    phone: String,
    email: Option<String>,
}

impl PlayerIdentity {
    /// Wraps already-validated fields.
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            phone: phone.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Registration field names, used in validation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Name,
    Phone,
    Email,
    Identifier,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(Field),

    #[error("identifier must be exactly {expected} digits")]
    InvalidIdentifier { expected: usize },

    #[error("phone must have between {min} and {max} digits")]
    InvalidPhone { min: usize, max: usize },
}

impl GameError for ValidationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "REGISTRATION_MISSING_FIELD",
            Self::InvalidIdentifier { .. } => "REGISTRATION_INVALID_IDENTIFIER",
            Self::InvalidPhone { .. } => "REGISTRATION_INVALID_PHONE",
        }
    }
}

/// Raw registration input as typed at the kiosk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub phone: String,
    /// Only present in the schema variant that collects email.
    pub email: Option<String>,
    pub identifier: String,
}

impl RegistrationForm {
    pub const IDENTIFIER_DIGITS: usize = 11;
    pub const PHONE_MIN_DIGITS: usize = 10;
    pub const PHONE_MAX_DIGITS: usize = 11;

    pub fn validate(&self) -> Result<PlayerIdentity, ValidationError> {
        let name = required(&self.name, Field::Name)?;
        let phone = required(&self.phone, Field::Phone)?;
        let identifier = required(&self.identifier, Field::Identifier)?;
        let email = match &self.email {
            Some(email) => Some(required(email, Field::Email)?),
            None => None,
        };

        if identifier.len() != Self::IDENTIFIER_DIGITS
            || !identifier.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ValidationError::InvalidIdentifier {
                expected: Self::IDENTIFIER_DIGITS,
            });
        }

        // Masked input arrives as "(51) 99999-0000"; keep the digits only.
        let phone_digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if !(Self::PHONE_MIN_DIGITS..=Self::PHONE_MAX_DIGITS).contains(&phone_digits.len()) {
            return Err(ValidationError::InvalidPhone {
                min: Self::PHONE_MIN_DIGITS,
                max: Self::PHONE_MAX_DIGITS,
            });
        }

        let identity = PlayerIdentity::new(identifier, name, phone_digits);
        Ok(match email {
            Some(email) => identity.with_email(email),
            None => identity,
        })
    }
}

fn required(value: &str, field: Field) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "  Ana Souza ".into(),
            phone: "(51) 99876-5432".into(),
            email: None,
            identifier: "12345678901".into(),
        }
    }

    #[test]
    fn valid_form_trims_and_normalizes() {
        let identity = form().validate().unwrap();
        assert_eq!(identity.name(), "Ana Souza");
        assert_eq!(identity.phone(), "51998765432");
        assert_eq!(identity.identifier(), "12345678901");
        assert_eq!(identity.email(), None);
    }

    #[test]
    fn every_field_is_required() {
        let mut missing_name = form();
        missing_name.name = "   ".into();
        assert_eq!(
            missing_name.validate(),
            Err(ValidationError::MissingField(Field::Name))
        );

        let mut missing_email = form();
        missing_email.email = Some(String::new());
        assert_eq!(
            missing_email.validate(),
            Err(ValidationError::MissingField(Field::Email))
        );
    }

    #[test]
    fn identifier_must_be_eleven_digits() {
        for bad in ["1234567890", "123456789012", "1234567890a"] {
            let mut candidate = form();
            candidate.identifier = bad.into();
            assert_eq!(
                candidate.validate(),
                Err(ValidationError::InvalidIdentifier { expected: 11 })
            );
        }
    }

    #[test]
    fn short_phone_is_rejected() {
        let mut candidate = form();
        candidate.phone = "99876".into();
        assert!(matches!(
            candidate.validate(),
            Err(ValidationError::InvalidPhone { .. })
        ));
    }

    #[test]
    fn email_schema_variant_is_carried_through() {
        let mut candidate = form();
        candidate.email = Some(" ana@example.com ".into());
        let identity = candidate.validate().unwrap();
        assert_eq!(identity.email(), Some("ana@example.com"));
    }
}
