use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;

use super::{Email, UserId, ValidationError};

/// Minimum age to open an account.
pub const MIN_REGISTRATION_AGE: i32 = 18;

const MAX_NAME_LEN: usize = 30;

/// Library account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration form as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub password: String,
    pub confirm_password: String,
}

/// Registration that passed every field rule except email uniqueness,
/// which needs the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub password: String,
}

/// Age in whole years on `today`, adjusted for whether the birthday has
/// already passed this year.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let birthday_pending =
        (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day());
    today.year() - date_of_birth.year() - i32::from(birthday_pending)
}

fn validate_name(field: &'static str, label: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            field,
            format!("{label} cannot be empty."),
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            field,
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        ));
    }
    Ok(trimmed.to_string())
}

/// Checks the registration field rules in order: names, age, passwords, email shape.
pub fn validate_registration(
    registration: Registration,
    today: NaiveDate,
) -> Result<ValidRegistration, ValidationError> {
    let first_name = validate_name("first_name", "First name", &registration.first_name)?;
    let last_name = validate_name("last_name", "Last name", &registration.last_name)?;

    if age_on(registration.date_of_birth, today) < MIN_REGISTRATION_AGE {
        return Err(ValidationError::new(
            "date_of_birth",
            "You must be at least 18 years old to register.",
        ));
    }

    if registration.password.is_empty() {
        return Err(ValidationError::new(
            "password",
            "This field may not be blank.",
        ));
    }

    if registration.password != registration.confirm_password {
        return Err(ValidationError::new("password", "Passwords do not match."));
    }

    let email = Email::parse(&registration.email)
        .map_err(|e| ValidationError::new("email", e.to_string()))?;

    Ok(ValidRegistration {
        email,
        first_name,
        last_name,
        date_of_birth: registration.date_of_birth,
        password: registration.password,
    })
}
