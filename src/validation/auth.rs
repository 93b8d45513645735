use std::collections::BTreeMap;
use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field name → user-facing message.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

/// The `POST /login` body exactly as submitted.
///
/// Everything is optional so that decoding never fails on a missing field;
/// `AuthForm::parse` decides what is required.
#[derive(Deserialize, Debug, Default)]
pub struct RawAuthForm {
    #[serde(rename = "_action")]
    pub action: Option<String>,
    #[serde(rename = "_formType")]
    pub form_type: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Login credentials.
#[derive(Validate, Debug, Clone)]
pub struct LoginForm {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
}

/// Signup details.
#[derive(Validate, Debug, Clone)]
pub struct SignupForm {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[garde(length(min = 1, max = 100))]
    pub first_name: String,
    #[garde(length(min = 1, max = 100))]
    pub last_name: String,
}

/// A decoded `POST /login` body.
#[derive(Debug, Clone)]
pub enum AuthForm {
    Login(LoginForm),
    Signup(SignupForm),
}

/// The body could not be decoded into a known form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid Form Data")]
pub struct MalformedRequest {
    /// The submitted action, when one was present.
    pub form: Option<String>,
}

/// The values echoed back to the form after a failed submission. Never the password.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EchoFields {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl AuthForm {
    /// Decodes the raw body. `_action` wins over `_formType` when both are sent.
    pub fn parse(raw: RawAuthForm) -> Result<Self, MalformedRequest> {
        let action = raw.action.or(raw.form_type);

        let (Some(email), Some(password)) = (raw.email, raw.password) else {
            return Err(MalformedRequest { form: action });
        };

        match action.as_deref() {
            Some("login") => Ok(AuthForm::Login(LoginForm { email, password })),
            Some("signup") => Ok(AuthForm::Signup(SignupForm {
                email,
                password,
                first_name: raw.first_name.unwrap_or_default().trim().to_string(),
                last_name: raw.last_name.unwrap_or_default().trim().to_string(),
            })),
            _ => Err(MalformedRequest { form: action }),
        }
    }

    /// The action name, as the form submits it.
    pub fn action(&self) -> &'static str {
        match self {
            AuthForm::Login(_) => "login",
            AuthForm::Signup(_) => "signup",
        }
    }

    pub fn email(&self) -> &str {
        match self {
            AuthForm::Login(form) => &form.email,
            AuthForm::Signup(form) => &form.email,
        }
    }

    pub fn echo(&self) -> EchoFields {
        match self {
            AuthForm::Login(form) => EchoFields {
                email: form.email.clone(),
                ..Default::default()
            },
            AuthForm::Signup(form) => EchoFields {
                email: form.email.clone(),
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
            },
        }
    }

    /// Runs field validation; an empty map means the form is valid.
    pub fn field_errors(&self) -> FieldErrors {
        let report = match self {
            AuthForm::Login(form) => form.validate(),
            AuthForm::Signup(form) => form.validate(),
        };

        match report {
            Ok(()) => FieldErrors::new(),
            Err(report) => report
                .iter()
                .filter_map(|(path, _)| field_message(&path.to_string()))
                .collect(),
        }
    }
}

fn field_message(field: &str) -> Option<(&'static str, &'static str)> {
    match field {
        "email" => Some(("email", "Please enter a valid email address")),
        "password" => Some(("password", "Passwords must be between 8 and 128 characters")),
        "first_name" => Some(("firstName", "Please enter a value")),
        "last_name" => Some(("lastName", "Please enter a value")),
        _ => None,
    }
}
