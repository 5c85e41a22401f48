//! Validated identity and contact values shared by participants and companies.
//!
//! Each value normalises its input (trim, case fold) before matching so the
//! stored form is canonical. Uniqueness checks in the registry compare these
//! canonical forms.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Validation failures for contact values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactValidationError {
    /// The email address does not look like `local@domain.tld`.
    #[error("email address {0:?} is not valid")]
    InvalidEmail(String),
    /// The CURP does not match the national population registry format.
    #[error("CURP {0:?} is not valid")]
    InvalidCurp(String),
    /// The RFC does not match the federal taxpayer registry format.
    #[error("RFC {0:?} is not valid")]
    InvalidTaxId(String),
    /// The municipality is not one of the supported municipalities.
    #[error("municipality {0:?} is not supported")]
    UnknownMunicipality(String),
}

/// Municipalities of Durango accepted for company addresses.
pub const MUNICIPALITIES: [&str; 39] = [
    "Canatlán",
    "Canelas",
    "Coneto de Comonfort",
    "Cuencamé",
    "Durango",
    "General Simón Bolívar",
    "Gómez Palacio",
    "Guadalupe Victoria",
    "Guanaceví",
    "Hidalgo",
    "Indé",
    "Lerdo",
    "Mapimí",
    "Mezquital",
    "Nazas",
    "Nombre de Dios",
    "Ocampo",
    "El Oro",
    "Otáez",
    "Pánuco de Coronado",
    "Peñón Blanco",
    "Poanas",
    "Pueblo Nuevo",
    "Rodeo",
    "San Bernardo",
    "San Dimas",
    "San Juan de Guadalupe",
    "San Juan del Río",
    "San Luis del Cordero",
    "San Pedro del Gallo",
    "Santa Clara",
    "Santiago Papasquiaro",
    "Súchil",
    "Tamazula",
    "Tepehuanes",
    "Tlahualilo",
    "Topia",
    "Vicente Guerrero",
    "Nuevo Ideal",
];

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static CURP_RE: OnceLock<Regex> = OnceLock::new();
static TAX_ID_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("contact regex {pattern} failed to compile: {error}"))
    })
}

macro_rules! string_value {
    ($name:ident) => {
        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ContactValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

/// Lower-cased email address.
///
/// # Examples
/// ```
/// use training_backend::domain::EmailAddress;
///
/// let email = EmailAddress::new(" Ana.Lopez@Example.MX ").unwrap();
/// assert_eq!(email.as_ref(), "ana.lopez@example.mx");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, format = Email)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an email address.
    pub fn new(raw: impl Into<String>) -> Result<Self, ContactValidationError> {
        let normalised = raw.into().trim().to_lowercase();
        let re = compiled(&EMAIL_RE, r"^[\w.+-]+@([\w-]+\.)+[\w-]{2,}$");
        if re.is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(ContactValidationError::InvalidEmail(normalised))
        }
    }
}

string_value!(EmailAddress);

/// Clave Única de Registro de Población, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "LOAA900101HDGPNN09")]
pub struct Curp(String);

impl Curp {
    /// Validate and normalise a CURP.
    pub fn new(raw: impl Into<String>) -> Result<Self, ContactValidationError> {
        let normalised = raw.into().trim().to_uppercase();
        let re = compiled(&CURP_RE, "^[A-Z]{4}[0-9]{6}[HM][A-Z]{5}[0-9A-Z][0-9]$");
        if re.is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(ContactValidationError::InvalidCurp(normalised))
        }
    }
}

string_value!(Curp);

/// Registro Federal de Contribuyentes (company tax id), upper-cased.
///
/// # Examples
/// ```
/// use training_backend::domain::TaxId;
///
/// assert!(TaxId::new("abc010101ab1").is_ok());
/// assert!(TaxId::new("ABC01").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "ABC010101AB1")]
pub struct TaxId(String);

impl TaxId {
    /// Validate and normalise an RFC.
    pub fn new(raw: impl Into<String>) -> Result<Self, ContactValidationError> {
        let normalised = raw.into().trim().to_uppercase();
        let re = compiled(&TAX_ID_RE, "^[A-Z&Ñ]{3,4}[0-9]{6}[A-Z0-9]{3}$");
        if re.is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(ContactValidationError::InvalidTaxId(normalised))
        }
    }
}

string_value!(TaxId);

/// One of [`MUNICIPALITIES`], stored with its canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "Durango")]
pub struct Municipality(String);

impl Municipality {
    /// Match `raw` case-insensitively against the supported list.
    pub fn new(raw: impl Into<String>) -> Result<Self, ContactValidationError> {
        let raw = raw.into();
        let wanted = raw.trim().to_lowercase();
        MUNICIPALITIES
            .iter()
            .find(|name| name.to_lowercase() == wanted)
            .map(|name| Self((*name).to_owned()))
            .ok_or(ContactValidationError::UnknownMunicipality(raw))
    }
}

string_value!(Municipality);
