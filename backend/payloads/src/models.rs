use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Petitioner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Petitioner => "petitioner",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a petition. Transitions only ever go `Open -> Closed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Open,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Status::Open),
            "closed" => Ok(Status::Closed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "petitioner" => Ok(Role::Petitioner),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Claim set carried by a bearer token.
///
/// `iat` and `exp` are seconds since the unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

/// Owning petitioner as joined into petition listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetitionerView {
    pub id: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetitionView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub status: Status,
    /// `None` only when the owning user record no longer exists.
    pub petitioner: Option<PetitionerView>,
    pub signatures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl PetitionView {
    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }

    pub fn signed_by(&self, user_id: &str) -> bool {
        self.signatures.iter().any(|id| id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("open".parse::<Status>(), Ok(Status::Open));
        assert_eq!("closed".parse::<Status>(), Ok(Status::Closed));
        assert!("Open".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_claims_wire_names() {
        let claims = Claims {
            user_id: "u1".to_string(),
            role: Role::Admin,
            iat: 1,
            exp: 2,
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_petition_view_omits_missing_response() {
        let view = PetitionView {
            id: "p1".to_string(),
            title: "Parks".to_string(),
            text: "More parks".to_string(),
            status: Status::Open,
            petitioner: None,
            signatures: vec!["u1".to_string()],
            response: None,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("response").is_none());
        assert_eq!(json["status"], "open");
        assert!(view.signed_by("u1"));
        assert!(!view.signed_by("u2"));
    }
}
