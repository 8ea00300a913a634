//! Shopper identity passed explicitly into every cart and order operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user identifier, as issued by the auth gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anonymous cart token kept in the visitor's session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Fresh random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Who owns a cart: exactly one of an authenticated user or an anonymous session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ShopperId {
    User(UserId),
    Anonymous(SessionToken),
}

impl ShopperId {
    pub fn user(id: impl Into<String>) -> Self {
        ShopperId::User(UserId::new(id))
    }

    pub fn anonymous(token: impl Into<String>) -> Self {
        ShopperId::Anonymous(SessionToken::new(token))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, ShopperId::User(_))
    }
}

impl From<&Customer> for ShopperId {
    fn from(customer: &Customer) -> Self {
        ShopperId::User(customer.id.clone())
    }
}

/// An authenticated shopper (required for checkout and payment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: UserId,
    pub email: String,
}

impl Customer {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
        }
    }

    pub fn shopper_id(&self) -> ShopperId {
        ShopperId::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_customer_identity() {
        let customer = Customer::new("u-42", "asha@example.com");
        assert_eq!(customer.shopper_id(), ShopperId::user("u-42"));
        assert!(customer.shopper_id().is_authenticated());
        assert!(!ShopperId::anonymous("tok").is_authenticated());
    }
}
