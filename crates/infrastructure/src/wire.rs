//! Backend wire shapes and their conversion into domain values.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tallyboard_core::{AppError, AppResult};
use tallyboard_domain::{
    Assignment, AssignmentId, Invoice, InvoiceStatus, LineItem, Permission, PermissionId, Role,
    RoleId, TransactionRecord, TransactionStatus, User, UserCountry, UserId, parse_occurred_at,
};

/// Identifier that the backend may send as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    /// Numeric primary key.
    Number(i64),
    /// String key such as a UUID.
    Text(String),
}

impl WireId {
    fn into_string(self) -> AppResult<String> {
        let value = match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.trim().to_owned(),
        };
        if value.is_empty() {
            return Err(AppError::Validation("identifier must not be empty".to_owned()));
        }
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderWire {
    id: WireId,
    status: String,
    #[serde(default)]
    amount: Decimal,
    #[serde(default, alias = "paid_at")]
    occurred_at: Option<String>,
    #[serde(default, alias = "customer_email")]
    customer_identifier: Option<String>,
    #[serde(default, alias = "items")]
    line_items: Vec<LineItemWire>,
}

#[derive(Debug, Deserialize)]
struct LineItemWire {
    #[serde(alias = "name")]
    product_name: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
    #[serde(default, alias = "price")]
    unit_price: Decimal,
}

fn default_quantity() -> u32 {
    1
}

impl OrderWire {
    pub fn into_domain(self) -> AppResult<TransactionRecord> {
        TransactionRecord::new(
            self.id.into_string()?,
            TransactionStatus::from_str(&self.status)?,
            self.amount,
            self.occurred_at.as_deref().and_then(parse_occurred_at),
            self.customer_identifier.unwrap_or_default(),
            self.line_items
                .into_iter()
                .map(|item| LineItem {
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceWire {
    id: WireId,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default, alias = "total")]
    amount: Decimal,
    #[serde(default, alias = "created_at")]
    issued_at: Option<String>,
    #[serde(default, alias = "customer_email")]
    customer_identifier: Option<String>,
}

impl InvoiceWire {
    pub fn into_domain(self) -> AppResult<Invoice> {
        let status = match InvoiceStatus::from_str(&self.status) {
            Ok(status) => status,
            Err(never) => match never {},
        };

        Ok(Invoice {
            id: self.id.into_string()?,
            number: self.number,
            status,
            amount: self.amount,
            issued_at: self.issued_at.as_deref().and_then(parse_occurred_at),
            customer_identifier: self.customer_identifier.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserCountryWire {
    country: String,
    #[serde(alias = "count", alias = "user_count")]
    users: u64,
}

impl UserCountryWire {
    pub fn into_domain(self) -> AppResult<UserCountry> {
        let country = self.country.trim();
        Ok(UserCountry {
            country: if country.is_empty() {
                "Unknown".to_owned()
            } else {
                country.to_owned()
            },
            users: self.users,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserWire {
    id: WireId,
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl UserWire {
    pub fn into_domain(self) -> AppResult<User> {
        Ok(User {
            id: UserId::new(self.id.into_string()?),
            username: self.username,
            email: self.email.unwrap_or_default(),
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleWire {
    id: WireId,
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    permission_ids: Vec<WireId>,
}

impl RoleWire {
    pub fn into_domain(self) -> AppResult<Role> {
        let permission_ids = self
            .permission_ids
            .into_iter()
            .map(|id| id.into_string().map(PermissionId::new))
            .collect::<AppResult<_>>()?;
        let display_name = self
            .display_name
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.name.clone());

        Ok(Role {
            id: RoleId::new(self.id.into_string()?),
            name: self.name,
            display_name,
            description: self.description.unwrap_or_default(),
            permission_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PermissionWire {
    id: WireId,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    resource: Option<String>,
}

impl PermissionWire {
    pub fn into_domain(self) -> AppResult<Permission> {
        Ok(Permission {
            id: PermissionId::new(self.id.into_string()?),
            name: self.name,
            description: self.description.unwrap_or_default(),
            resource: self.resource,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignmentWire {
    id: WireId,
    user_id: WireId,
    role_id: WireId,
}

impl AssignmentWire {
    pub fn into_domain(self) -> AppResult<Assignment> {
        Ok(Assignment {
            id: AssignmentId::new(self.id.into_string()?),
            user_id: UserId::new(self.user_id.into_string()?),
            role_id: RoleId::new(self.role_id.into_string()?),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentRequest<'a> {
    pub user_id: &'a str,
    pub role_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RoleRequest<'a> {
    pub name: &'a str,
    pub display_name: &'a str,
    pub description: &'a str,
    pub permission_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct PermissionRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct BulkPermissionWireRequest<'a> {
    pub permission_ids: Vec<&'a str>,
    pub operation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<&'a str>,
}
