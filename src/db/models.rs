use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LedgerError;

/// Transaction type (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
        }
    }
}

impl FromStr for TransactionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(TransactionType::Buy),
            "SELL" | "S" => Ok(TransactionType::Sell),
            _ => Err(()),
        }
    }
}

/// Order kind used to execute the trade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

impl FromStr for OrderType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            _ => Err(()),
        }
    }
}

/// Lifecycle status of a recorded trade. Only fulfilled trades move positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Cancelled,
    Fulfilled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Cancelled => "CANCELLED",
            TransactionStatus::Fulfilled => "FULFILLED",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TransactionStatus::Pending),
            "CANCELLED" | "CANCELED" => Ok(TransactionStatus::Cancelled),
            "FULFILLED" => Ok(TransactionStatus::Fulfilled),
            _ => Err(()),
        }
    }
}

/// Tradable instrument. Managed outside the ledger; positions point to it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub created_at: DateTime<Utc>,
}

/// Named container of positions and transactions owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may change on a portfolio. `None` means "not supplied".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioUpdate {
    pub name: Option<String>,
}

/// A trade as submitted, before it has been applied and stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub portfolio_id: Uuid,
    pub asset_id: Uuid,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub quantity: Decimal,
    pub price: Decimal,
    pub transaction_date: DateTime<Utc>,
}

impl NewTransaction {
    /// Fulfilled market order, the common case for recorded history
    pub fn market(
        portfolio_id: Uuid,
        asset_id: Uuid,
        transaction_type: TransactionType,
        quantity: Decimal,
        price: Decimal,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            portfolio_id,
            asset_id,
            transaction_type,
            status: TransactionStatus::Fulfilled,
            order_type: OrderType::Market,
            limit_price: None,
            quantity,
            price,
            transaction_date,
        }
    }

    /// Execution value, fixed at record time
    pub fn value(&self) -> Result<Decimal, LedgerError> {
        self.quantity
            .checked_mul(self.price)
            .ok_or(LedgerError::Overflow("trade value"))
    }

    pub fn moves_position(&self) -> bool {
        self.status == TransactionStatus::Fulfilled
    }
}

/// Recorded trade event (buy or sell of an asset within a portfolio)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub asset_id: Uuid,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub quantity: Decimal,
    pub price: Decimal,
    pub value: Decimal,
    pub realized_pl: Option<Decimal>, // SELL only
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Rebuild the submitted form of this trade, e.g. for replaying history
    pub fn to_new(&self) -> NewTransaction {
        NewTransaction {
            portfolio_id: self.portfolio_id,
            asset_id: self.asset_id,
            transaction_type: self.transaction_type,
            status: self.status,
            order_type: self.order_type,
            limit_price: self.limit_price,
            quantity: self.quantity,
            price: self.price,
            transaction_date: self.transaction_date,
        }
    }
}

/// Partial transaction update. Only fields that are `Some` are applied.
///
/// The side of a trade is fixed once recorded and cannot be amended.
///
/// `limit_price` is doubly optional so a caller can clear it explicitly
/// (`Some(None)`) as opposed to leaving it untouched (`None`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub order_type: Option<OrderType>,
    pub limit_price: Option<Option<Decimal>>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub transaction_date: Option<DateTime<Utc>>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.order_type.is_none()
            && self.limit_price.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.transaction_date.is_none()
    }

    /// Apply the supplied fields on top of an existing trade
    pub fn apply_to(&self, base: &Transaction) -> NewTransaction {
        let mut merged = base.to_new();
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(order_type) = self.order_type {
            merged.order_type = order_type;
        }
        if let Some(limit_price) = self.limit_price {
            merged.limit_price = limit_price;
        }
        if let Some(quantity) = self.quantity {
            merged.quantity = quantity;
        }
        if let Some(price) = self.price {
            merged.price = price;
        }
        if let Some(transaction_date) = self.transaction_date {
            merged.transaction_date = transaction_date;
        }
        merged
    }
}

/// Current holding state for one (portfolio, asset) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: Option<Uuid>, // None until first persisted
    pub portfolio_id: Uuid,
    pub asset_id: Uuid,
    pub quantity: Decimal,
    pub average_purchase_price: Decimal,
    pub total_investment: Decimal,
}

impl Position {
    pub fn empty(portfolio_id: Uuid, asset_id: Uuid) -> Self {
        Self {
            id: None,
            portfolio_id,
            asset_id,
            quantity: Decimal::ZERO,
            average_purchase_price: Decimal::ZERO,
            total_investment: Decimal::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

/// Raw stored lot row for display. Several rows may share an asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionRow {
    pub position_id: Uuid,
    pub portfolio_id: Uuid,
    pub asset_id: Uuid,
    pub asset_name: Option<String>,
    pub quantity: Decimal,
    pub average_purchase_price: Option<Decimal>,
    pub total_investment: Decimal,
}

impl From<&Position> for PositionRow {
    fn from(position: &Position) -> Self {
        Self {
            position_id: position.id.unwrap_or_else(Uuid::nil),
            portfolio_id: position.portfolio_id,
            asset_id: position.asset_id,
            asset_name: None,
            quantity: position.quantity,
            average_purchase_price: position
                .is_open()
                .then_some(position.average_purchase_price),
            total_investment: position.total_investment,
        }
    }
}

/// Transaction with presentation names attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRow {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<String>,
}

impl From<Transaction> for TransactionRow {
    fn from(transaction: Transaction) -> Self {
        Self {
            transaction,
            portfolio_name: None,
            asset_name: None,
        }
    }
}
