//! Order repository: maps orders onto the record store as JSON

use std::fmt;

use ordercache::BackingStore;
use orderstore::OrderStore;

use crate::models::Order;

#[derive(Debug)]
pub enum RepositoryError {
    /// No order with that uid
    NotFound,

    /// Record store failure
    Store(orderstore::Error),

    /// Stored payload could not be encoded or decoded
    Codec(serde_json::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "order not found"),
            RepositoryError::Store(e) => write!(f, "store error: {}", e),
            RepositoryError::Codec(e) => write!(f, "codec error: {}", e),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::NotFound => None,
            RepositoryError::Store(e) => Some(e),
            RepositoryError::Codec(e) => Some(e),
        }
    }
}

impl From<orderstore::Error> for RepositoryError {
    fn from(err: orderstore::Error) -> Self {
        if err.is_not_found() {
            RepositoryError::NotFound
        } else {
            RepositoryError::Store(err)
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Codec(err)
    }
}

pub struct OrderRepository {
    store: OrderStore,
}

impl OrderRepository {
    pub fn new(store: OrderStore) -> Self {
        Self { store }
    }

    /// Number of stored orders
    pub fn count(&self) -> usize {
        self.store.len()
    }
}

impl BackingStore<String, Order> for OrderRepository {
    type Error = RepositoryError;

    fn fetch(&self, key: &String) -> Result<Order, RepositoryError> {
        let payload = self.store.get(key)?;
        Ok(serde_json::from_slice(&payload)?)
    }

    fn fetch_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.store
            .scan()?
            .into_iter()
            .map(|(_, payload)| serde_json::from_slice(&payload).map_err(RepositoryError::from))
            .collect()
    }

    fn store(&self, value: &Order) -> Result<(), RepositoryError> {
        // Compact JSON never contains a raw newline
        let payload = serde_json::to_vec(value)?;
        self.store.put(&value.order_uid, &payload)?;
        Ok(())
    }
}
