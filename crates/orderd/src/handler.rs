//! Command handler for the RESP server

use std::sync::Arc;

use ordercache::CacheService;
use tracing::{debug, error, info, warn};

use crate::models::Order;
use crate::repository::OrderRepository;
use crate::resp::RespValue;

pub type OrderService = CacheService<String, Order, OrderRepository>;

#[derive(Clone)]
pub struct CommandHandler {
    service: Arc<OrderService>,
}

fn arg_string(value: &RespValue) -> Option<String> {
    match value {
        RespValue::BulkString(Some(bytes)) => String::from_utf8(bytes.clone()).ok(),
        RespValue::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

fn wrong_arity(command: &str) -> RespValue {
    RespValue::error(format!("wrong number of arguments for '{}' command", command))
}

/// Commands that may read or append the data file
fn touches_store(cmd: &RespValue) -> bool {
    let RespValue::Array(Some(args)) = cmd else {
        return false;
    };
    args.first().and_then(arg_string).is_some_and(|name| {
        ["GET", "INGEST", "ORDERS"]
            .iter()
            .any(|store_cmd| name.eq_ignore_ascii_case(store_cmd))
    })
}

impl CommandHandler {
    pub fn new(service: Arc<OrderService>) -> Self {
        Self { service }
    }

    /// Handle a command from async code
    ///
    /// Commands that do file I/O run on the blocking thread pool.
    pub async fn dispatch(&self, cmd: RespValue) -> RespValue {
        if !touches_store(&cmd) {
            return self.handle(cmd);
        }

        let handler = self.clone();
        match tokio::task::spawn_blocking(move || handler.handle(cmd)).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Command task failed");
                RespValue::error("internal error")
            }
        }
    }

    pub fn handle(&self, cmd: RespValue) -> RespValue {
        let args = match cmd {
            RespValue::Array(Some(args)) if !args.is_empty() => args,
            _ => return RespValue::error("invalid command format"),
        };

        let command = match arg_string(&args[0]) {
            Some(name) => name.to_uppercase(),
            None => return RespValue::error("invalid command"),
        };

        let args = &args[1..];
        match command.as_str() {
            "PING" => self.handle_ping(args),
            "ECHO" => self.handle_echo(args),
            "GET" => self.handle_get(args),
            "INGEST" => self.handle_ingest(args),
            "ORDERS" => self.handle_orders(args),
            "DBSIZE" => self.handle_dbsize(),
            "INFO" => self.handle_info(),
            // redis-cli sends COMMAND on connect
            "COMMAND" => RespValue::Array(Some(vec![])),
            _ => RespValue::error(format!("unknown command '{}'", command)),
        }
    }

    fn handle_ping(&self, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::SimpleString("PONG".to_string()),
            [message] => message.clone(),
            _ => wrong_arity("ping"),
        }
    }

    fn handle_echo(&self, args: &[RespValue]) -> RespValue {
        match args {
            [message] => message.clone(),
            _ => wrong_arity("echo"),
        }
    }

    fn handle_get(&self, args: &[RespValue]) -> RespValue {
        let [key] = args else {
            return wrong_arity("get");
        };
        let Some(order_uid) = arg_string(key) else {
            return RespValue::error("invalid key");
        };

        let order = match self.service.get(&order_uid) {
            Ok(order) => order,
            Err(e) if e.is_not_found() => {
                info!(order_uid = %order_uid, "Order not found");
                return RespValue::nil();
            }
            Err(e) => {
                error!(order_uid = %order_uid, error = %e, "Failed to get order");
                return RespValue::error(e);
            }
        };

        match serde_json::to_vec(&order) {
            Ok(json) => RespValue::bulk(json),
            Err(e) => {
                error!(order_uid = %order_uid, error = %e, "Failed to encode order");
                RespValue::error(e)
            }
        }
    }

    fn handle_ingest(&self, args: &[RespValue]) -> RespValue {
        let [RespValue::BulkString(Some(payload))] = args else {
            return wrong_arity("ingest");
        };

        let order: Order = match serde_json::from_slice(payload) {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Invalid order JSON");
                return RespValue::error(format!("invalid JSON: {}", e));
            }
        };

        if let Err(e) = order.validate() {
            warn!(order_uid = %order.order_uid, error = %e, "Order validation failed");
            return RespValue::error(format!("validation failed: {}", e));
        }

        match self.service.create(&order) {
            Ok(()) => {
                info!(order_uid = %order.order_uid, "Created order");
                RespValue::ok()
            }
            Err(e) => {
                error!(order_uid = %order.order_uid, error = %e, "Failed to save order");
                RespValue::error(e)
            }
        }
    }

    fn handle_orders(&self, args: &[RespValue]) -> RespValue {
        if !args.is_empty() {
            return wrong_arity("orders");
        }

        let orders = match self.service.get_all() {
            Ok(orders) => orders,
            Err(e) => {
                error!(error = %e, "Failed to list orders");
                return RespValue::error(e);
            }
        };

        debug!(count = orders.len(), "Listing orders");
        let mut items = Vec::with_capacity(orders.len());
        for order in &orders {
            match serde_json::to_vec(order) {
                Ok(json) => items.push(RespValue::bulk(json)),
                Err(e) => return RespValue::error(e),
            }
        }
        RespValue::Array(Some(items))
    }

    fn handle_dbsize(&self) -> RespValue {
        RespValue::Integer(self.service.store().count() as i64)
    }

    fn handle_info(&self) -> RespValue {
        let cache = self.service.cache();
        let stats = cache.stats().snapshot();
        let info = format!(
            "# Server\r\n\
             orderd_version:{}\r\n\
             \r\n\
             # Stats\r\n\
             total_orders:{}\r\n\
             cache_warm:{}\r\n\
             cache_size:{}\r\n\
             cache_capacity:{}\r\n\
             cache_hits:{}\r\n\
             cache_misses:{}\r\n\
             cache_inserts:{}\r\n\
             cache_evictions:{}\r\n\
             cache_hit_ratio:{:.2}\r\n",
            env!("CARGO_PKG_VERSION"),
            self.service.store().count(),
            u8::from(self.service.is_warm()),
            cache.len(),
            cache.capacity(),
            stats.hits,
            stats.misses,
            stats.inserts,
            stats.evictions,
            stats.hit_ratio(),
        );
        RespValue::bulk(info)
    }
}
