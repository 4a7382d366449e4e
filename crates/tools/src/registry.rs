//! Name -> handler registry for the catalog tools.
//!
//! The table is built once in [`ToolRegistry::new`]. Every handler has the same
//! signature and turns every failure (bad arguments, transport, API error)
//! into an error envelope.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::client::{ApiClient, CreateProductArgs, UpdateStockArgs};
use crate::envelope::ToolEnvelope;

pub type ToolHandler = for<'a> fn(&'a ApiClient, JsonValue) -> BoxFuture<'a, ToolEnvelope>;

#[derive(Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: ToolHandler,
}

impl core::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductIdArgs {
    product_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStockToolArgs {
    product_id: String,
    #[serde(flatten)]
    movement: UpdateStockArgs,
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_products",
        description: "List all active products.",
        handler: list_products,
    },
    ToolSpec {
        name: "get_product",
        description: "Get one active product. Args: {productId}.",
        handler: get_product,
    },
    ToolSpec {
        name: "list_low_stock_products",
        description: "List active products at or below their reorder level, with shortfall.",
        handler: list_low_stock_products,
    },
    ToolSpec {
        name: "create_product",
        description: "Create a product. Args: {name, description?, sku, price, initialStock?, reorderLevel?}.",
        handler: create_product,
    },
    ToolSpec {
        name: "update_stock",
        description: "Apply a stock movement. Args: {productId, movementType (StockIn|StockOut|Adjustment or 1|2|3), quantity, notes?}.",
        handler: update_stock,
    },
    ToolSpec {
        name: "get_stock_movements",
        description: "List a product's stock movements, newest first. Args: {productId}.",
        handler: get_stock_movements,
    },
    ToolSpec {
        name: "check_api_health",
        description: "Check that the catalog API is reachable and healthy.",
        handler: check_api_health,
    },
];

#[derive(Debug)]
pub struct ToolRegistry {
    client: ApiClient,
    tools: BTreeMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    pub fn new(client: ApiClient) -> Self {
        let tools = TOOLS.iter().map(|spec| (spec.name, *spec)).collect();
        Self { client, tools }
    }

    /// Registered tools in name order.
    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    /// Run a tool. Unknown names produce an error envelope.
    #[instrument(skip(self, args))]
    pub async fn call(&self, name: &str, args: JsonValue) -> ToolEnvelope {
        let Some(spec) = self.tools.get(name) else {
            return ToolEnvelope::err(format!("unknown tool '{name}'"));
        };
        let envelope = (spec.handler)(&self.client, args).await;
        debug!(success = envelope.success, "tool finished");
        envelope
    }
}

/// Tools without parameters accept `null` or `{}`.
fn parse_args<T: DeserializeOwned>(tool: &str, args: JsonValue) -> Result<T, ToolEnvelope> {
    let args = if args.is_null() {
        JsonValue::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ToolEnvelope::err(format!("invalid arguments for {tool}: {e}")))
}

fn list_products(client: &ApiClient, _args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move { ToolEnvelope::from(client.list_products().await) })
}

fn get_product(client: &ApiClient, args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move {
        match parse_args::<ProductIdArgs>("get_product", args) {
            Ok(a) => ToolEnvelope::from(client.get_product(&a.product_id).await),
            Err(envelope) => envelope,
        }
    })
}

fn list_low_stock_products(client: &ApiClient, _args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move { ToolEnvelope::from(client.list_low_stock().await) })
}

fn create_product(client: &ApiClient, args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move {
        match parse_args::<CreateProductArgs>("create_product", args) {
            Ok(a) => ToolEnvelope::from(client.create_product(&a).await),
            Err(envelope) => envelope,
        }
    })
}

fn update_stock(client: &ApiClient, args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move {
        match parse_args::<UpdateStockToolArgs>("update_stock", args) {
            Ok(a) => ToolEnvelope::from(client.update_stock(&a.product_id, &a.movement).await),
            Err(envelope) => envelope,
        }
    })
}

fn get_stock_movements(client: &ApiClient, args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move {
        match parse_args::<ProductIdArgs>("get_stock_movements", args) {
            Ok(a) => ToolEnvelope::from(client.get_stock_movements(&a.product_id).await),
            Err(envelope) => envelope,
        }
    })
}

fn check_api_health(client: &ApiClient, _args: JsonValue) -> BoxFuture<'_, ToolEnvelope> {
    Box::pin(async move { ToolEnvelope::from(client.check_health().await) })
}
