use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bazaar_commerce::cart::{AddToCart, Cart};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiJson, ApiResult};
use crate::extract::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product", put(set_quantity).delete(remove_item))
}

fn cart_body(cart: Cart) -> ApiResult<Json<Value>> {
    let subtotal = cart.subtotal()?;
    Ok(Json(json!({
        "success": true,
        "itemCount": cart.item_count(),
        "subtotal": subtotal,
        "data": cart,
    })))
}

async fn get_cart(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    cart_body(state.carts.get(&current.user.id).await?)
}

async fn add_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(input): ApiJson<AddToCart>,
) -> ApiResult<Json<Value>> {
    cart_body(state.carts.add_item(&current.user.id, input).await?)
}

#[derive(Debug, Deserialize)]
struct QuantityChange {
    quantity: i64,
}

/// A quantity of zero or less removes the line.
async fn set_quantity(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(product): Path<String>,
    ApiJson(input): ApiJson<QuantityChange>,
) -> ApiResult<Json<Value>> {
    cart_body(
        state
            .carts
            .set_quantity(&current.user.id, &product, input.quantity)
            .await?,
    )
}

async fn remove_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(product): Path<String>,
) -> ApiResult<Json<Value>> {
    cart_body(state.carts.remove_item(&current.user.id, &product).await?)
}

async fn clear_cart(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Json<Value>> {
    cart_body(state.carts.clear(&current.user.id).await?)
}
