use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{active_flag, integer, message, number, required};
use crate::{
    db::{update::field_map, FieldMap, NewProduct, UpdateBuilder, PRODUCT},
    error::{write_failed, ApiError},
    routing::{Ctx, HandlerFuture},
};

pub fn list(ctx: Ctx) -> HandlerFuture {
    Box::pin(list_products(ctx))
}

pub fn get(ctx: Ctx) -> HandlerFuture {
    Box::pin(get_product(ctx))
}

pub fn create(ctx: Ctx) -> HandlerFuture {
    Box::pin(create_product(ctx))
}

pub fn update(ctx: Ctx) -> HandlerFuture {
    Box::pin(update_product(ctx))
}

pub fn delete(ctx: Ctx) -> HandlerFuture {
    Box::pin(delete_product(ctx))
}

async fn list_products(mut ctx: Ctx) -> Result<Response, ApiError> {
    let rows = ctx.conn().await?.list_products().await?;
    Ok(Json(rows).into_response())
}

async fn get_product(mut ctx: Ctx) -> Result<Response, ApiError> {
    let id = ctx.id()?;
    match ctx.conn().await?.find_product(id).await? {
        Some(row) => Ok(Json(row).into_response()),
        None => Err(ApiError::not_found("Product not found")),
    }
}

/// Validates a create body. All required fields are checked for presence
/// before any of them is checked for type.
fn new_product(fields: &FieldMap) -> Result<NewProduct, ApiError> {
    let sku = required(fields, "sku")?;
    let name = required(fields, "name")?;
    let price = required(fields, "price")?;
    let stock = required(fields, "stock")?;

    // 0 and "" mean uncategorised
    let id_category = match fields.get("id_category") {
        Some(v) if !v.is_empty() => Some(integer("id_category", v)?),
        _ => None,
    };

    Ok(NewProduct {
        sku: sku.to_string(),
        active: active_flag(fields),
        id_category,
        name: name.to_string(),
        image: fields.get("image").map(ToString::to_string).unwrap_or_default(),
        description: fields
            .get("description")
            .map(ToString::to_string)
            .unwrap_or_default(),
        price: number("price", price)?,
        stock: integer("stock", stock)?,
    })
}

#[instrument(skip(ctx), fields(user_id = ctx.user_id()))]
async fn create_product(mut ctx: Ctx) -> Result<Response, ApiError> {
    let new = new_product(&field_map(&ctx.json_body()?))?;
    let conn = ctx.conn().await?;

    if conn.sku_taken(&new.sku, None).await? {
        warn!(sku = %new.sku, "duplicate sku");
        return Err(ApiError::validation("SKU already exists"));
    }

    let id = conn
        .insert_product(&new)
        .await
        .map_err(|e| write_failed("creating product", e))?;

    info!(product_id = id, sku = %new.sku, "product created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created successfully", "product_id": id })),
    )
        .into_response())
}

#[instrument(skip(ctx), fields(user_id = ctx.user_id()))]
async fn update_product(mut ctx: Ctx) -> Result<Response, ApiError> {
    let id = ctx.id()?;
    let fields = field_map(&ctx.json_body()?);
    let conn = ctx.conn().await?;

    if !conn.exists(&PRODUCT, id).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    let update = UpdateBuilder::new(PRODUCT)
        .build(&fields, id)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    if let Some(sku) = fields.get("sku") {
        if conn.sku_taken(&sku.to_string(), Some(id)).await? {
            warn!(product_id = id, sku = %sku, "duplicate sku");
            return Err(ApiError::validation("SKU already exists"));
        }
    }

    conn.apply_update(&update)
        .await
        .map_err(|e| write_failed("updating product", e))?;

    info!(product_id = id, columns = ?update.columns, "product updated");
    Ok(message(StatusCode::OK, "Product updated successfully"))
}

#[instrument(skip(ctx), fields(user_id = ctx.user_id()))]
async fn delete_product(mut ctx: Ctx) -> Result<Response, ApiError> {
    let id = ctx.id()?;
    let conn = ctx.conn().await?;

    if !conn.exists(&PRODUCT, id).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    conn.delete_product(id)
        .await
        .map_err(|e| write_failed("deleting product", e))?;

    info!(product_id = id, "product deleted");
    Ok(message(StatusCode::OK, "Product deleted successfully"))
}
