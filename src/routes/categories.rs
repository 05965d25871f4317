use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{active_flag, message, required};
use crate::{
    db::{update::field_map, NewCategory, UpdateBuilder, CATEGORY},
    error::{write_failed, ApiError},
    routing::{Ctx, HandlerFuture},
};

pub fn list(ctx: Ctx) -> HandlerFuture {
    Box::pin(list_categories(ctx))
}

pub fn get(ctx: Ctx) -> HandlerFuture {
    Box::pin(get_category(ctx))
}

pub fn create(ctx: Ctx) -> HandlerFuture {
    Box::pin(create_category(ctx))
}

pub fn update(ctx: Ctx) -> HandlerFuture {
    Box::pin(update_category(ctx))
}

pub fn delete(ctx: Ctx) -> HandlerFuture {
    Box::pin(delete_category(ctx))
}

async fn list_categories(mut ctx: Ctx) -> Result<Response, ApiError> {
    let rows = ctx.conn().await?.list_categories().await?;
    Ok(Json(rows).into_response())
}

async fn get_category(mut ctx: Ctx) -> Result<Response, ApiError> {
    let id = ctx.id()?;
    match ctx.conn().await?.find_category(id).await? {
        Some(row) => Ok(Json(row).into_response()),
        None => Err(ApiError::not_found("Category not found")),
    }
}

#[instrument(skip(ctx), fields(user_id = ctx.user_id()))]
async fn create_category(mut ctx: Ctx) -> Result<Response, ApiError> {
    let fields = field_map(&ctx.json_body()?);
    let new = NewCategory {
        name: required(&fields, "name")?.to_string(),
        active: active_flag(&fields),
    };

    let id = ctx
        .conn()
        .await?
        .insert_category(&new)
        .await
        .map_err(|e| write_failed("creating category", e))?;

    info!(category_id = id, "category created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Category created successfully", "category_id": id })),
    )
        .into_response())
}

#[instrument(skip(ctx), fields(user_id = ctx.user_id()))]
async fn update_category(mut ctx: Ctx) -> Result<Response, ApiError> {
    let id = ctx.id()?;
    let fields = field_map(&ctx.json_body()?);
    let conn = ctx.conn().await?;

    if !conn.exists(&CATEGORY, id).await? {
        return Err(ApiError::not_found("Category not found"));
    }
    let update = UpdateBuilder::new(CATEGORY)
        .build(&fields, id)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    conn.apply_update(&update)
        .await
        .map_err(|e| write_failed("updating category", e))?;

    info!(category_id = id, columns = ?update.columns, "category updated");
    Ok(message(StatusCode::OK, "Category updated successfully"))
}

#[instrument(skip(ctx), fields(user_id = ctx.user_id()))]
async fn delete_category(mut ctx: Ctx) -> Result<Response, ApiError> {
    let id = ctx.id()?;
    let conn = ctx.conn().await?;

    if !conn.exists(&CATEGORY, id).await? {
        return Err(ApiError::not_found("Category not found"));
    }
    let products = conn.count_products_in_category(id).await?;
    if products > 0 {
        warn!(category_id = id, products, "category still has products");
        return Err(ApiError::Storage(
            "Cannot delete category with associated products".into(),
        ));
    }

    conn.delete_category(id)
        .await
        .map_err(|e| write_failed("deleting category", e))?;

    info!(category_id = id, "category deleted");
    Ok(message(StatusCode::OK, "Category deleted successfully"))
}
