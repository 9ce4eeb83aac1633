//! Product management route handlers.
//!
//! Every route here requires the `admin` role.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use samaan_kinam_core::{Price, ProductId, UserId};

use crate::api::ProductInput;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::routes::products::{ProductView, catalogue};
use crate::routes::{PageContext, api_failure, flash, read_photo};
use crate::services::auth::ValidationError;
use crate::state::AppState;

const PRODUCTS_PATH: &str = "/admin/products";

/// Product create/edit form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub quantity: String,
}

impl ProductForm {
    /// Check the form before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns the message to show next to the form.
    pub fn validate(&self) -> Result<ProductInput, String> {
        let name = self.name.trim();
        let description = self.description.trim();
        let category = self.category.trim();
        if name.is_empty() || description.is_empty() || category.is_empty() {
            return Err(ValidationError::MissingFields.to_string());
        }

        let price = Decimal::from_str(self.price.trim())
            .ok()
            .map(Price::new)
            .filter(Price::is_positive)
            .ok_or_else(|| "Please, enter a valid price.".to_string())?;
        let quantity = self
            .quantity
            .trim()
            .parse::<u32>()
            .map_err(|_| "Please, enter a valid quantity.".to_string())?;

        Ok(ProductInput {
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            category: category.to_owned(),
            quantity,
        })
    }
}

/// Unlock form data, for admins typing a user id.
#[derive(Debug, Deserialize)]
pub struct UnlockForm {
    #[serde(default)]
    pub user_id: String,
}

/// Product management page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Display the product management page.
#[instrument(skip(state, session, _admin))]
pub async fn products(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    let (products, error) = catalogue(state.api()).await;

    AdminProductsTemplate {
        page: PageContext::load(&session).await,
        products,
        error,
    }
}

/// Create a product.
#[instrument(skip(state, session, admin))]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Response {
    let product = match form.validate() {
        Ok(product) => product,
        Err(message) => {
            flash(&session, Flash::error(message)).await;
            return Redirect::to(PRODUCTS_PATH).into_response();
        }
    };

    match state.api().add_product(&admin.token, &product).await {
        Ok(()) => {
            info!(user_id = %admin.user.id, name = %product.name, "Product created");
            flash(&session, Flash::success("Product added.")).await;
            Redirect::to(PRODUCTS_PATH).into_response()
        }
        Err(e) => api_failure(&session, &e, "The product could not be added.", PRODUCTS_PATH).await,
    }
}

/// Edit a product.
#[instrument(skip(state, session, admin))]
pub async fn edit_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Response {
    let product = match form.validate() {
        Ok(product) => product,
        Err(message) => {
            flash(&session, Flash::error(message)).await;
            return Redirect::to(PRODUCTS_PATH).into_response();
        }
    };

    match state.api().edit_product(&admin.token, &id, &product).await {
        Ok(()) => {
            info!(user_id = %admin.user.id, product_id = %id, "Product updated");
            flash(&session, Flash::success("Product updated.")).await;
            Redirect::to(PRODUCTS_PATH).into_response()
        }
        Err(e) => {
            api_failure(&session, &e, "The product could not be updated.", PRODUCTS_PATH).await
        }
    }
}

/// Delete a product.
#[instrument(skip(state, session, admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Response {
    match state.api().delete_product(&admin.token, &id).await {
        Ok(()) => {
            info!(user_id = %admin.user.id, product_id = %id, "Product deleted");
            flash(&session, Flash::info("Product deleted.")).await;
            Redirect::to(PRODUCTS_PATH).into_response()
        }
        Err(e) => {
            api_failure(&session, &e, "The product could not be deleted.", PRODUCTS_PATH).await
        }
    }
}

/// Upload a product picture.
#[instrument(skip(state, session, admin, multipart))]
pub async fn upload_product_image(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_photo(&mut multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Some(upload) = upload else {
        flash(&session, Flash::error("Please, choose an image.")).await;
        return Ok(Redirect::to(PRODUCTS_PATH).into_response());
    };

    match state
        .api()
        .upload_product_image(&admin.token, &id, upload)
        .await
    {
        Ok(()) => {
            flash(&session, Flash::success("Product picture updated.")).await;
            Ok(Redirect::to(PRODUCTS_PATH).into_response())
        }
        Err(e) => Ok(api_failure(
            &session,
            &e,
            "The picture could not be uploaded.",
            PRODUCTS_PATH,
        )
        .await),
    }
}

async fn unlock(state: &AppState, session: &Session, token: &SecretString, id: &UserId) -> Response {
    match state.api().unlock_account(token, id).await {
        Ok(()) => {
            info!(user_id = %id, "Account unlocked");
            flash(session, Flash::success("Account unlocked.")).await;
            Redirect::to(PRODUCTS_PATH).into_response()
        }
        Err(e) => api_failure(session, &e, "The account could not be unlocked.", PRODUCTS_PATH).await,
    }
}

/// Unlock a locked user account.
#[instrument(skip(state, session, admin))]
pub async fn unlock_user(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Response {
    unlock(&state, &session, &admin.token, &id).await
}

/// Unlock a user account named in a form.
#[instrument(skip(state, session, admin))]
pub async fn unlock_user_form(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<UnlockForm>,
) -> Response {
    let id = form.user_id.trim();
    if id.is_empty() {
        flash(&session, Flash::error("Please, enter a user id.")).await;
        return Redirect::to(PRODUCTS_PATH).into_response();
    }
    unlock(&state, &session, &admin.token, &UserId::new(id)).await
}
