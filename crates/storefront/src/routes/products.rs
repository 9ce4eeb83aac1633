//! Product route handlers.
//!
//! Browsing is public; writing reviews needs a signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use samaan_kinam_core::{ProductId, ReviewId, UserId};

use crate::api::{ApiClient, ApiProduct, ApiReview, ReviewInput};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::{PageContext, api_failure, flash};
use crate::state::AppState;

/// Highest rating a review can give.
pub const MAX_RATING: u8 = 5;

const INVALID_REVIEW_MESSAGE: &str = "Please, give a rating from 1 to 5 and a comment.";
const REVIEW_FALLBACK_MESSAGE: &str = "The review could not be saved.";

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    /// Bare decimal amount, for edit forms.
    pub amount: String,
    pub category: Option<String>,
    pub stock: Option<u32>,
    pub picture_url: Option<String>,
}

impl ProductView {
    /// Build the view, resolving the picture against the backend's upload path.
    #[must_use]
    pub fn new(product: &ApiProduct, api: &ApiClient) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            amount: product.price.amount().normalize().to_string(),
            category: product.category.clone(),
            stock: product.stock,
            picture_url: product
                .picture
                .as_deref()
                .filter(|p| !p.is_empty())
                .and_then(|p| api.asset_url(&["product", p])),
        }
    }

    /// Out of stock only when the backend says so.
    #[must_use]
    pub fn sold_out(&self) -> bool {
        self.stock == Some(0)
    }
}

/// Review display data for templates.
#[derive(Clone)]
pub struct ReviewView {
    pub id: String,
    pub author: String,
    pub rating: u8,
    pub comment: String,
    pub date: Option<String>,
    /// The signed-in user wrote this review.
    pub own: bool,
}

impl ReviewView {
    fn new(review: ApiReview, viewer: Option<&UserId>) -> Self {
        let own = matches!((review.user.as_ref(), viewer), (Some(a), Some(b)) if a == b);
        Self {
            id: review.id.to_string(),
            author: review.name.unwrap_or_else(|| "Anonymous".to_string()),
            rating: review.rating.unwrap_or(0).min(MAX_RATING),
            comment: review.comment,
            date: review
                .created_at
                .map(|at| at.format("%Y-%m-%d").to_string()),
            own,
        }
    }
}

/// Review form data.
///
/// The rating is kept as submitted so a bad value is reported like any
/// other invalid review.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub comment: String,
}

impl ReviewForm {
    fn validate(self) -> Option<ReviewInput> {
        let rating = self
            .rating
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|r| (1..=MAX_RATING).contains(r))?;
        let comment = self.comment.trim();
        if comment.is_empty() {
            return None;
        }
        Some(ReviewInput {
            rating,
            comment: comment.to_owned(),
        })
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductView,
    pub reviews: Vec<ReviewView>,
}

/// Fetch the catalogue as views, or the message to show instead.
pub async fn catalogue(api: &ApiClient) -> (Vec<ProductView>, Option<String>) {
    match api.get_all_products().await {
        Ok(products) => (
            products.iter().map(|p| ProductView::new(p, api)).collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch products");
            (
                Vec::new(),
                Some(e.user_message("Products could not be loaded.")),
            )
        }
    }
}

/// Display product listing page.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (products, error) = catalogue(state.api()).await;

    ProductsIndexTemplate {
        page: PageContext::load(&session).await,
        title: "Products",
        products,
        error,
    }
}

/// Display product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    let product = state.api().get_product(&id).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound(format!("product {id}"))
        } else {
            AppError::Api(e)
        }
    })?;

    let page = PageContext::load(&session).await;
    let viewer = page.user.as_ref().map(|u| &u.id);

    let reviews = match state.api().get_reviews(&id).await {
        Ok(reviews) => reviews
            .into_iter()
            .map(|r| ReviewView::new(r, viewer))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch reviews");
            Vec::new()
        }
    };

    Ok(ProductShowTemplate {
        product: ProductView::new(&product, state.api()),
        reviews,
        page,
    }
    .into_response())
}

fn product_path(id: &ProductId) -> String {
    format!("/products/{id}")
}

/// Add a review.
#[instrument(skip(state, session, auth, form))]
pub async fn add_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<ProductId>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let back = product_path(&id);
    let Some(review) = form.validate() else {
        flash(&session, Flash::error(INVALID_REVIEW_MESSAGE)).await;
        return Redirect::to(&back).into_response();
    };

    match state.api().add_review(&auth.token, &id, &review).await {
        Ok(()) => {
            flash(&session, Flash::success("Thank you for your review!")).await;
            Redirect::to(&back).into_response()
        }
        Err(e) => api_failure(&session, &e, REVIEW_FALLBACK_MESSAGE, &back).await,
    }
}

/// Update one of the user's reviews.
#[instrument(skip(state, session, auth, form))]
pub async fn update_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path((id, review_id)): Path<(ProductId, ReviewId)>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let back = product_path(&id);
    let Some(review) = form.validate() else {
        flash(&session, Flash::error(INVALID_REVIEW_MESSAGE)).await;
        return Redirect::to(&back).into_response();
    };

    match state
        .api()
        .update_review(&auth.token, &id, &review_id, &review)
        .await
    {
        Ok(()) => {
            flash(&session, Flash::success("Review updated.")).await;
            Redirect::to(&back).into_response()
        }
        Err(e) => api_failure(&session, &e, REVIEW_FALLBACK_MESSAGE, &back).await,
    }
}

/// Delete one of the user's reviews.
#[instrument(skip(state, session, auth))]
pub async fn delete_review(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
    Path((id, review_id)): Path<(ProductId, ReviewId)>,
) -> Response {
    let back = product_path(&id);
    match state
        .api()
        .delete_review(&auth.token, &id, &review_id)
        .await
    {
        Ok(()) => {
            flash(&session, Flash::info("Review deleted.")).await;
            Redirect::to(&back).into_response()
        }
        Err(e) => api_failure(&session, &e, "The review could not be deleted.", &back).await,
    }
}
