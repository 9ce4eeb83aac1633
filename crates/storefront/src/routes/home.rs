//! Landing and home page route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::PageContext;
use crate::routes::products::{ProductView, catalogue};
use crate::state::AppState;

/// Number of products featured on the landing page.
const FEATURED_COUNT: usize = 4;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub page: PageContext,
    pub featured: Vec<ProductView>,
}

/// Signed-in home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub error: Option<String>,
}

/// Display the public landing page.
#[instrument(skip(state, session))]
pub async fn landing(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (mut featured, _) = catalogue(state.api()).await;
    featured.truncate(FEATURED_COUNT);

    LandingTemplate {
        page: PageContext::load(&session).await,
        featured,
    }
}

/// Display the product listing for a signed-in user.
#[instrument(skip(state, session, _auth))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_auth): RequireAuth,
) -> impl IntoResponse {
    let (products, error) = catalogue(state.api()).await;

    HomeTemplate {
        page: PageContext::load(&session).await,
        products,
        error,
    }
}
