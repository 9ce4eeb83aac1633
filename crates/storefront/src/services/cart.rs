//! Session-backed purchase cart.
//!
//! The cart lives in the visitor's session under `purchase_cart`. Names and
//! prices always come from the backend catalogue, never from the submitted
//! form.

use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use samaan_kinam_core::{Cart, CartError, CartLineItem, ProductId, Quantity};

use crate::api::{ApiClient, ApiError};
use crate::models::session_keys;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    #[error("catalogue lookup failed: {0}")]
    Api(#[from] ApiError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Load the visitor's cart (empty if none yet).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Cart>(session_keys::CART).await?;
    Ok(())
}

/// Add `quantity` units of a catalogue product.
///
/// # Errors
///
/// Returns an error if the product lookup fails, the quantity overflows, or
/// the session store fails.
#[instrument(skip(api, session), fields(product_id = %product_id))]
pub async fn add_product(
    api: &ApiClient,
    session: &Session,
    product_id: &ProductId,
    quantity: Quantity,
) -> Result<Cart, CartServiceError> {
    let product = api.get_product(product_id).await?;

    let mut cart = load(session).await?;
    cart.add(CartLineItem {
        product_id: product.id,
        name: product.name,
        unit_price: product.price,
        quantity,
    })?;
    save(session, &cart).await?;

    tracing::debug!(lines = cart.items().len(), total = %cart.total(), "Cart updated");
    Ok(cart)
}

/// Replace the quantity of a line already in the cart.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or the session store fails.
pub async fn update_quantity(
    session: &Session,
    product_id: &ProductId,
    quantity: Quantity,
) -> Result<Cart, CartServiceError> {
    let mut cart = load(session).await?;
    cart.set_quantity(product_id, quantity)?;
    save(session, &cart).await?;
    Ok(cart)
}

/// Remove a line from the cart.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or the session store fails.
pub async fn remove_product(
    session: &Session,
    product_id: &ProductId,
) -> Result<Cart, CartServiceError> {
    let mut cart = load(session).await?;
    cart.remove(product_id)?;
    save(session, &cart).await?;
    Ok(cart)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use samaan_kinam_core::Price;
    use tower_sessions::MemoryStore;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    async fn setup() -> (MockServer, ApiClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "p1", "name": "Tea", "price": 100
            })))
            .mount(&server)
            .await;
        let api = ApiClient::new(&BackendConfig {
            url: Url::parse(&server.uri()).unwrap(),
            accept_invalid_certs: false,
        })
        .unwrap();
        (server, api)
    }

    #[tokio::test]
    async fn test_new_session_has_empty_cart() {
        let cart = load(&session()).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_uses_catalogue_price() {
        let (_server, api) = setup().await;
        let session = session();

        add_product(&api, &session, &ProductId::new("p1"), Quantity::new(2).unwrap())
            .await
            .unwrap();
        let cart = add_product(&api, &session, &ProductId::new("p1"), Quantity::ONE)
            .await
            .unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), Price::from_rupees(300));
        assert_eq!(load(&session).await.unwrap(), cart);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let (_server, api) = setup().await;
        let session = session();
        let id = ProductId::new("p1");
        add_product(&api, &session, &id, Quantity::ONE).await.unwrap();

        let cart = update_quantity(&session, &id, Quantity::new(5).unwrap())
            .await
            .unwrap();
        assert_eq!(cart.total(), Price::from_rupees(500));

        let cart = remove_product(&session, &id).await.unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            remove_product(&session, &id).await,
            Err(CartServiceError::Cart(CartError::NotInCart(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_product_leaves_cart_unchanged() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/products/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let session = session();

        let result = add_product(&api, &session, &ProductId::new("missing"), Quantity::ONE).await;
        assert!(matches!(result, Err(CartServiceError::Api(_))));
        assert!(load(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let (_server, api) = setup().await;
        let session = session();
        add_product(&api, &session, &ProductId::new("p1"), Quantity::ONE)
            .await
            .unwrap();
        clear(&session).await.unwrap();
        assert!(load(&session).await.unwrap().is_empty());
    }
}
