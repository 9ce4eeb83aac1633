//! Catalogue, review, purchase, and admin product operations.

use reqwest::Method;
use samaan_kinam_core::{ProductId, PurchaseOrder, ReviewId};
use secrecy::SecretString;
use tracing::instrument;

use super::{ApiClient, ApiError, ApiProduct, ApiReview, ProductInput, ReviewInput};

impl ApiClient {
    /// List every product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn get_all_products(&self) -> Result<Vec<ApiProduct>, ApiError> {
        let request = self.request(Method::GET, &["products"])?;
        Self::send_json(request).await
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<ApiProduct, ApiError> {
        let request = self.request(Method::GET, &["products", id.as_str()])?;
        Self::send_json(request).await
    }

    /// List the reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_reviews(&self, id: &ProductId) -> Result<Vec<ApiReview>, ApiError> {
        let request = self.request(Method::GET, &["products", "reviews", id.as_str()])?;
        Self::send_json(request).await
    }

    /// Post a review.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token, review), fields(product_id = %product_id))]
    pub async fn add_review(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        review: &ReviewInput,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(
                Method::POST,
                &["products", "reviews", product_id.as_str()],
                token,
            )?
            .json(review);
        Self::send_unit(request).await
    }

    /// Delete a review.
    ///
    /// The backend mounts review mutation at the root, not under `/products`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token), fields(product_id = %product_id, review_id = %review_id))]
    pub async fn delete_review(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        review_id: &ReviewId,
    ) -> Result<(), ApiError> {
        let request = self.authorized(
            Method::DELETE,
            &[product_id.as_str(), review_id.as_str()],
            token,
        )?;
        Self::send_unit(request).await
    }

    /// Update a review.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token, review), fields(product_id = %product_id, review_id = %review_id))]
    pub async fn update_review(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        review_id: &ReviewId,
        review: &ReviewInput,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(
                Method::PUT,
                &[product_id.as_str(), review_id.as_str()],
                token,
            )?
            .json(review);
        Self::send_unit(request).await
    }

    /// Record a purchase.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the order.
    #[instrument(skip_all, fields(lines = order.items.len(), payment = ?order.payment))]
    pub async fn purchase(
        &self,
        token: &SecretString,
        order: &PurchaseOrder,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::POST, &["purchase"], token)?
            .json(order);
        Self::send_unit(request).await
    }

    /// Create a product (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip_all, fields(name = %product.name))]
    pub async fn add_product(
        &self,
        token: &SecretString,
        product: &ProductInput,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::POST, &["admin", "product"], token)?
            .json(product);
        Self::send_unit(request).await
    }

    /// Replace a product's details (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token, product), fields(product_id = %id))]
    pub async fn edit_product(
        &self,
        token: &SecretString,
        id: &ProductId,
        product: &ProductInput,
    ) -> Result<(), ApiError> {
        let request = self
            .authorized(Method::PUT, &["admin", "product", id.as_str()], token)?
            .json(product);
        Self::send_unit(request).await
    }

    /// Delete a product (admin).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects it.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &SecretString, id: &ProductId) -> Result<(), ApiError> {
        let request = self.authorized(Method::DELETE, &["admin", "product", id.as_str()], token)?;
        Self::send_unit(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use samaan_kinam_core::{Cart, CartLineItem, Price, Quantity};
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;

    async fn setup() -> (MockServer, ApiClient) {
        let server = MockServer::start().await;
        let client = ApiClient::new(&BackendConfig {
            url: Url::parse(&server.uri()).unwrap(),
            accept_invalid_certs: false,
        })
        .unwrap();
        (server, client)
    }

    fn token() -> SecretString {
        SecretString::from("tok")
    }

    #[tokio::test]
    async fn test_get_all_products() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"_id": "p1", "name": "Tea", "price": 100},
                {"_id": "p2", "name": "Honey", "price": 50, "category": "food"}
            ])))
            .mount(&server)
            .await;

        let products = client.get_all_products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products.get(1).unwrap().category.as_deref(), Some("food"));
    }

    #[tokio::test]
    async fn test_get_product_not_found() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/products/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "Not found"})),
            )
            .mount(&server)
            .await;

        let err = client
            .get_product(&ProductId::new("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_review_mutations_use_root_paths() {
        let (server, client) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/p1/r1"))
            .and(body_json(serde_json::json!({"rating": 4, "comment": "Good"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/p1/r1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let product = ProductId::new("p1");
        let review = ReviewId::new("r1");
        client
            .update_review(
                &token(),
                &product,
                &review,
                &ReviewInput {
                    rating: 4,
                    comment: "Good".to_string(),
                },
            )
            .await
            .unwrap();
        client
            .delete_review(&token(), &product, &review)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_purchase_sends_order() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/purchase"))
            .and(header("authorization", "bearer tok"))
            .and(body_json(serde_json::json!({
                "items": [{"id": "p1", "name": "Tea", "price": 100.0, "quantity": 2}],
                "payment": "success"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let cart = Cart::from_items(vec![CartLineItem {
            product_id: ProductId::new("p1"),
            name: "Tea".to_string(),
            unit_price: Price::from_rupees(100),
            quantity: Quantity::new(2).unwrap(),
        }]);
        let mut order = PurchaseOrder::from_cart(&cart);
        order.mark_success();

        client.purchase(&token(), &order).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_product_path() {
        let (server, client) = setup().await;
        Mock::given(method("DELETE"))
            .and(path("/admin/product/p9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client
            .delete_product(&token(), &ProductId::new("p9"))
            .await
            .unwrap();
    }
}
