//! Review submission through the full router.

use axum::http::StatusCode;
use samaan_kinam_integration_tests::TestStorefront;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_bad_rating_shows_review_message() {
    let mut store = TestStorefront::start().await;
    store.sign_in("user").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&store.backend)
        .await;

    for rating in ["300", "abc", "0", ""] {
        let response = store
            .post_form(
                "/products/p1/reviews",
                &format!("rating={rating}&comment=Tasty"),
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "rating {rating}");
        assert_eq!(response.location(), Some("/products/p1"), "rating {rating}");

        let cart = store.get("/cart").await;
        assert!(
            cart.body
                .contains("Please, give a rating from 1 to 5 and a comment."),
            "rating {rating}"
        );
    }

    store.backend.verify().await;
}
