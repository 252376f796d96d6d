//! Bookstore catalog API - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    bookstore_api::run().await;
}
