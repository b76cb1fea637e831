#[tokio::main]
async fn main() -> Result<(), ss_api::error::ApiError> {
    ss_api::run().await
}
