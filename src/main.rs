use hemmer_provider_logdna::{init_logging, serve, LogdnaProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(LogdnaProvider::new()).await
}
