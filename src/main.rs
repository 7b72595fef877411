#[tokio::main]
async fn main() {
    drmimi_games::start_server().await;
}
