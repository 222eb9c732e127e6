use clap::Parser;
use docqa::{app::state::AppState, config::StartArgs};
use tracing::info;

#[tokio::main]
async fn main() {
    let args = StartArgs::parse();

    let app = match AppState::new(&args).await {
        Ok(app) => app,
        Err(e) => {
            e.print();
            eprintln!("error while starting docqa: {e}");
            std::process::exit(1);
        }
    };

    let addr = app.config.address.clone();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("error while starting TCP listener");

    let router = docqa::app::server::router::router(app);

    info!("Listening on {addr}");

    axum::serve(listener, router)
        .await
        .expect("error while starting server");
}
