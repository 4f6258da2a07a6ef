#[tokio::main]
async fn main() {
    if let Err(err) = s3audit::cli::run().await {
        s3audit::ui::eprintln_error(&err);
        std::process::exit(s3audit::exit::exit_code(&err));
    }
}
