use std::process::ExitCode;
use trendpull::app;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match app::main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("trendpull: {e:#}");
            ExitCode::FAILURE
        }
    }
}
