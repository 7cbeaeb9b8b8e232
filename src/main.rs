use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
  plan_sync_lib::run().await
}
