use std::process::ExitCode;

use pickup::{cli::build_cli, setup};

#[tokio::main]
async fn main() -> ExitCode {
    let matches = build_cli().get_matches();

    match setup::start(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<pickup_core::Error>()
                .map_or(1, pickup_core::Error::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
