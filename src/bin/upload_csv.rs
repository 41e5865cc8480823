use equipment_visualizer::client::ApiClient;
use equipment_visualizer::config::AppConfig;
use std::env;
use std::path::PathBuf;

/// Upload one CSV file and print the server's answer
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <file.csv>", args[0]);
        std::process::exit(2);
    }

    let config = AppConfig::from_env()?;
    let client = ApiClient::new(&config.api_base_url, &config.auth_token)?;

    match client.upload(&PathBuf::from(&args[1])).await {
        Ok(receipt) => {
            println!("{} (dataset {})", receipt.message, receipt.dataset_id);
            println!("{}", serde_json::to_string_pretty(&receipt.summary)?);
        }
        Err(e) => {
            eprintln!("Request failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
