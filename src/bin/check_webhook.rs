use unimate_lib::config::AppConfig;
use unimate_lib::webhook::{AssistantGateway, AssistantRequest, WebhookClient};

#[tokio::main]
async fn main() {
    unimate_lib::init_logging();
    println!("🔧 Testing AI webhook...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    println!("🌐 Webhook URL: {}", config.webhook.url);

    let client = match WebhookClient::new(&config.webhook) {
        Ok(client) => client,
        Err(e) => {
            println!("❌ Could not build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let message = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let message = if message.is_empty() { "Hello!".to_string() } else { message };

    match client
        .send(AssistantRequest::Chat {
            message,
            history: Vec::new(),
        })
        .await
    {
        Ok(reply) => {
            println!("✅ Reply found in '{}' field:", reply.field.as_str());
            println!("{}", reply.text);
        }
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
