use unimate_lib::config::AppConfig;
use unimate_lib::lectures::{display_name, format_size, LectureLibrary, SortKey};
use unimate_lib::storage::StorageClient;

#[tokio::main]
async fn main() {
    unimate_lib::init_logging();

    let mut args = std::env::args().skip(1);
    let Some(subject) = args.next() else {
        println!("Usage: list_lectures <subject> [sort-key]");
        std::process::exit(2);
    };
    let sort = match args.next().map(|s| s.parse::<SortKey>()) {
        Some(Ok(sort)) => sort,
        Some(Err(e)) => {
            println!("❌ {}", e);
            std::process::exit(2);
        }
        None => SortKey::default(),
    };

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let storage = StorageClient::new(&config.storage);
    println!("📚 Listing '{}' in bucket '{}'...", subject, storage.bucket());

    match storage.list(&subject).await {
        Ok(files) => {
            let mut library = LectureLibrary::new(subject, files);
            library.set_sort(sort);
            let visible = library.visible();
            println!("✅ {} files (sorted by {})", visible.len(), sort);
            for file in visible {
                println!("  - {} ({})", display_name(&file.name), format_size(file.size));
                println!("    {}", file.url);
            }
        }
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
