use social_pulse::{Config, Dashboard};

fn main() -> anyhow::Result<()> {
    println!("Social Pulse Configuration Example");
    println!("==================================");

    match Config::default_config_path() {
        Ok(path) => println!("📍 Default config location: {}", path.display()),
        Err(e) => println!("❌ Error getting config path: {}", e),
    }

    // Falls back to defaults when no file exists
    println!("\n🔧 Loading configuration...");
    let config = Config::load()?;

    println!("✅ Configuration loaded successfully!");
    println!("🔣 CSV delimiter: {:?}", config.csv.delimiter);
    println!("🏆 Ranking size: {}", config.analytics.top_n);
    println!("📈 Time bucket: {}", config.analytics.bucket);
    println!("🎲 Sample posts: {}", config.sample.count);

    match config.sample.seed {
        Some(seed) => println!("🌱 Sample seed: {}", seed),
        None => println!("🌱 Sample seed: [NOT SET - output varies per run]"),
    }

    let mut dashboard = Dashboard::new(&config)?;
    let analytics = dashboard.load_sample();
    println!(
        "\n📊 Sample batch: {} posts, average score {:+.3}",
        analytics.total_posts, analytics.average_score
    );
    println!("📦 Dashboard source: {}", dashboard.source());

    Ok(())
}
