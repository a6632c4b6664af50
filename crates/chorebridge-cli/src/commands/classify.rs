use chorebridge_core::Config;

pub fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let class = config.endpoint_patterns().classify(url);
    println!("{class}");
    Ok(())
}
