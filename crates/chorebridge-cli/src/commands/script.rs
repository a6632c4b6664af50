use chorebridge_core::interceptor::interceptor_script;
use chorebridge_core::Config;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    print!("{}", interceptor_script(&config.endpoint_patterns(), &config.bridge.name));
    Ok(())
}
