use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

const PACKAGE: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("{PACKAGE} {VERSION}");
    if args.extended {
        for (key, value) in build_info() {
            println!("{key}: {value}");
        }
    }
    Ok(SUCCESS)
}

fn build_info() -> Vec<(&'static str, String)> {
    vec![
        (
            "build_target",
            option_env!("EPPWIRE_BUILD_TARGET")
                .unwrap_or("unknown")
                .to_string(),
        ),
        (
            "platform",
            format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        ),
        (
            "features",
            format!(
                "session={} async={} cli=true",
                cfg!(feature = "session"),
                cfg!(feature = "async")
            ),
        ),
        ("tls", "rustls (ring), webpki-roots".to_string()),
        ("default_port", crate::cmd::connect::DEFAULT_PORT.to_string()),
    ]
}
