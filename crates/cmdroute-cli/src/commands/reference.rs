use crate::support::{EXIT_USAGE, registry_or_exit};

pub fn run(path: Vec<String>, config: Option<String>) {
    let registry = registry_or_exit(config.as_deref());
    let reference = registry
        .route(&path)
        .map_err(|err| err.to_string())
        .and_then(|resolution| {
            registry
                .reference(resolution.leaf)
                .map_err(|err| err.to_string())
        })
        .unwrap_or_else(|err| {
            eprintln!("error: {err}");
            std::process::exit(EXIT_USAGE);
        });
    println!("{reference}");
}
