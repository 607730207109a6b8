use crate::support::{EXIT_USAGE, registry_or_exit};

pub fn run(config: Option<String>) {
    let registry = registry_or_exit(config.as_deref());
    for (name, root) in registry.roots() {
        let module = registry.module_of(name).unwrap_or("<none>");
        let outline = registry.deploy_display(root).unwrap_or_else(|err| {
            eprintln!("error: {err}");
            std::process::exit(EXIT_USAGE);
        });
        println!("# {name} ({module})");
        println!("{outline}");
    }
}
