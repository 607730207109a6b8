use crate::support::{EXIT_USAGE, registry_or_exit, render_json_or_exit};
use cmdroute_kernel::{OptionDescriptor, export_all};

pub fn run(config: Option<String>, json_output: bool) {
    let registry = registry_or_exit(config.as_deref());
    let descriptors = export_all(&registry).unwrap_or_else(|err| {
        eprintln!("error: export failed: {err}");
        std::process::exit(EXIT_USAGE);
    });

    if json_output {
        println!("{}", render_json_or_exit(&descriptors, "descriptor"));
        return;
    }

    println!("cmdroute export");
    println!("  Separator: {}", registry.separator());
    println!("  Commands: {}", descriptors.len());
    for descriptor in &descriptors {
        println!("  - {}: {}", descriptor.name, descriptor.description);
        print_options(&descriptor.options, 2);
    }
}

fn print_options(options: &[OptionDescriptor], depth: usize) {
    for option in options {
        let required = if option.required == Some(true) {
            " (required)"
        } else {
            ""
        };
        println!(
            "{}- [{}] {}{required}",
            "  ".repeat(depth),
            option.kind,
            option.name
        );
        print_options(&option.options, depth + 1);
    }
}
