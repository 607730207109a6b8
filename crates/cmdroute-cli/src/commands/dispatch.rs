use crate::support::{
    EXIT_USAGE, read_file_or_exit, registry_or_exit, render_json_or_exit, runtime_or_exit,
};
use cmdroute_kernel::{
    DispatchOutcome, Dispatcher, InteractionData, InvocationContext, InvocationRequest,
};
use serde::Deserialize;
use std::process;

pub struct Args {
    pub invocation: String,
    pub interaction: bool,
    pub config: Option<String>,
    pub json: bool,
}

#[derive(Deserialize)]
struct InteractionFile {
    data: InteractionData,
    context: InvocationContext,
}

pub fn run(args: Args) {
    let registry = registry_or_exit(args.config.as_deref());
    let text = read_file_or_exit(&args.invocation);
    let request = if args.interaction {
        interaction_request_or_exit(&text, &args.invocation)
    } else {
        serde_json::from_str::<InvocationRequest>(&text).unwrap_or_else(|err| {
            eprintln!("error: failed to parse invocation {}: {err}", args.invocation);
            process::exit(EXIT_USAGE);
        })
    };

    let dispatcher = Dispatcher::new(registry);
    let outcome = runtime_or_exit().block_on(dispatcher.dispatch(request));

    if args.json {
        println!("{}", render_json_or_exit(&outcome.to_envelope(), "dispatch outcome"));
    } else {
        print_human_summary(&outcome);
    }

    if !outcome.is_executed() {
        process::exit(1);
    }
}

fn interaction_request_or_exit(text: &str, path: &str) -> InvocationRequest {
    let file: InteractionFile = serde_json::from_str(text).unwrap_or_else(|err| {
        eprintln!("error: failed to parse interaction {path}: {err}");
        process::exit(EXIT_USAGE);
    });
    InvocationRequest::from_interaction(&file.data, file.context).unwrap_or_else(|err| {
        eprintln!("error: invalid interaction {path}: {err}");
        process::exit(EXIT_USAGE);
    })
}

fn print_human_summary(outcome: &DispatchOutcome) {
    let result = if outcome.is_executed() {
        "accepted"
    } else {
        "rejected"
    };
    println!("cmdroute dispatch");
    println!("  Result: {result}");
    println!("  Stage: {:?}", outcome.stage());
    if let Some(class) = outcome.failure_class() {
        println!("  Failure Class: {class}");
    }
    for line in outcome.diagnostic().lines() {
        println!("  {line}");
    }
}
