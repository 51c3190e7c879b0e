mod cli;
mod commands;
mod components;
mod config;
mod content;
mod links;
mod markdown;
mod render;
mod routes;
mod tags;
mod template;
mod theme_image;
mod utils;

fn main() {
    let app = cli::Cli::build();
    let outcome = commands::run(app.command);

    if let Err(problem) = outcome {
        eprintln!("{problem:#}");
        std::process::exit(1);
    }
}
