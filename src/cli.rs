use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quire", version)]
#[command(
    about = "Build and preview tag-indexed technical blogs",
    long_about = "quire renders Markdown articles into a static html/ tree with tag pages, \n\
series navigation and embeddable components. Use the bundled commands to scaffold a \n\
workspace, render the site, preview it locally, or inspect the tag index."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn build() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    #[command(
        about = "Create the starter directories, templates, and config",
        long_about = "Initialise a new quire workspace.\n\
The command is idempotent: existing files are left untouched, so you can rerun it\n\
to restore missing folders and templates without overwriting customisations."
    )]
    Init(InitArgs),
    #[command(
        about = "Render documents, tag pages and redirects into html/",
        long_about = "Parse every document under posts/, rebuild the tag index, and write the\n\
complete static site into html/. Stale tag pages from earlier builds are removed."
    )]
    Render(RenderArgs),
    #[command(
        about = "Run the file-watching development server",
        long_about = "Serve the generated html/ directory over HTTP and watch your sources for changes.\n\
Redirects from quire.yaml are answered with the configured status code."
    )]
    Dev(DevArgs),
    #[command(
        about = "Remove generated files from html/",
        long_about = "Delete the previously rendered html/ directory and recreate it empty.",
        alias = "clear"
    )]
    Clean(CleanArgs),
    #[command(
        about = "Print or verify the tag index",
        long_about = "Scan all documents and print every tag slug with its document count and\n\
authored spellings. With --check, compare the persisted html/tag-data.json against a\n\
fresh scan and fail when they disagree."
    )]
    Tags(TagsArgs),
}

#[derive(Args, Clone, Debug)]
pub struct InitArgs {
    #[arg(
        long,
        help = "Project root directory (defaults to current directory)",
        long_help = "Directory in which to create the workspace. It is created when missing."
    )]
    pub root: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct RenderArgs {
    #[arg(
        long,
        help = "Project root directory (defaults to the nearest quire.yaml)",
        long_help = "Specify the project root directory. Without it quire walks upwards from the current directory until it finds quire.yaml."
    )]
    pub root: Option<String>,
    #[arg(
        short,
        long,
        help = "Print progress information while rendering",
        long_help = "Show which documents, tag pages and redirects are written, and any tag slug collisions."
    )]
    pub verbose: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DevArgs {
    #[arg(
        long,
        help = "Project root directory (defaults to the nearest quire.yaml)"
    )]
    pub root: Option<String>,
    #[arg(
        long,
        default_value = "127.0.0.1",
        help = "Interface to bind the development server to",
        long_help = "Set an alternate host/IP address for the dev server. Defaults to 127.0.0.1 so it only listens locally."
    )]
    pub host: String,
    #[arg(
        long,
        default_value_t = 4000,
        help = "Port number for the development server"
    )]
    pub port: u16,
    #[arg(
        long,
        help = "Show verbose logs from the watcher and render pipeline",
        long_help = "Display the same detailed progress output as `render --verbose` while the dev server is running."
    )]
    pub verbose: bool,
}

#[derive(Args, Clone, Debug)]
pub struct CleanArgs {
    #[arg(
        long,
        help = "Project root directory (defaults to the nearest quire.yaml)"
    )]
    pub root: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct TagsArgs {
    #[arg(
        long,
        help = "Project root directory (defaults to the nearest quire.yaml)"
    )]
    pub root: Option<String>,
    #[arg(
        long,
        help = "Verify html/tag-data.json against the current documents",
        long_help = "Load the tag index written by the last render and compare it with a fresh scan of posts/. Exits with an error listing missing and extra slugs when they differ, or when the file is absent or malformed."
    )]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_render_with_verbose_flag() {
        let cli = Cli::try_parse_from(["quire", "render", "--verbose"]).unwrap();
        match cli.command {
            Command::Render(args) => {
                assert!(args.verbose);
                assert!(args.root.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn dev_defaults_to_local_interface() {
        let cli = Cli::try_parse_from(["quire", "dev"]).unwrap();
        match cli.command {
            Command::Dev(args) => {
                assert_eq!(args.host, "127.0.0.1");
                assert_eq!(args.port, 4000);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn clear_is_an_alias_for_clean() {
        let cli = Cli::try_parse_from(["quire", "clear", "--root", "site"]).unwrap();
        match cli.command {
            Command::Clean(args) => assert_eq!(args.root.as_deref(), Some("site")),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
