use anyhow::Result;

use crate::cli::RenderArgs;
use crate::config::resolve_root;
use crate::render::{RenderPlan, render_site};

pub fn run_render_command(args: RenderArgs) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;
    render_site(&root, determine_plan(&args))?;
    Ok(())
}

fn determine_plan(args: &RenderArgs) -> RenderPlan {
    RenderPlan {
        verbose: args.verbose,
    }
}
