//! The `check` command - verify listing files.

use tracing::debug;
use verasm::{EmitterOptionsOverride, RenderConfig, render_error_to, verify_listing};

use crate::cli::CheckArgs;
use crate::common::CliResult;
use crate::common::input::read_input;

/// Run the check command.
pub fn run(args: CheckArgs, no_color: bool) -> CliResult<()> {
    let overrides = args.overrides();
    let mut has_errors = false;

    for file in &args.files {
        if !check_file(file, &args, &overrides, no_color) {
            has_errors = true;
        }
    }

    if has_errors {
        std::process::exit(1);
    }

    Ok(())
}

/// Check a single file. Returns true if OK, false if errors.
fn check_file(path: &str, args: &CheckArgs, overrides: &EmitterOptionsOverride, no_color: bool) -> bool {
    let (content, display_name) = match read_input(path) {
        Ok(c) => c,
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {}", e);
            }
            return false;
        }
    };

    let bodies = match verify_listing(&content, overrides) {
        Ok(bodies) => bodies,
        Err(e) => {
            debug!(file = %display_name, diagnostics = e.diagnostics().len(), "Rejected");
            if !args.quiet {
                let config = RenderConfig {
                    color: !no_color,
                    ..Default::default()
                };
                let e = e.with_filename(display_name);
                render_error_to(&e, &mut std::io::stderr(), &config).ok();
            }
            return false;
        }
    };

    if args.emit {
        for body in &bodies {
            print!("{}", body.render());
        }
    }
    if !args.quiet {
        println!("{}: OK", display_name);
    }
    true
}
