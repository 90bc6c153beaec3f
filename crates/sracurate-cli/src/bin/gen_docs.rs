//! Prints the command-line options as markdown to stdout.

fn main() {
    print!("{}", sracurate_cli::render_options_markdown());
}
