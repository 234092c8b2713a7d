use console::style;

pub fn print_version() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{} - version {}",
        style("mcpchat").bold().green(),
        style(version).bold()
    );
}
