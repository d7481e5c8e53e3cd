//! dofu binary entry point.

fn main() {
    if let Err(error) = dofu::cli::run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
