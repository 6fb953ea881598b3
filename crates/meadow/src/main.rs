use tracing::error;

mod app;

fn main() {
    if let Err(err) = app::run() {
        error!(error = %err, "fatal");
        eprintln!("meadow failed to start: {err}");
        std::process::exit(1);
    }
}
