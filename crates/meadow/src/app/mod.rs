mod bootstrap;
mod gameplay;

use engine::AppError;

pub(crate) fn run() -> Result<(), AppError> {
    let wiring = bootstrap::build_app()?;
    engine::run_app(wiring.config, wiring.scene)
}
