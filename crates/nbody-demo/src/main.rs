use std::process::ExitCode;

use nbody_engine::logging::{init_logging, LoggingConfig};
use nbody_sim::{SimConfig, SimError};

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let result = SimConfig::from_env()
        .map_err(anyhow::Error::from)
        .and_then(nbody_sim::run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<SimError>())
                .map_or(1, SimError::exit_code);
            ExitCode::from(code)
        }
    }
}
