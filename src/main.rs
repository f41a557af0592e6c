use ppiperturb::{cli, logging, process_matches};
use std::io::ErrorKind;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = logging::init_logging() {
        eprintln!("ppiperturb: {e}");
        return ExitCode::FAILURE;
    }

    let matches = cli().get_matches();

    match process_matches(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        // the reader went away, e.g. `ppiperturb rank ... | head`
        Err(err) if is_broken_pipe(&err) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| e.kind() == ErrorKind::BrokenPipe)
    })
}
