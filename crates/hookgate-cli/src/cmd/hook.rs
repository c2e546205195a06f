use hookgate_core::audit::{run_with_logging, AuditLog};
use hookgate_core::check::Stage;
use hookgate_core::config::HookConfig;
use hookgate_core::decision::{EXIT_OK, EXIT_PIPELINE_FAULT};
use hookgate_core::dispatch::Dispatcher;
use hookgate_core::runner::ProcessRunner;
use std::io::{Read, Write};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run one hook invocation and return the process exit code.
///
/// Every reached decision (Deny included) exits 0; only a fault that stopped
/// the response from being written exits 1.
pub fn run(stage: Stage, config_path: &Path, log_dir: Option<PathBuf>) -> i32 {
    let log = AuditLog::resolve(log_dir);
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        run_with_logging(&log, stage.dispatcher_name(), |inv| {
            let input = read_stdin();
            let config = HookConfig::load_or_default(config_path);
            let dispatcher = match stage {
                Stage::PreAction => Dispatcher::pre_action(config),
                Stage::PostAction => Dispatcher::post_action(config, Arc::new(ProcessRunner::new())),
            };
            let dispatch = dispatcher.dispatch_raw(&input);
            inv.observe_dispatch(&dispatch);

            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", dispatch.response.to_json())?;
            stdout.flush()?;

            if dispatch.decision.is_deny() {
                eprintln!("[hookgate] deny: {}", dispatch.decision.first_reason_line());
            }
            Ok(EXIT_OK)
        })
    }));

    match outcome {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            tracing::error!(stage = %stage, error = %e, "hook pipeline fault");
            EXIT_PIPELINE_FAULT
        }
        Err(_) => EXIT_PIPELINE_FAULT,
    }
}

/// An unreadable stdin is treated like an empty document, which dispatches
/// as malformed input and allows.
fn read_stdin() -> String {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        tracing::debug!(error = %e, "failed to read hook input");
        input.clear();
    }
    input
}
