//! Show the guard order a program resolves to

use presurvey_client::ApiClient;
use presurvey_gate::{GuardRegistry, PipelineConfig, ProgramRegistry};
use presurvey_types::Program;

use crate::config::PresurveyConfig;
use crate::error::CliResult;

/// Execute `presurvey guards`
pub async fn execute(program_label: &str, config: &PresurveyConfig) -> CliResult<()> {
    let api = ApiClient::new(&config.api.base_url, config.api.timeout())?;
    let program = api.get_program(program_label).await?;

    for line in render(&program, &config.pipeline) {
        println!("{line}");
    }
    Ok(())
}

/// Numbered guard list, marking where the order came from
pub fn render(program: &Program, config: &PipelineConfig) -> Vec<String> {
    let source = if program.presurvey_states.is_empty() {
        "default"
    } else {
        "program"
    };
    let mut lines = vec![format!("{} ({} order)", program.label, source)];
    lines.extend(
        GuardRegistry::guard_order(program, config)
            .iter()
            .enumerate()
            .map(|(i, name)| format!("  {}. {}", i + 1, name)),
    );
    lines
}
