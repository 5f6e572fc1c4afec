//! Run a participant through the presurvey pipeline

use std::sync::Arc;

use clap::Args;
use presurvey_client::{ApiClient, HashedIdList};
use presurvey_gate::{
    session_keys, PipelineDeps, PipelineOrchestrator, PipelineStatus, SessionStore, UserResponse,
};
use presurvey_types::{PresurveyError, SessionRequest};
use tracing::{info, warn};
use url::Url;

use crate::config::PresurveyConfig;
use crate::error::{CliError, CliResult};
use crate::interact::{describe, parse_answer, PrintNavigator, Responder};
use crate::store::FileSessionStore;

/// Arguments for `presurvey run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Program label (e.g. cg17)
    #[arg(short, long)]
    pub program: String,

    /// Participation code; falls back to the session file
    #[arg(long)]
    pub code: Option<String>,

    /// Participant token; falls back to the session file
    #[arg(long)]
    pub token: Option<String>,

    /// Session ordinal; falls back to the session file
    #[arg(short, long)]
    pub session: Option<String>,

    /// Extra link parameter, repeatable (key=value)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Scripted interstitial answer, repeatable (accept, yes, no)
    #[arg(long = "answer", value_parser = parse_answer)]
    pub answers: Vec<UserResponse>,

    /// Fail instead of prompting once scripted answers run out
    #[arg(long)]
    pub non_interactive: bool,

    /// Store the given code and token in the session file
    #[arg(long)]
    pub remember: bool,
}

impl RunArgs {
    pub fn request(&self) -> SessionRequest {
        let mut request = SessionRequest::new(&self.program);
        request.code = self.code.clone();
        request.token = self.token.clone();
        request.session_ordinal = self.session.clone();
        for (k, v) in &self.params {
            request = request.param(k, v);
        }
        request
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Execute `presurvey run`
///
/// Ctrl-C tears the pipeline down. A prompt that is already on screen
/// blocks until it is answered; the answer is then dropped and no survey
/// link is printed.
pub async fn execute(args: RunArgs, config: &PresurveyConfig) -> CliResult<()> {
    let store = Arc::new(FileSessionStore::open(
        &config.session.path,
        &config.session.namespace,
    )?);
    if args.remember {
        if let Some(code) = &args.code {
            store.put(session_keys::CODE, code);
        }
        if let Some(token) = &args.token {
            store.put(session_keys::TOKEN, token);
        }
    }

    let api = Arc::new(ApiClient::new(&config.api.base_url, config.api.timeout())?);
    let membership = Arc::new(HashedIdList::new(
        &config.api.hashed_ids_url(),
        config.api.timeout(),
    )?);
    let deps = PipelineDeps {
        programs: api.clone(),
        participants: api,
        membership,
        store,
        navigator: Arc::new(PrintNavigator),
    };

    let mut pipeline = PipelineOrchestrator::new(deps, config.pipeline.clone());
    let teardown = pipeline.teardown_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, tearing down pipeline");
            teardown.teardown();
        }
    });

    let mut responder = Responder::new(args.answers.iter().copied(), !args.non_interactive);
    let result = drive(&mut pipeline, args.request(), &mut responder).await;
    interrupt.abort();

    let url = result?;
    info!(url = %url, guards = ?pipeline.entered_guards(), "Participant handed off");
    Ok(())
}

/// Drive a pipeline to its hand-off, answering every interstitial.
pub async fn drive(
    pipeline: &mut PipelineOrchestrator,
    request: SessionRequest,
    responder: &mut Responder,
) -> CliResult<Url> {
    let status = pipeline.start(request).await?;
    answer_until_done(pipeline, status, responder).await
}

/// Answer interstitials until the pipeline hands off.
///
/// Answers a guard rejects are reported and the same interstitial is asked
/// again. An answer given after teardown is discarded.
async fn answer_until_done(
    pipeline: &mut PipelineOrchestrator,
    mut status: PipelineStatus,
    responder: &mut Responder,
) -> CliResult<Url> {
    let teardown = pipeline.teardown_handle();
    loop {
        match status {
            PipelineStatus::Redirected { url } => return Ok(url),
            PipelineStatus::TornDown => return Err(torn_down()),
            PipelineStatus::Halted {
                ref guard,
                ref interstitial,
            } => {
                info!(guard = %guard, "Waiting on {}", describe(interstitial));
                let answer = responder.respond(interstitial)?;
                if teardown.is_torn_down() {
                    pipeline.teardown();
                    return Err(torn_down());
                }
                let next = match pipeline.resume(answer).await {
                    Ok(next) => next,
                    Err(e) if !e.is_permanent() => {
                        eprintln!("{e}");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                status = next;
            }
        }
    }
}

fn torn_down() -> CliError {
    CliError::Pipeline(PresurveyError::InvalidState("pipeline torn down".into()))
}
