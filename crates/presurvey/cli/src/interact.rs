//! Terminal side of the pipeline: answering interstitials and the hand-off

use std::collections::VecDeque;

use presurvey_gate::{Interstitial, Navigator, UserResponse};
use url::Url;

use crate::error::{CliError, CliResult};

/// Answers interstitials, first from scripted answers, then by prompting
pub struct Responder {
    scripted: VecDeque<UserResponse>,
    interactive: bool,
}

impl Responder {
    pub fn new(scripted: impl IntoIterator<Item = UserResponse>, interactive: bool) -> Self {
        Self {
            scripted: scripted.into_iter().collect(),
            interactive,
        }
    }

    pub fn respond(&mut self, interstitial: &Interstitial) -> CliResult<UserResponse> {
        if let Some(answer) = self.scripted.pop_front() {
            return Ok(answer);
        }
        if !self.interactive {
            return Err(CliError::InvalidArgument(format!(
                "no answer left for {}",
                describe(interstitial)
            )));
        }
        prompt(interstitial)
    }
}

/// One-line description of an interstitial
pub fn describe(interstitial: &Interstitial) -> String {
    match interstitial {
        Interstitial::PreviewAgreement { overrides } => {
            format!("preview acknowledgment ({})", overrides.join(", "))
        }
        Interstitial::ConfirmFirstSession { requested_ordinal } => {
            format!("first-session confirmation (requested session {requested_ordinal})")
        }
    }
}

fn prompt(interstitial: &Interstitial) -> CliResult<UserResponse> {
    let answer = match interstitial {
        Interstitial::PreviewAgreement { overrides } => {
            let accepted = dialoguer::Confirm::new()
                .with_prompt(format!(
                    "This link previews a survey with {} set. Responses may be recorded. Continue?",
                    overrides.join(" and ")
                ))
                .default(false)
                .interact()?;
            if accepted {
                UserResponse::Accept
            } else {
                UserResponse::No
            }
        }
        Interstitial::ConfirmFirstSession { requested_ordinal } => {
            let done = dialoguer::Confirm::new()
                .with_prompt(format!(
                    "Session {requested_ordinal} was requested. Did you already complete session 1?"
                ))
                .default(false)
                .interact()?;
            if done {
                UserResponse::Yes
            } else {
                UserResponse::No
            }
        }
    };
    Ok(answer)
}

/// Parse a scripted answer (`accept`, `yes`, `no`)
pub fn parse_answer(raw: &str) -> Result<UserResponse, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "accept" | "a" => Ok(UserResponse::Accept),
        "yes" | "y" => Ok(UserResponse::Yes),
        "no" | "n" => Ok(UserResponse::No),
        other => Err(format!("unknown answer '{other}' (expected accept, yes or no)")),
    }
}

/// Navigator that prints the survey link instead of opening it
#[derive(Debug, Default)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, url: &Url) {
        println!("{url}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_parse() {
        assert_eq!(parse_answer("Accept"), Ok(UserResponse::Accept));
        assert_eq!(parse_answer(" y "), Ok(UserResponse::Yes));
        assert_eq!(parse_answer("no"), Ok(UserResponse::No));
        assert!(parse_answer("maybe").is_err());
    }

    #[test]
    fn scripted_answers_run_out() {
        let halt = Interstitial::ConfirmFirstSession {
            requested_ordinal: 2,
        };
        let mut responder = Responder::new([UserResponse::No], false);
        assert_eq!(responder.respond(&halt).unwrap(), UserResponse::No);
        assert!(matches!(
            responder.respond(&halt),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
