//! External survey link construction

use presurvey_types::{ExtraParams, PresurveyError, PresurveyResult, SessionContext};
use url::Url;

/// Append `params` to a survey's anonymous link.
///
/// Query parameters already on the link are kept unless the pipeline sets
/// the same key; pipeline parameters follow them in key order.
pub fn build_survey_link(anonymous_link: &str, params: &ExtraParams) -> PresurveyResult<Url> {
    let mut url = Url::parse(anonymous_link).map_err(|e| PresurveyError::InvalidSurveyLink {
        link: anonymous_link.to_string(),
        reason: e.to_string(),
    })?;

    if !params.is_empty() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !params.contains(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(kept)
            .extend_pairs(params.iter());
    }
    Ok(url)
}

/// Link the participant would be sent to right now
pub fn survey_link_for(ctx: &SessionContext) -> PresurveyResult<Url> {
    let survey = ctx.survey.as_ref().ok_or(PresurveyError::SurveyUnresolved)?;
    build_survey_link(&survey.anonymous_link, &ctx.extra_params)
}
