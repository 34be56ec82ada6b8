//! Classification of BigQuery error payloads into typed errors.
//!
//! BigQuery reports failures as a list of [`ErrorPayload`] entries whose `reason` code
//! identifies the failure. [`classify`] maps one of those entries, together with the
//! entries reported alongside it, to a [`BqError`] with a distinct [`ErrorKind`].

use serde_json::Value;

use crate::error::{BqError, ErrorKind};
use crate::model::{ErrorPayload, JobRef};

/// Column at which failure detail lines are wrapped.
const FAILURE_DETAILS_WIDTH: usize = 70;

/// Reason codes BigQuery uses in error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    AuthError,
    NotFound,
    Duplicate,
    AccessDenied,
    InvalidQuery,
    TermsOfServiceNotAccepted,
    BackendError,
    /// Any reason code without a dedicated error kind.
    Other,
}

impl Reason {
    /// Parses a wire reason code.
    pub fn from_code(code: &str) -> Reason {
        match code {
            "authError" => Reason::AuthError,
            "notFound" => Reason::NotFound,
            "duplicate" => Reason::Duplicate,
            "accessDenied" => Reason::AccessDenied,
            "invalidQuery" => Reason::InvalidQuery,
            "termsOfServiceNotAccepted" => Reason::TermsOfServiceNotAccepted,
            "backendError" => Reason::BackendError,
            _ => Reason::Other,
        }
    }

    /// Returns the [`ErrorKind`] errors with this reason are reported as.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            Reason::AuthError => ErrorKind::Authorization,
            Reason::NotFound => ErrorKind::NotFound,
            Reason::Duplicate => ErrorKind::Duplicate,
            Reason::AccessDenied => ErrorKind::AccessDenied,
            Reason::InvalidQuery => ErrorKind::InvalidQuery,
            Reason::TermsOfServiceNotAccepted => ErrorKind::TermsOfServiceNotAccepted,
            Reason::BackendError => ErrorKind::Backend,
            Reason::Other => ErrorKind::Service,
        }
    }
}

/// Converts the error payload embedded in a server response into a [`BqError`].
///
/// `error_list` holds every error reported in the same response; entries other than
/// `error` are appended to the message as failure details, while the error keeps the
/// list unchanged. `server_error` is the raw response, only used to describe payloads
/// missing their reason or message. `job_ref` identifies the job the error belongs to.
#[track_caller]
pub fn classify(
    error: &ErrorPayload,
    server_error: Option<&Value>,
    error_list: &[ErrorPayload],
    job_ref: Option<&JobRef>,
) -> BqError {
    let reason = non_empty(error.reason.as_deref()).or(non_empty(error.error.as_deref()));

    let Some((reason, message)) = reason.zip(non_empty(error.message.as_deref())) else {
        let server_error = server_error.cloned().unwrap_or(Value::Null).to_string();
        return BqError::interface(
            format!(
                "Error reported by server with missing error fields. Server returned: {server_error}"
            ),
            server_error,
        );
    };

    let mut message = match job_ref {
        Some(job_ref) => format!("Error processing {job_ref}: {message}"),
        None => message.to_string(),
    };

    let other_errors = error_list
        .iter()
        .filter(|other| *other != error)
        .collect::<Vec<_>>();
    if !other_errors.is_empty() {
        message.push_str("\nFailure details:\n");
        let details = other_errors
            .iter()
            .map(|other| failure_detail_line(other))
            .collect::<Vec<_>>()
            .join("\n");
        message.push_str(&details);
    }

    match Reason::from_code(reason) {
        Reason::AuthError => BqError::authorization(message),
        reason => BqError::service(
            reason.error_kind(),
            message,
            error.clone(),
            error_list.to_vec(),
            job_ref.cloned(),
        ),
    }
}

/// Converts a failed HTTP response from the BigQuery API into a [`BqError`].
///
/// JSON bodies of the form `{"error": {"errors": [...]}}` are classified with their
/// first entry as the primary error. Any other body yields an
/// [`ErrorKind::Communication`] error carrying the status and the body verbatim.
#[track_caller]
pub fn classify_http_error(status: u16, content_type: Option<&str>, body: &str) -> BqError {
    let is_json = content_type.is_some_and(|content_type| {
        content_type.starts_with("application/json")
    });

    if is_json {
        if let Ok(server_error) = serde_json::from_str::<Value>(body) {
            let error_list = server_error
                .pointer("/error/errors")
                .cloned()
                .and_then(|errors| serde_json::from_value::<Vec<ErrorPayload>>(errors).ok())
                .unwrap_or_default();
            let error = error_list.first().cloned().unwrap_or_default();

            return classify(&error, Some(&server_error), &error_list, None);
        }
    }

    BqError::communication(Some(status), body)
}

/// Renders one failure detail line as `location: message`, wrapped and bulleted.
fn failure_detail_line(error: &ErrorPayload) -> String {
    let text = [error.location.as_deref(), error.message.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(": ");

    fill(&text, FAILURE_DETAILS_WIDTH, " - ", "   ")
}

/// Greedily wraps `text` at `width` columns, indents included.
///
/// Words wider than a line are split across lines.
fn fill(text: &str, width: usize, initial_indent: &str, subsequent_indent: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = initial_indent.to_string();
    let mut line_width = initial_indent.chars().count();
    let mut has_words = false;

    for word in text.split_whitespace() {
        let mut rest = word;

        while !rest.is_empty() {
            let separator = usize::from(has_words);
            let rest_width = rest.chars().count();

            if line_width + separator + rest_width <= width {
                if has_words {
                    line.push(' ');
                }
                line.push_str(rest);
                line_width += separator + rest_width;
                has_words = true;
                break;
            }

            let indent = if lines.is_empty() {
                initial_indent
            } else {
                subsequent_indent
            };
            if rest_width > width.saturating_sub(indent.chars().count()) {
                let mut space_left = width.saturating_sub(line_width + separator);
                if !has_words {
                    space_left = space_left.max(1);
                }

                if space_left > 0 {
                    let split = rest
                        .char_indices()
                        .nth(space_left)
                        .map_or(rest.len(), |(index, _)| index);
                    if has_words {
                        line.push(' ');
                    }
                    line.push_str(&rest[..split]);
                    rest = &rest[split..];
                }
            }

            lines.push(std::mem::replace(&mut line, subsequent_indent.to_string()));
            line_width = subsequent_indent.chars().count();
            has_words = false;
        }
    }

    if has_words {
        lines.push(line);
    }

    lines.join("\n")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn not_found() -> ErrorPayload {
        ErrorPayload::new("notFound", "Not found: Table p:d.t")
    }

    #[test]
    fn not_found_keeps_payload_and_error_list() {
        let sibling = ErrorPayload::new("invalid", "bad value").with_location("row.a");
        let error_list = vec![not_found(), sibling];

        let err = classify(&not_found(), None, &error_list, None);

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.error(), Some(&not_found()));
        assert_eq!(err.error_list(), error_list.as_slice());
        assert_eq!(err.job_ref(), None);
        assert_eq!(
            err.message(),
            "Not found: Table p:d.t\nFailure details:\n - row.a: bad value"
        );
    }

    #[test]
    fn reason_codes_map_to_kinds() {
        let cases = [
            ("authError", ErrorKind::Authorization),
            ("notFound", ErrorKind::NotFound),
            ("duplicate", ErrorKind::Duplicate),
            ("accessDenied", ErrorKind::AccessDenied),
            ("invalidQuery", ErrorKind::InvalidQuery),
            ("termsOfServiceNotAccepted", ErrorKind::TermsOfServiceNotAccepted),
            ("backendError", ErrorKind::Backend),
            ("rateLimitExceeded", ErrorKind::Service),
            ("invalid", ErrorKind::Service),
        ];

        for (reason, kind) in cases {
            let err = classify(&ErrorPayload::new(reason, "message"), None, &[], None);
            assert_eq!(err.kind(), kind, "reason `{reason}`");
        }
    }

    #[test]
    fn authorization_errors_carry_no_payload() {
        let err = classify(
            &ErrorPayload::new("authError", "Invalid Credentials"),
            None,
            &[],
            None,
        );

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.error().is_none());
        assert!(err.error_list().is_empty());
        assert_eq!(err.message(), "Invalid Credentials");
    }

    #[test]
    fn terms_of_service_is_an_access_denial() {
        let err = classify(
            &ErrorPayload::new("termsOfServiceNotAccepted", "Accept the ToS"),
            None,
            &[],
            None,
        );

        assert!(err.kind().is_access_denied());
        assert!(err.error().is_some());
    }

    #[test]
    fn missing_reason_and_message_is_an_interface_error() {
        let server_error = json!({"error": {"code": 500}});

        let err = classify(&ErrorPayload::default(), Some(&server_error), &[], None);

        assert_eq!(err.kind(), ErrorKind::Interface);
        assert_eq!(err.server_error(), Some(r#"{"error":{"code":500}}"#));
        assert!(
            err.message()
                .ends_with(r#"Server returned: {"error":{"code":500}}"#)
        );
        assert!(err.error().is_none());
    }

    #[test]
    fn missing_message_is_an_interface_error_even_with_job() {
        let error = ErrorPayload {
            reason: Some("backendError".to_string()),
            ..Default::default()
        };

        let err = classify(&error, None, &[], Some(&JobRef::new("p", "j")));

        assert_eq!(err.kind(), ErrorKind::Interface);
        assert_eq!(err.server_error(), Some("null"));
    }

    #[test]
    fn generic_error_field_is_used_when_reason_is_missing() {
        let error = ErrorPayload {
            error: Some("duplicate".to_string()),
            message: Some("Already Exists: Table p:d.t".to_string()),
            ..Default::default()
        };

        let err = classify(&error, None, &[], None);

        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn job_reference_prefixes_message() {
        let job_ref = JobRef::new("p", "job123");

        let err = classify(
            &ErrorPayload::new("backendError", "oops"),
            None,
            &[],
            Some(&job_ref),
        );

        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.message(), "Error processing p:job123: oops");
        assert_eq!(err.job_ref(), Some(&job_ref));
        assert!(err.is_retryable());
    }

    #[test]
    fn classification_is_idempotent() {
        let error_list = vec![
            ErrorPayload::new("invalid", "first"),
            ErrorPayload::new("invalid", "second").with_location("gs://b/f.json"),
        ];
        let job_ref = JobRef::new("p", "j");

        let first = classify(&error_list[0], None, &error_list, Some(&job_ref));
        let second = classify(&error_list[0], None, &error_list, Some(&job_ref));

        assert_eq!(first.kind(), second.kind());
        assert_eq!(first.message(), second.message());
        assert_eq!(first.service_detail(), second.service_detail());
        assert_eq!(first, second);
    }

    #[test]
    fn long_failure_details_are_wrapped() {
        let sibling = ErrorPayload::new(
            "invalid",
            "Error while reading data, error message: JSON table encountered too many errors, giving up.",
        )
        .with_location("gs://bucket/file.json");

        let err = classify(&not_found(), None, &[sibling], None);

        let details = err.message().split_once("Failure details:\n").unwrap().1;
        let lines = details.lines().collect::<Vec<_>>();
        assert!(lines.len() > 1);
        assert!(lines[0].starts_with(" - gs://bucket/file.json: Error while"));
        assert!(lines.iter().all(|line| line.len() <= FAILURE_DETAILS_WIDTH));
        assert!(lines[1..].iter().all(|line| line.starts_with("   ")));
    }

    #[test]
    fn words_wider_than_a_line_are_split() {
        let location = format!("gs://bucket/{}.json", "a".repeat(85));
        let sibling =
            ErrorPayload::new("invalid", "Error while reading data").with_location(&location);

        let err = classify(&not_found(), None, &[sibling], None);

        let details = err.message().split_once("Failure details:\n").unwrap().1;
        let lines = details.lines().collect::<Vec<_>>();
        assert!(
            lines
                .iter()
                .all(|line| line.chars().count() <= FAILURE_DETAILS_WIDTH)
        );
        assert_eq!(lines[0].chars().count(), FAILURE_DETAILS_WIDTH);
        assert!(lines[1..].iter().all(|line| line.starts_with("   ")));

        let rejoined = lines.iter().map(|line| &line[3..]).collect::<String>();
        assert_eq!(
            rejoined.replace(' ', ""),
            format!("{location}:Errorwhilereadingdata")
        );
    }

    #[test]
    fn fill_keeps_short_words_together() {
        assert_eq!(
            fill("one two three four", 12, " - ", "   "),
            " - one two\n   three\n   four"
        );
        assert_eq!(fill("abcdefghij", 6, " - ", "   "), " - abc\n   def\n   ghi\n   j");
        assert_eq!(fill("", 70, " - ", "   "), "");
    }

    #[test]
    fn json_http_error_is_classified() {
        let body = json!({
            "error": {
                "code": 404,
                "message": "Not found: Dataset p:missing",
                "errors": [
                    {"reason": "notFound", "message": "Not found: Dataset p:missing", "domain": "global"}
                ]
            }
        })
        .to_string();

        let err = classify_http_error(404, Some("application/json; charset=UTF-8"), &body);

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Not found: Dataset p:missing");
    }

    #[test]
    fn non_json_http_error_is_a_communication_error() {
        let err = classify_http_error(503, Some("text/html"), "<html>Service Unavailable</html>");

        assert_eq!(err.kind(), ErrorKind::Communication);
        assert_eq!(err.http_status(), Some(503));
        assert_eq!(err.http_body(), Some("<html>Service Unavailable</html>"));
    }

    #[test]
    fn json_http_error_without_errors_is_an_interface_error() {
        let err = classify_http_error(500, Some("application/json"), r#"{"error":{}}"#);

        assert_eq!(err.kind(), ErrorKind::Interface);
    }
}
