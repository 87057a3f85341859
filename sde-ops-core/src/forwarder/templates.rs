//! HTML bodies for the uploader notification emails.
//!
//! Templates are rendered in a single pass by `minijinja` with HTML
//! auto-escaping, so substituted values are never re-read as template syntax.

use minijinja::{context, AutoEscape, Environment};
use std::sync::OnceLock;

const SUCCESS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <body style="font-family: Arial, sans-serif; color: #212b32;">
    <p>Hello,</p>
    <p>
      We have received your reference data file <strong>{{ file }}</strong>
      for agreement <strong>{{ agreement }}</strong>.
    </p>
    <p>
      The file has passed our automated checks and is now waiting to be
      processed. It will be available in your agreement once processing is
      complete.
    </p>
    <p>This is an automated message, please do not reply.</p>
  </body>
</html>
"#;

const FAILURE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <body style="font-family: Arial, sans-serif; color: #212b32;">
    <p>Hello,</p>
    <p>
      There is a technical error with your reference data file
      <strong>{{ file }}</strong> for agreement <strong>{{ agreement }}</strong>.
    </p>
    <p>The file failed our automated checks for the following reason:</p>
    <p style="white-space: pre-line;">{{ reason }}</p>
    <p>
      The file has not been imported. Please correct the file and upload it
      again.
    </p>
    <p>This is an automated message, please do not reply.</p>
  </body>
</html>
"#;

fn environment() -> &'static Environment<'static> {
    static ENVIRONMENT: OnceLock<Environment<'static>> = OnceLock::new();
    ENVIRONMENT.get_or_init(|| {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env
    })
}

/// Body of the email sent when a file passed validation.
pub fn render_success(agreement: &str, file: &str) -> Result<String, minijinja::Error> {
    environment().render_named_str(
        "success.html",
        SUCCESS_TEMPLATE,
        context! { agreement, file },
    )
}

/// Body of the email sent when a file failed validation.
pub fn render_failure(agreement: &str, file: &str, reason: &str) -> Result<String, minijinja::Error> {
    environment().render_named_str(
        "failure.html",
        FAILURE_TEMPLATE,
        context! { agreement, file, reason },
    )
}
