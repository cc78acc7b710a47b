use crate::constants::{EXPORT_KEY_PREFIX, EXPORT_KEY_SUFFIX};

/// How a log group name becomes a destination key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// Last path segment, e.g. `/aws/lambda/site` -> `exported-logs/site.txt`.
    FunctionName,
    /// Whole name with slashes flattened, e.g. `/aws/lambda/site` ->
    /// `exported-logs/aws_lambda_site.txt`.
    SanitizedGroup,
}

pub fn destination_key(log_group: &str, style: KeyStyle) -> String {
    let name = match style {
        KeyStyle::FunctionName => match log_group.rsplit('/').next() {
            Some(last) if !last.is_empty() => last.to_string(),
            _ => sanitize(log_group),
        },
        KeyStyle::SanitizedGroup => sanitize(log_group),
    };
    format!("{EXPORT_KEY_PREFIX}{name}{EXPORT_KEY_SUFFIX}")
}

fn sanitize(log_group: &str) -> String {
    log_group.trim_matches('/').replace('/', "_")
}
