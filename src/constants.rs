/// Region used when neither the request nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default lookback window in hours.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

pub const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Upper bound CloudWatch accepts for `FilterLogEvents.limit`.
pub const MAX_FILTER_PAGE_LIMIT: i32 = 10_000;

/// Prefix under which every derived destination key is written.
pub const EXPORT_KEY_PREFIX: &str = "exported-logs/";

pub const EXPORT_KEY_SUFFIX: &str = ".txt";

pub const DEFAULT_BUCKET: &str = "importinglogs";

pub const DEFAULT_LOG_GROUP: &str = "/aws/lambda/site";

pub const DEFAULT_DESTINATION_KEY: &str = "exported-logs/cloudwatch_logs.txt";

/// Discovery keeps only groups under this namespace.
pub const DEFAULT_NAMING_PREFIX: &str = "/aws/lambda/";

/// CloudWatch's own write-test groups match the naming prefix but are never exported.
pub const DEFAULT_DENY_SUBSTRING: &str = "aws-logs-write-test";

pub const DEFAULT_FIXED_GROUPS: &str = "/aws/lambda/site,/aws/lambda/site2,/aws/lambda/site3";

/// Daily at midnight UTC, matching the default 24 hour lookback.
pub const DEFAULT_EXPORT_CRON: &str = "0 0 0 * * *";

pub const EXPORT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
