/// Campaign constants shared by the store, renderer and runner

/// Column the store writes delivery outcomes into
pub const STATUS_COLUMN: &str = "LastSent";

/// Timestamp written for successful deliveries
pub const STATUS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Prefix of the status text written for failed deliveries
pub const STATUS_ERROR_PREFIX: &str = "ERROR: ";

/// Short date used by `{{SubscriptionDate}}` and `{{CurrentDate}}`
pub const SHORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Month names for `{{CurrentDateLong}}`
pub const MONTHS_PT: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Title used when a document template has no `title` metadata
pub const DEFAULT_DOCUMENT_TITLE: &str = "Document";

/// Author used when a document template has no `author` metadata
pub const DEFAULT_DOCUMENT_AUTHOR: &str = "DocMailer";
